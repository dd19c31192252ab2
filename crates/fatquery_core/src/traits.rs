//! Core traits defining the device capability and the consumed stream contract.
//!
//! These traits follow the Ports & Adapters pattern: the alignment engine only
//! talks to a [`SectorDevice`], and parsers only talk to a [`ByteStream`].

use crate::error::{Result, StreamError};
use std::io;

/// Reference point for [`ByteStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// A medium that only accepts sector-aligned transfers.
///
/// Implementations wrap a raw device, an image file, or memory. Callers
/// guarantee that every `offset` and every buffer length is a multiple of
/// the sector size reported by the geometry the device was opened with.
///
/// # Example
///
/// ```ignore
/// struct RawVolume { /* ... */ }
///
/// impl SectorDevice for RawVolume {
///     fn read_aligned(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
///         // Position at `offset` and fill `buf` completely
///     }
///
///     fn set_aligned_position(&mut self, offset: u64) -> Result<()> {
///         // Move the OS file pointer
///     }
///
///     fn close(&mut self) {}
///
///     fn is_closed(&self) -> bool {
///         false
///     }
/// }
/// ```
pub trait SectorDevice {
    /// Fills `buf` with the sectors starting at the aligned `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ShortRead`] if the device delivers fewer bytes
    /// than `buf.len()`, [`StreamError::Read`] if the transfer fails, and
    /// [`StreamError::InvalidState`] once the device is closed.
    fn read_aligned(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Moves the device cursor to the aligned `offset`.
    fn set_aligned_position(&mut self, offset: u64) -> Result<()>;

    /// Releases the underlying resource. Calling it again is a no-op.
    fn close(&mut self);

    /// Whether [`SectorDevice::close`] has been called.
    fn is_closed(&self) -> bool;
}

/// Readable, seekable, non-writable byte stream.
///
/// This is the only surface a filesystem parser may depend on. It says
/// nothing about sectors, caches or the backing medium, so a device-backed
/// stream and a plain file stream are interchangeable.
pub trait ByteStream {
    /// Fills `buf` completely from the current position and advances by
    /// `buf.len()`. On failure the position is unchanged.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Reads exactly `len` bytes from the current position.
    ///
    /// The range is checked before the buffer is allocated.
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        read_end(self.position()?, len, self.length()?)?;
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Moves to `offset` relative to `origin` and returns the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64>;

    fn position(&self) -> Result<u64>;

    fn set_position(&mut self, position: u64) -> Result<u64> {
        let length = self.length()?;
        let offset = i64::try_from(position).map_err(|_| StreamError::OutOfRange {
            target: position as i128,
            length,
        })?;
        self.seek(offset, SeekOrigin::Begin)
    }

    fn length(&self) -> Result<u64>;

    /// Releases the stream. Idempotent and infallible.
    fn close(&mut self);

    fn can_read(&self) -> bool {
        true
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        false
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(StreamError::NotSupported("write"))
    }

    fn set_length(&mut self, _length: u64) -> Result<()> {
        Err(StreamError::NotSupported("set_length"))
    }
}

/// Resolves `offset` against `origin` into an absolute position inside
/// `[0, length)`.
///
/// Shared by every [`ByteStream`] implementation so that all of them agree
/// on the bounds of a seek.
pub fn resolve_seek(offset: i64, origin: SeekOrigin, current: u64, length: u64) -> Result<u64> {
    let base = match origin {
        SeekOrigin::Begin => 0,
        SeekOrigin::Current => current as i128,
        SeekOrigin::End => length as i128,
    };
    let target = base + offset as i128;

    if target < 0 || target >= length as i128 {
        return Err(StreamError::OutOfRange { target, length });
    }
    Ok(target as u64)
}

/// End of a `len`-byte read starting at `position`, or `OutOfRange` if it
/// would run past `length`.
pub fn read_end(position: u64, len: usize, length: u64) -> Result<u64> {
    position
        .checked_add(len as u64)
        .filter(|end| *end <= length)
        .ok_or(StreamError::OutOfRange {
            target: position as i128 + len as i128,
            length,
        })
}

/// Splits a [`io::SeekFrom`] into the `(offset, origin)` pair used by [`ByteStream::seek`].
pub fn seek_args(pos: io::SeekFrom) -> io::Result<(i64, SeekOrigin)> {
    match pos {
        io::SeekFrom::Start(offset) => i64::try_from(offset)
            .map(|offset| (offset, SeekOrigin::Begin))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek offset too large")),
        io::SeekFrom::Current(offset) => Ok((offset, SeekOrigin::Current)),
        io::SeekFrom::End(offset) => Ok((offset, SeekOrigin::End)),
    }
}

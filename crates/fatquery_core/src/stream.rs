//! Aligned reader/seeker over a [`SectorDevice`].
//!
//! Turns arbitrary-offset, arbitrary-length reads into sector-granular device
//! transfers. A single-sector cache serves the unaligned head and tail of a
//! request; whole sectors in between go straight into the caller's buffer.

use crate::error::{Result, StreamError};
use crate::geometry::Geometry;
use crate::options::StreamOptions;
use crate::sector_cache::SectorCache;
use crate::traits::{ByteStream, SectorDevice, SeekOrigin, read_end, resolve_seek, seek_args};
use std::io;
use tracing::debug;

pub struct AlignedStream<D: SectorDevice> {
    device: D,
    geometry: Geometry,
    cache: SectorCache,
    position: u64,
    transfer_limit: usize,
    closed: bool,
}

impl<D: SectorDevice> AlignedStream<D> {
    pub fn new(device: D, geometry: Geometry) -> Self {
        Self::with_options(device, geometry, &StreamOptions::default())
    }

    pub fn with_options(device: D, geometry: Geometry, options: &StreamOptions) -> Self {
        let sector_size = geometry.bytes_per_sector() as usize;

        Self {
            device,
            geometry,
            cache: SectorCache::new(sector_size),
            position: 0,
            transfer_limit: options.transfer_limit(sector_size),
            closed: false,
        }
    }

    /// Immutable geometry snapshot. Still available after close.
    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device, for instrumentation. Repositioning the
    /// device through this handle does not disturb the stream: every read
    /// names its own aligned offset.
    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Aligned origin of the cached sector, if one is held.
    #[inline]
    pub fn cached_sector(&self) -> Option<u64> {
        self.cache.origin()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed || self.device.is_closed()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StreamError::InvalidState);
        }
        Ok(())
    }

    pub fn position(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    pub fn set_position(&mut self, position: u64) -> Result<u64> {
        ByteStream::set_position(self, position)
    }

    pub fn length(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.geometry.total_size())
    }

    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        read_end(self.position()?, len, self.length()?)?;
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Fills `buf` from the current position.
    ///
    /// The position advances by exactly `buf.len()` on success and does not
    /// move on failure.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(());
        }

        let start = self.position;
        let end = read_end(start, buf.len(), self.geometry.total_size())?;

        if self.cache.covers(start, buf.len()) {
            self.cache.copy_to(start, buf);
        } else {
            self.read_spanning(start, buf)?;
        }

        self.position = end;
        Ok(())
    }

    fn read_spanning(&mut self, start: u64, buf: &mut [u8]) -> Result<()> {
        let sector = self.geometry.sector_size();
        let head_origin = self.geometry.align_down(start);
        let mut copied = 0usize;

        // An aligned start only goes through the cache when the cache already
        // holds that sector; otherwise it is part of the bulk transfer.
        if start != head_origin || self.cache.holds(head_origin) {
            if !self.cache.holds(head_origin) {
                self.cache.fill(&mut self.device, head_origin)?;
            }
            let head = buf.len().min((head_origin + sector - start) as usize);
            self.cache.copy_to(start, &mut buf[..head]);
            copied = head;
        }

        let sector = sector as usize;
        let bulk_end = copied + (buf.len() - copied) / sector * sector;
        while copied < bulk_end {
            let chunk = (bulk_end - copied).min(self.transfer_limit);
            let offset = start + copied as u64;
            debug_assert!(self.geometry.is_aligned(offset));
            self.device
                .read_aligned(offset, &mut buf[copied..copied + chunk])?;
            copied += chunk;
        }

        if copied < buf.len() {
            let tail_origin = start + copied as u64;
            self.cache.fill(&mut self.device, tail_origin)?;
            self.cache.copy_to(tail_origin, &mut buf[copied..]);
        }

        Ok(())
    }

    /// Moves the logical cursor and returns the new absolute position.
    ///
    /// The device is repositioned to the start of the target sector. The
    /// cache is kept: it is keyed by origin, so a read landing in the cached
    /// sector is still served from it.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.ensure_open()?;
        let target = resolve_seek(offset, origin, self.position, self.geometry.total_size())?;

        let aligned = self.geometry.align_down(target);
        self.device.set_aligned_position(aligned)?;
        debug!("Seek to {} (device at {})", target, aligned);

        self.position = target;
        Ok(target)
    }

    /// Closes the device and discards the cache. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.device.close();
        self.cache.invalidate();
        self.closed = true;
        debug!("Stream closed");
    }
}

impl<D: SectorDevice> ByteStream for AlignedStream<D> {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        AlignedStream::read_into(self, buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        AlignedStream::seek(self, offset, origin)
    }

    fn position(&self) -> Result<u64> {
        AlignedStream::position(self)
    }

    fn length(&self) -> Result<u64> {
        AlignedStream::length(self)
    }

    fn close(&mut self) {
        AlignedStream::close(self)
    }
}

impl<D: SectorDevice> Drop for AlignedStream<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: SectorDevice> io::Read for AlignedStream<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.length()? - self.position()?;
        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        self.read_into(&mut buf[..len])?;
        Ok(len)
    }
}

impl<D: SectorDevice> io::Seek for AlignedStream<D> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, origin) = seek_args(pos)?;
        Ok(AlignedStream::seek(self, offset, origin)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position()?)
    }
}

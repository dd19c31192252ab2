//! Plain file-backed stream.

use crate::device::read_full;
use fatquery_core::{
    ByteStream, Result, SeekOrigin, StreamError, read_end, resolve_seek, seek_args,
};
use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use std::path::Path;

/// [`ByteStream`] over a regular file, with no alignment requirements.
///
/// Same bounds, error and close semantics as the device-backed stream, so a
/// parser cannot tell the two apart.
pub struct FileStream {
    file: Option<File>,
    length: u64,
    position: u64,
}

impl FileStream {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_error = |source| StreamError::DeviceOpen {
            path: path.display().to_string(),
            source,
        };

        let file = File::open(path).map_err(open_error)?;
        let length = file.metadata().map_err(open_error)?.len();

        Ok(Self {
            file: Some(file),
            length,
            position: 0,
        })
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(StreamError::InvalidState)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl ByteStream for FileStream {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.position;
        let length = self.length;
        let file = self.file()?;
        if buf.is_empty() {
            return Ok(());
        }

        let end = read_end(start, buf.len(), length)?;

        file.seek(SeekFrom::Start(start))
            .map_err(|source| StreamError::Read {
                offset: start,
                source,
            })?;
        let filled = read_full(file, buf).map_err(|source| StreamError::Read {
            offset: start,
            source,
        })?;
        if filled != buf.len() {
            return Err(StreamError::ShortRead {
                offset: start,
                expected: buf.len(),
                actual: filled,
            });
        }

        self.position = end;
        Ok(())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.file()?;
        self.position = resolve_seek(offset, origin, self.position, self.length)?;
        Ok(self.position)
    }

    fn position(&self) -> Result<u64> {
        if self.is_closed() {
            return Err(StreamError::InvalidState);
        }
        Ok(self.position)
    }

    fn length(&self) -> Result<u64> {
        if self.is_closed() {
            return Err(StreamError::InvalidState);
        }
        Ok(self.length)
    }

    fn close(&mut self) {
        self.file = None;
    }
}

impl io::Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = ByteStream::length(self)? - ByteStream::position(self)?;
        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        self.read_into(&mut buf[..len])?;
        Ok(len)
    }
}

impl io::Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = seek_args(pos)?;
        Ok(ByteStream::seek(self, offset, origin)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(ByteStream::position(self)?)
    }
}

//! Device handle for raw devices and image files.

use fatquery_core::{Result, SectorDevice, StreamError};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// A read-only handle on a raw device (`/dev/sdb`, `\\.\H:`) or an image file.
///
/// The handle never checks alignment itself: raw devices reject unaligned
/// transfers on their own, and [`fatquery_core::AlignedStream`] only issues
/// aligned ones.
pub struct FileDevice {
    file: Option<File>,
    path: String,
    cursor: Option<u64>,
}

impl FileDevice {
    /// Opens `path` for shared read-only access.
    ///
    /// # Errors
    ///
    /// [`StreamError::DeviceOpen`] if the target does not exist, is not
    /// accessible, or is locked exclusively by another process.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = open_shared_read(path).map_err(|source| StreamError::DeviceOpen {
            path: path.display().to_string(),
            source,
        })?;

        #[cfg(target_os = "linux")]
        {
            use rustix::fs::{Advice, fadvise};

            let _ = fadvise(&file, 0, None, Advice::Sequential);
        }

        debug!("Opened device handle {}", path.display());

        Ok(Self {
            file: Some(file),
            path: path.display().to_string(),
            cursor: Some(0),
        })
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Device cursor, or `None` after a failed transfer left it unknown.
    #[inline]
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }
}

impl SectorDevice for FileDevice {
    fn read_aligned(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or(StreamError::InvalidState)?;

        if self.cursor != Some(offset) {
            self.cursor = None;
            file.seek(SeekFrom::Start(offset))
                .map_err(|source| StreamError::Read { offset, source })?;
        }

        let filled = match read_full(file, buf) {
            Ok(filled) => filled,
            Err(source) => {
                self.cursor = None;
                return Err(StreamError::Read { offset, source });
            }
        };
        self.cursor = Some(offset + filled as u64);

        if filled != buf.len() {
            return Err(StreamError::ShortRead {
                offset,
                expected: buf.len(),
                actual: filled,
            });
        }
        Ok(())
    }

    fn set_aligned_position(&mut self, offset: u64) -> Result<()> {
        let file = self.file.as_mut().ok_or(StreamError::InvalidState)?;
        if self.cursor == Some(offset) {
            return Ok(());
        }

        self.cursor = None;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| StreamError::Read { offset, source })?;
        self.cursor = Some(offset);
        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("Closed device handle {}", self.path);
        }
        self.cursor = None;
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

/// Reads until `buf` is full or the source reports end of data.
///
/// Returns the number of bytes placed in `buf`.
pub(crate) fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(windows)]
fn open_shared_read(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;
    use windows_sys::Win32::Storage::FileSystem::{FILE_SHARE_READ, FILE_SHARE_WRITE};

    // Mounted volumes are held open for writing by the system.
    OpenOptions::new()
        .read(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE)
        .open(path)
}

#[cfg(not(windows))]
fn open_shared_read(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fatquery_core::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image(len: usize) -> (NamedTempFile, Vec<u8>) {
        let mut temp_file = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(len).collect();
        temp_file.write_all(&data).unwrap();
        temp_file.flush().unwrap();
        (temp_file, data)
    }

    #[test]
    fn test_read_aligned_sectors() {
        let (temp_file, data) = image(4096);
        let mut device = FileDevice::open(temp_file.path()).unwrap();

        let mut buf = vec![0u8; 1024];
        device.read_aligned(512, &mut buf).unwrap();
        assert_eq!(buf, &data[512..1536]);
        assert_eq!(device.cursor(), Some(1536));

        device.read_aligned(0, &mut buf).unwrap();
        assert_eq!(buf, &data[..1024]);
    }

    #[test]
    fn test_short_read_at_end() {
        let (temp_file, _) = image(1000);
        let mut device = FileDevice::open(temp_file.path()).unwrap();

        let mut buf = vec![0u8; 1024];
        let err = device.read_aligned(0, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            StreamError::ShortRead {
                expected: 1024,
                actual: 1000,
                ..
            }
        ));
    }

    #[test]
    fn test_set_aligned_position() {
        let (temp_file, _) = image(4096);
        let mut device = FileDevice::open(temp_file.path()).unwrap();
        device.set_aligned_position(2048).unwrap();
        assert_eq!(device.cursor(), Some(2048));
    }

    #[test]
    fn test_missing_device() {
        let err = FileDevice::open("/nonexistent/path/device").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DeviceOpen);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (temp_file, _) = image(512);
        let mut device = FileDevice::open(temp_file.path()).unwrap();
        device.close();
        device.close();
        assert!(device.is_closed());

        let mut buf = vec![0u8; 512];
        assert_eq!(
            device.read_aligned(0, &mut buf).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            device.set_aligned_position(0).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
    }
}

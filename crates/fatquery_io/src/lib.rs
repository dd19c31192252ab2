mod device;
mod file_stream;
mod geometry;

pub use device::FileDevice;
pub use file_stream::FileStream;
pub use geometry::{image_geometry, query_geometry};

use fatquery_core::{AlignedStream, ByteStream, Geometry, Result, SeekOrigin, StreamOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// Sector-aligned stream over a raw device or image file.
pub type DeviceStream = AlignedStream<FileDevice>;

/// Opens `path` as a sector-aligned stream.
///
/// The handle is opened first so a missing or locked target reports
/// `DeviceOpen`; the geometry query follows.
pub fn open_device(path: impl AsRef<Path>, options: &StreamOptions) -> Result<DeviceStream> {
    let path = path.as_ref();
    let device = FileDevice::open(path)?;
    let geometry = query_geometry(path, options)?;

    info!(
        "Opened {} as sector stream ({} bytes)",
        path.display(),
        geometry.total_size()
    );

    Ok(AlignedStream::with_options(device, geometry, options))
}

/// Turns a bare drive designator into a raw device path.
///
/// `h` or `h:` becomes `\\.\H:` on Windows; `sdb1` becomes `/dev/sdb1` on
/// unix. Anything that already looks like a path is returned unchanged.
pub fn resolve_device_path(designator: &str) -> PathBuf {
    #[cfg(windows)]
    {
        let letter = designator.strip_suffix(':').unwrap_or(designator);
        if letter.len() == 1 && letter.chars().all(|c| c.is_ascii_alphabetic()) {
            return PathBuf::from(format!(r"\\.\{}:", letter.to_ascii_uppercase()));
        }
    }

    #[cfg(not(windows))]
    {
        if !designator.is_empty() && !designator.contains('/') {
            return Path::new("/dev").join(designator);
        }
    }

    PathBuf::from(designator)
}

/// A readable source: either a plain file or a sector-aligned device.
pub enum Source {
    File(FileStream),
    Device(DeviceStream),
}

impl Source {
    /// Opens `source` the way the CLI addresses it: an existing regular file
    /// is read as a plain file, anything else as a raw device designator.
    pub fn open(source: &str, options: &StreamOptions) -> Result<Self> {
        let path = Path::new(source);
        if path.is_file() {
            info!("Reading {} as a plain file", path.display());
            return Ok(Source::File(FileStream::open(path)?));
        }

        let device_path = resolve_device_path(source);
        Ok(Source::Device(open_device(device_path, options)?))
    }

    #[inline]
    pub fn is_device(&self) -> bool {
        matches!(self, Source::Device(_))
    }

    /// Device geometry, when the source is a device.
    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            Source::File(_) => None,
            Source::Device(s) => Some(s.geometry()),
        }
    }
}

impl ByteStream for Source {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        match self {
            Source::File(s) => s.read_into(buf),
            Source::Device(s) => s.read_into(buf),
        }
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        match self {
            Source::File(s) => ByteStream::seek(s, offset, origin),
            Source::Device(s) => s.seek(offset, origin),
        }
    }

    fn position(&self) -> Result<u64> {
        match self {
            Source::File(s) => s.position(),
            Source::Device(s) => s.position(),
        }
    }

    fn length(&self) -> Result<u64> {
        match self {
            Source::File(s) => s.length(),
            Source::Device(s) => s.length(),
        }
    }

    fn close(&mut self) {
        match self {
            Source::File(s) => s.close(),
            Source::Device(s) => s.close(),
        }
    }
}

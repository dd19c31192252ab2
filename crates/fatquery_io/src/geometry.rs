//! Platform geometry queries.
//!
//! Windows volumes answer through `GetDiskFreeSpaceW`; Linux block devices
//! through the `BLKSSZGET` and `BLKGETSIZE64` ioctls. Plain image files have
//! no geometry of their own and use the configured image sector size.

use fatquery_core::{Geometry, GeometryError, Result, StreamError, StreamOptions};
use std::path::Path;
use tracing::{info, warn};

/// Issues a single geometry query for `path`.
///
/// # Errors
///
/// [`StreamError::GeometryQuery`] when the query fails or would produce a
/// zero sector size, zero sectors per cluster, or an empty device.
pub fn query_geometry(path: impl AsRef<Path>, options: &StreamOptions) -> Result<Geometry> {
    let path = path.as_ref();
    let geometry = platform::query(path, options)
        .map_err(|source| StreamError::geometry_query(path.display().to_string(), source))?;

    info!(
        "Geometry of {}: {} bytes/sector, {} sectors/cluster, {} clusters ({} free), {} bytes",
        path.display(),
        geometry.bytes_per_sector(),
        geometry.sectors_per_cluster(),
        geometry.total_clusters(),
        geometry.free_clusters(),
        geometry.total_size()
    );

    Ok(geometry)
}

/// Geometry of a flat image of `len` bytes. Bytes past the last whole sector
/// are not addressable.
pub fn image_geometry(len: u64, sector_size: u32) -> std::result::Result<Geometry, GeometryError> {
    if sector_size == 0 {
        return Err(GeometryError::ZeroSectorSize);
    }

    let trailing = len % sector_size as u64;
    if trailing != 0 {
        warn!(
            "Ignoring {} trailing bytes past the last whole {}-byte sector",
            trailing, sector_size
        );
    }

    Geometry::from_sectors(sector_size, len / sector_size as u64)
}

#[cfg(unix)]
mod platform {
    use super::image_geometry;
    use fatquery_core::{Geometry, GeometryError, StreamOptions};
    use std::fs;
    use std::os::unix::fs::FileTypeExt;
    use std::path::Path;

    pub fn query(path: &Path, options: &StreamOptions) -> Result<Geometry, GeometryError> {
        let metadata = fs::metadata(path)?;
        let file_type = metadata.file_type();

        if file_type.is_block_device() {
            block_device(path)
        } else if file_type.is_file() {
            image_geometry(metadata.len(), options.image_sector_size)
        } else {
            Err(GeometryError::Unsupported(format!(
                "{} is neither a block device nor an image file",
                path.display()
            )))
        }
    }

    #[cfg(target_os = "linux")]
    fn block_device(path: &Path) -> Result<Geometry, GeometryError> {
        use std::io;
        use std::os::unix::io::AsRawFd;

        const BLKSSZGET: libc::c_ulong = 0x1268;
        const BLKGETSIZE64: libc::c_ulong = 0x80081272;

        let file = fs::File::open(path)?;

        let mut sector_size: libc::c_int = 0;
        let result = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                BLKSSZGET as _,
                &mut sector_size as *mut libc::c_int,
            )
        };
        if result == -1 {
            return Err(io::Error::last_os_error().into());
        }

        let mut size: u64 = 0;
        let result =
            unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) };
        if result == -1 {
            return Err(io::Error::last_os_error().into());
        }

        let sector_size = u32::try_from(sector_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(GeometryError::ZeroSectorSize)?;

        Geometry::from_sectors(sector_size, size / sector_size as u64)
    }

    #[cfg(not(target_os = "linux"))]
    fn block_device(path: &Path) -> Result<Geometry, GeometryError> {
        Err(GeometryError::Unsupported(format!(
            "block device geometry is not available on this platform: {}",
            path.display()
        )))
    }
}

#[cfg(windows)]
mod platform {
    use super::image_geometry;
    use fatquery_core::{Geometry, GeometryError, StreamOptions};
    use std::fs;
    use std::io;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceW;

    pub fn query(path: &Path, options: &StreamOptions) -> Result<Geometry, GeometryError> {
        if is_volume(path) {
            return volume(path);
        }

        let metadata = fs::metadata(path)?;
        if metadata.is_file() {
            image_geometry(metadata.len(), options.image_sector_size)
        } else {
            Err(GeometryError::Unsupported(format!(
                "{} is neither a volume nor an image file",
                path.display()
            )))
        }
    }

    fn is_volume(path: &Path) -> bool {
        path.to_str().is_some_and(|p| p.starts_with(r"\\.\"))
    }

    fn volume(path: &Path) -> Result<Geometry, GeometryError> {
        let mut root = path.as_os_str().to_os_string();
        root.push("\\");
        let root: Vec<u16> = root.encode_wide().chain(std::iter::once(0)).collect();

        let mut sectors_per_cluster = 0u32;
        let mut bytes_per_sector = 0u32;
        let mut free_clusters = 0u32;
        let mut total_clusters = 0u32;

        let ok = unsafe {
            GetDiskFreeSpaceW(
                root.as_ptr(),
                &mut sectors_per_cluster,
                &mut bytes_per_sector,
                &mut free_clusters,
                &mut total_clusters,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error().into());
        }

        Geometry::new(
            bytes_per_sector,
            sectors_per_cluster,
            total_clusters as u64,
            free_clusters as u64,
        )
    }
}

//! Immutable device geometry captured once when a stream is constructed.

use std::io;
use thiserror::Error;

/// Reasons a geometry snapshot cannot be produced.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("bytes per sector is zero")]
    ZeroSectorSize,

    #[error("sectors per cluster is zero")]
    ZeroSectorsPerCluster,

    #[error("device reports no clusters")]
    Empty,

    #[error("total size overflows a 64-bit offset")]
    Overflow,

    #[error("unsupported target: {0}")]
    Unsupported(String),

    #[error("OS query failed: {0}")]
    Os(#[from] io::Error),
}

/// Sector and cluster layout of a device.
///
/// `total_size` is derived as `bytes_per_sector * sectors_per_cluster *
/// total_clusters` and bounds the logical address range `[0, total_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    bytes_per_sector: u32,
    sectors_per_cluster: u32,
    total_clusters: u64,
    free_clusters: u64,
    total_size: u64,
}

impl Geometry {
    pub fn new(
        bytes_per_sector: u32,
        sectors_per_cluster: u32,
        total_clusters: u64,
        free_clusters: u64,
    ) -> Result<Self, GeometryError> {
        if bytes_per_sector == 0 {
            return Err(GeometryError::ZeroSectorSize);
        }
        if sectors_per_cluster == 0 {
            return Err(GeometryError::ZeroSectorsPerCluster);
        }
        if total_clusters == 0 {
            return Err(GeometryError::Empty);
        }

        let total_size = (bytes_per_sector as u64)
            .checked_mul(sectors_per_cluster as u64)
            .and_then(|cluster| cluster.checked_mul(total_clusters))
            .filter(|size| *size <= i64::MAX as u64)
            .ok_or(GeometryError::Overflow)?;

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            total_clusters,
            free_clusters,
            total_size,
        })
    }

    /// Geometry of a flat image: one sector per cluster, no free-space data.
    pub fn from_sectors(bytes_per_sector: u32, total_sectors: u64) -> Result<Self, GeometryError> {
        Self::new(bytes_per_sector, 1, total_sectors, 0)
    }

    #[inline]
    pub fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    #[inline]
    pub fn sectors_per_cluster(&self) -> u32 {
        self.sectors_per_cluster
    }

    #[inline]
    pub fn total_clusters(&self) -> u64 {
        self.total_clusters
    }

    #[inline]
    pub fn free_clusters(&self) -> u64 {
        self.free_clusters
    }

    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    #[inline]
    pub fn sector_size(&self) -> u64 {
        self.bytes_per_sector as u64
    }

    #[inline]
    pub fn cluster_size(&self) -> u64 {
        self.sector_size() * self.sectors_per_cluster as u64
    }

    pub fn total_sectors(&self) -> u64 {
        self.total_clusters * self.sectors_per_cluster as u64
    }

    /// Start of the sector containing `offset`.
    #[inline]
    pub fn align_down(&self, offset: u64) -> u64 {
        offset - offset % self.sector_size()
    }

    #[inline]
    pub fn is_aligned(&self, offset: u64) -> bool {
        offset % self.sector_size() == 0
    }

    #[inline]
    pub fn sector_of(&self, offset: u64) -> u64 {
        offset / self.sector_size()
    }

    #[inline]
    pub fn cluster_of(&self, offset: u64) -> u64 {
        offset / self.cluster_size()
    }

    /// Byte offset of `sector`, or `None` if it lies past the end of the device.
    pub fn sector_offset(&self, sector: u64) -> Option<u64> {
        sector
            .checked_mul(self.sector_size())
            .filter(|offset| *offset < self.total_size)
    }

    pub fn contains(&self, offset: u64) -> bool {
        offset < self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_size_is_derived() {
        let geometry = Geometry::new(512, 8, 256, 10).unwrap();
        assert_eq!(geometry.total_size(), 512 * 8 * 256);
        assert_eq!(geometry.cluster_size(), 4096);
        assert_eq!(geometry.total_sectors(), 2048);
        assert_eq!(geometry.free_clusters(), 10);
    }

    #[test]
    fn test_zero_fields_rejected() {
        assert!(matches!(
            Geometry::new(0, 8, 256, 0),
            Err(GeometryError::ZeroSectorSize)
        ));
        assert!(matches!(
            Geometry::new(512, 0, 256, 0),
            Err(GeometryError::ZeroSectorsPerCluster)
        ));
        assert!(matches!(
            Geometry::new(512, 8, 0, 0),
            Err(GeometryError::Empty)
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Geometry::new(u32::MAX, u32::MAX, u64::MAX, 0),
            Err(GeometryError::Overflow)
        ));
    }

    #[test]
    fn test_offset_translation() {
        let geometry = Geometry::new(512, 4, 100, 0).unwrap();
        assert_eq!(geometry.align_down(1000), 512);
        assert_eq!(geometry.align_down(512), 512);
        assert!(geometry.is_aligned(2048));
        assert!(!geometry.is_aligned(2049));
        assert_eq!(geometry.sector_of(1535), 2);
        assert_eq!(geometry.cluster_of(2048), 1);
        assert_eq!(geometry.sector_offset(3), Some(1536));
        assert_eq!(geometry.sector_offset(400), None);
        assert!(geometry.contains(204_799));
        assert!(!geometry.contains(204_800));
    }
}

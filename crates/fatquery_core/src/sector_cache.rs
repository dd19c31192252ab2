use crate::error::Result;
use crate::traits::SectorDevice;
use tracing::debug;

/// One-sector buffer holding the most recently fetched aligned sector.
pub struct SectorCache {
    origin: u64,
    bytes: Box<[u8]>,
    valid: bool,
}

impl SectorCache {
    pub fn new(sector_size: usize) -> Self {
        assert!(sector_size > 0, "Sector size must be greater than 0");

        Self {
            origin: 0,
            bytes: vec![0u8; sector_size].into_boxed_slice(),
            valid: false,
        }
    }

    #[inline]
    pub fn sector_size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Aligned offset of the cached sector, if any.
    #[inline]
    pub fn origin(&self) -> Option<u64> {
        self.valid.then_some(self.origin)
    }

    #[inline]
    pub fn holds(&self, sector_origin: u64) -> bool {
        self.valid && self.origin == sector_origin
    }

    /// Whether `[position, position + len)` lies inside the cached sector.
    pub fn covers(&self, position: u64, len: usize) -> bool {
        if !self.valid || position < self.origin {
            return false;
        }
        let start = position - self.origin;
        start
            .checked_add(len as u64)
            .is_some_and(|end| end <= self.bytes.len() as u64)
    }

    /// Copies `dst.len()` bytes starting at the absolute `position`.
    ///
    /// Panics if the range is not covered; callers check [`SectorCache::covers`].
    pub fn copy_to(&self, position: u64, dst: &mut [u8]) {
        assert!(self.covers(position, dst.len()), "range outside cached sector");
        let start = (position - self.origin) as usize;
        dst.copy_from_slice(&self.bytes[start..start + dst.len()]);
    }

    /// Replaces the cached sector with the one at `sector_origin`.
    ///
    /// The cache is left invalid if the device read fails.
    pub fn fill<D: SectorDevice + ?Sized>(&mut self, device: &mut D, sector_origin: u64) -> Result<()> {
        self.valid = false;
        debug!("Fetching sector at offset {}", sector_origin);
        device.read_aligned(sector_origin, &mut self.bytes)?;
        self.origin = sector_origin;
        self.valid = true;
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

//! Stream options

/// Tuning knobs for opening and reading a sector stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Upper bound for one whole-sector transfer into a caller buffer
    pub max_transfer_bytes: usize,
    /// Sector size assumed for plain image files, which report none
    pub image_sector_size: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_transfer_bytes: 1024 * 1024, // 1MB per device call
            image_sector_size: 512,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bulk transfer limit
    pub fn with_max_transfer(mut self, bytes: usize) -> Self {
        self.max_transfer_bytes = bytes;
        self
    }

    /// Sets the sector size used for image files
    pub fn with_image_sector_size(mut self, bytes: u32) -> Self {
        self.image_sector_size = bytes;
        self
    }

    /// Transfer limit rounded down to whole sectors, never below one sector.
    pub fn transfer_limit(&self, sector_size: usize) -> usize {
        let sectors = (self.max_transfer_bytes / sector_size).max(1);
        sectors * sector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_limit_rounds_to_sectors() {
        let options = StreamOptions::new().with_max_transfer(1300);
        assert_eq!(options.transfer_limit(512), 1024);
    }

    #[test]
    fn test_transfer_limit_at_least_one_sector() {
        let options = StreamOptions::new().with_max_transfer(0);
        assert_eq!(options.transfer_limit(4096), 4096);
    }
}

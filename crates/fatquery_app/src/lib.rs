pub mod boot_sector;
pub mod cli;
pub mod report;
pub mod sector_list;

pub use boot_sector::BootSector;
pub use report::{QueryReport, SectorReport, SectorStatus, run_query};
pub use sector_list::{parse_sector_arg, parse_sector_list};

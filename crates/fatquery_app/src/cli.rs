use clap::Parser;
use fatquery_core::StreamOptions;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "fatquery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query FAT cluster information for a disk sector or sector list")]
#[command(
    after_help = "Samples:\n  fatquery h 40353\n  fatquery h sectors.txt\n  fatquery h.bin sectors.txt"
)]
pub struct Cli {
    /// Drive designator, raw device path, or image file
    pub source: String,

    /// Sector number, or a file listing one sector per line
    pub sectors: String,

    /// Sector size assumed for image files
    #[arg(long, default_value_t = 512)]
    pub sector_size: u32,

    /// Largest single whole-sector transfer, in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_transfer: usize,

    /// Print a hex dump of every located sector
    #[arg(long)]
    pub dump: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::new()
            .with_image_sector_size(self.sector_size)
            .with_max_transfer(self.max_transfer)
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positional_and_flags() {
        let cli = Cli::parse_from([
            "fatquery",
            "h",
            "sectors.txt",
            "--sector-size",
            "4096",
            "--json",
            "-vv",
        ]);
        assert_eq!(cli.source, "h");
        assert_eq!(cli.sectors, "sectors.txt");
        assert!(cli.json);
        assert!(!cli.dump);
        assert_eq!(cli.log_level(), Level::DEBUG);

        let options = cli.stream_options();
        assert_eq!(options.image_sector_size, 4096);
        assert_eq!(options.max_transfer_bytes, 1024 * 1024);
    }

    #[test]
    fn test_missing_arguments_rejected() {
        assert!(Cli::try_parse_from(["fatquery", "h"]).is_err());
    }
}

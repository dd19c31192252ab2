use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Target sectors from the command line: a single decimal sector number, or
/// a file listing one sector per line.
pub fn parse_sector_arg(arg: &str) -> Result<Vec<u64>> {
    if let Ok(sector) = arg.trim().parse::<u64>() {
        return Ok(vec![sector]);
    }

    let path = Path::new(arg);
    if !path.is_file() {
        bail!("Cannot find sector information: {}", arg);
    }

    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read sector list {:?}", path))?;
    Ok(parse_sector_list(&contents))
}

/// Lines that are not a decimal sector number are skipped.
pub fn parse_sector_list(contents: &str) -> Vec<u64> {
    contents
        .lines()
        .filter_map(|line| match line.trim().parse::<u64>() {
            Ok(sector) => Some(sector),
            Err(_) => {
                if !line.trim().is_empty() {
                    debug!("Skipping sector list line {:?}", line);
                }
                None
            }
        })
        .collect()
}

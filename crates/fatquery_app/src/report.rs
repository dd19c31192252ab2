//! Per-sector report built from a boot sector and a byte stream.

use crate::boot_sector::BootSector;
use anyhow::{Context, Result};
use fatquery_core::{ByteStream, Geometry, SeekOrigin};
use serde::Serialize;
use std::fmt;

const DUMP_ROW: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct GeometryInfo {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub total_clusters: u64,
    pub free_clusters: u64,
    pub total_size: u64,
}

impl From<&Geometry> for GeometryInfo {
    fn from(geometry: &Geometry) -> Self {
        Self {
            bytes_per_sector: geometry.bytes_per_sector(),
            sectors_per_cluster: geometry.sectors_per_cluster(),
            total_clusters: geometry.total_clusters(),
            free_clusters: geometry.free_clusters(),
            total_size: geometry.total_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorStatus {
    /// Inside the data region; `cluster` is set.
    Data,
    /// Boot sector, reserved sectors, FATs or the fixed root directory.
    SystemArea,
    /// Before the partition start or past the end of the volume.
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorReport {
    pub sector: u64,
    pub status: SectorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_first_sector: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub source: String,
    pub length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryInfo>,
    pub boot_sector: BootSector,
    pub first_data_sector: u64,
    pub first_file_sector: i64,
    pub sectors: Vec<SectorReport>,
}

/// Reads the boot sector through `stream` and locates every target sector.
///
/// Sectors outside the volume are reported as missing; only stream failures
/// abort the query.
pub fn run_query(
    source: &str,
    stream: &mut impl ByteStream,
    geometry: Option<&Geometry>,
    sectors: &[u64],
    dump: bool,
) -> Result<QueryReport> {
    let length = stream.length().context("Failed to query stream length")?;
    let boot = BootSector::read_from(stream)?;

    let mut reports = Vec::with_capacity(sectors.len());
    for &sector in sectors {
        reports.push(locate(stream, &boot, length, sector, dump)?);
    }

    Ok(QueryReport {
        source: source.to_string(),
        length,
        geometry: geometry.map(GeometryInfo::from),
        first_data_sector: boot.first_data_sector(),
        first_file_sector: boot.first_file_sector(),
        boot_sector: boot,
        sectors: reports,
    })
}

fn locate(
    stream: &mut impl ByteStream,
    boot: &BootSector,
    length: u64,
    sector: u64,
    dump: bool,
) -> Result<SectorReport> {
    let sector_size = boot.bytes_per_sector as u64;
    let volume_offset = sector
        .checked_sub(boot.hidden_sectors as u64)
        .and_then(|relative| relative.checked_mul(sector_size))
        .filter(|offset| offset.checked_add(sector_size).is_some_and(|end| end <= length));

    let Some(volume_offset) = volume_offset else {
        return Ok(SectorReport {
            sector,
            status: SectorStatus::Missing,
            cluster: None,
            cluster_first_sector: None,
            volume_offset: None,
            dump: None,
        });
    };

    let cluster = boot.cluster_of(sector);
    let dump = if dump {
        stream
            .seek(volume_offset as i64, SeekOrigin::Begin)
            .with_context(|| format!("Failed to seek to sector {}", sector))?;
        let bytes = stream
            .read(sector_size as usize)
            .with_context(|| format!("Failed to read sector {}", sector))?;
        Some(hex_dump(volume_offset, &bytes))
    } else {
        None
    };

    Ok(SectorReport {
        sector,
        status: if cluster.is_some() {
            SectorStatus::Data
        } else {
            SectorStatus::SystemArea
        },
        cluster,
        cluster_first_sector: cluster.and_then(|c| boot.cluster_start(c)),
        volume_offset: Some(volume_offset),
        dump,
    })
}

/// Formats `bytes` as `offset  hex  ascii` rows of 16 bytes.
pub fn hex_dump(base: u64, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(DUMP_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!(
                "{:08x}  {:<32}  {}",
                base + (row * DUMP_ROW) as u64,
                hex::encode(chunk),
                ascii
            )
        })
        .collect()
}

impl fmt::Display for QueryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {} ({} bytes)", self.source, self.length)?;
        if let Some(geometry) = &self.geometry {
            writeln!(
                f,
                "Geometry: {} bytes/sector, {} sectors/cluster, {} clusters ({} free)",
                geometry.bytes_per_sector,
                geometry.sectors_per_cluster,
                geometry.total_clusters,
                geometry.free_clusters
            )?;
        }
        writeln!(f, "Start sector: {}", self.boot_sector.hidden_sectors)?;
        writeln!(f, "Data sector: {}", self.first_data_sector)?;
        writeln!(f, "First file sector: {}", self.first_file_sector)?;
        writeln!(f)?;

        for report in &self.sectors {
            writeln!(f, "Target Sector: {}", report.sector)?;
            match (report.status, report.cluster) {
                (SectorStatus::Data, Some(cluster)) => {
                    writeln!(f, "Cluster (in FAT): {}", cluster)?;
                    if let Some(first) = report.cluster_first_sector {
                        writeln!(f, "Cluster first sector: {}", first)?;
                        writeln!(
                            f,
                            "Cluster first byte: {}",
                            first * self.boot_sector.bytes_per_sector as u64
                        )?;
                    }
                }
                (SectorStatus::SystemArea, _) => writeln!(f, "System area (no cluster)")?,
                _ => writeln!(f, "Missing...")?,
            }
            if let Some(offset) = report.volume_offset {
                writeln!(f, "Volume offset: {}", offset)?;
            }
            for line in report.dump.iter().flatten() {
                writeln!(f, "{}", line)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_sector::tests::fat32_boot_sector;
    use fatquery_core::{AlignedStream, MemoryDevice};

    /// Volume image of 4096 sectors whose boot sector declares 2048 hidden sectors.
    fn volume() -> AlignedStream<MemoryDevice> {
        let mut data = vec![0u8; 4096 * 512];
        data[..512].copy_from_slice(&fat32_boot_sector());
        let first_data = 232 * 512;
        data[first_data..first_data + 5].copy_from_slice(b"HELLO");

        let geometry = Geometry::from_sectors(512, 4096).unwrap();
        AlignedStream::new(MemoryDevice::new(data, 512), geometry)
    }

    #[test]
    fn test_locate_data_and_system_sectors() {
        let mut stream = volume();
        let geometry = *stream.geometry();
        let targets = [2280, 2287, 2288, 2100];
        let report = run_query("test", &mut stream, Some(&geometry), &targets, false).unwrap();

        assert_eq!(report.first_data_sector, 232);
        assert_eq!(report.first_file_sector, 2264);

        let clusters: Vec<_> = report.sectors.iter().map(|s| s.cluster).collect();
        assert_eq!(clusters, vec![Some(2), Some(2), Some(3), None]);
        assert_eq!(report.sectors[3].status, SectorStatus::SystemArea);
        assert_eq!(report.sectors[0].volume_offset, Some(232 * 512));
    }

    #[test]
    fn test_out_of_volume_sectors_are_missing() {
        let mut stream = volume();
        let report = run_query("test", &mut stream, None, &[10, 2048 + 4096], false).unwrap();

        assert!(report.sectors.iter().all(|s| s.status == SectorStatus::Missing));
    }

    #[test]
    fn test_dump_reads_through_stream() {
        let mut stream = volume();
        let report = run_query("test", &mut stream, None, &[2280], true).unwrap();

        let dump = report.sectors[0].dump.as_ref().unwrap();
        assert_eq!(dump.len(), 32);
        assert!(dump[0].starts_with("0001d000  48454c4c4f"));
        assert!(dump[0].ends_with("HELLO..........."));
    }

    #[test]
    fn test_report_serializes() {
        let mut stream = volume();
        let report = run_query("test", &mut stream, None, &[2288], false).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["sectors"][0]["cluster"], 3);
        assert_eq!(json["sectors"][0]["status"], "data");
        assert!(json.get("geometry").is_none());
    }

    #[test]
    fn test_text_report() {
        let mut stream = volume();
        let report = run_query("vol.img", &mut stream, None, &[2288, 1], false).unwrap();
        let text = report.to_string();

        assert!(text.contains("Start sector: 2048"));
        assert!(text.contains("Cluster (in FAT): 3"));
        assert!(text.contains("Missing..."));
    }
}

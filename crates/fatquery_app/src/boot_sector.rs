//! FAT boot sector (BIOS parameter block) fields needed to turn disk sectors
//! into cluster numbers.

use anyhow::{Context, Result, bail, ensure};
use fatquery_core::{ByteStream, SeekOrigin};
use serde::Serialize;

const BOOT_SECTOR_SIZE: usize = 512;
const DIR_ENTRY_SIZE: u64 = 32;

/// Cluster numbering in the data region starts at 2.
pub const FIRST_DATA_CLUSTER: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootSector {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_entries: u16,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub hidden_sectors: u32,
}

impl BootSector {
    /// Reads and validates the boot sector at the start of `stream`.
    pub fn read_from(stream: &mut impl ByteStream) -> Result<Self> {
        stream
            .seek(0, SeekOrigin::Begin)
            .context("Failed to seek to boot sector")?;
        let raw = stream
            .read(BOOT_SECTOR_SIZE)
            .context("Failed to read boot sector")?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        ensure!(raw.len() >= BOOT_SECTOR_SIZE, "Boot sector is truncated");
        ensure!(
            raw[510] == 0x55 && raw[511] == 0xAA,
            "Missing boot sector signature"
        );

        let u16_at = |at: usize| u16::from_le_bytes([raw[at], raw[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
        };

        let bytes_per_sector = u16_at(11);
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            bail!("Invalid bytes per sector: {}", bytes_per_sector);
        }

        let sectors_per_cluster = raw[13];
        ensure!(
            sectors_per_cluster.is_power_of_two(),
            "Invalid sectors per cluster: {}",
            sectors_per_cluster
        );

        let fat_count = raw[16];
        ensure!(fat_count > 0, "Boot sector declares no FAT copies");

        // FAT12/16 keep the FAT size at 22; FAT32 sets it to zero and moves it to 36.
        let sectors_per_fat = match u16_at(22) {
            0 => u32_at(36),
            small => small as u32,
        };
        ensure!(sectors_per_fat > 0, "Boot sector declares an empty FAT");

        let total_sectors = match u16_at(19) {
            0 => u32_at(32),
            small => small as u32,
        };

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors: u16_at(14),
            fat_count,
            root_entries: u16_at(17),
            total_sectors,
            sectors_per_fat,
            hidden_sectors: u32_at(28),
        })
    }

    pub fn root_dir_sectors(&self) -> u64 {
        let bytes = self.root_entries as u64 * DIR_ENTRY_SIZE;
        bytes.div_ceil(self.bytes_per_sector as u64)
    }

    /// First sector of the data region, relative to the volume start.
    pub fn first_data_sector(&self) -> u64 {
        self.reserved_sectors as u64
            + self.fat_count as u64 * self.sectors_per_fat as u64
            + self.root_dir_sectors()
    }

    /// Disk sector that cluster 0 would start at if the data region
    /// extended backwards. Cluster `n` starts at `first_file_sector + n * spc`.
    pub fn first_file_sector(&self) -> i64 {
        self.hidden_sectors as i64 + self.first_data_sector() as i64
            - (FIRST_DATA_CLUSTER * self.sectors_per_cluster as u64) as i64
    }

    /// Cluster holding the absolute disk `sector`, or `None` if the sector
    /// lies before the data region.
    pub fn cluster_of(&self, sector: u64) -> Option<u64> {
        let data_start = self.hidden_sectors as u64 + self.first_data_sector();
        if sector < data_start {
            return None;
        }
        let relative = sector - data_start;
        Some(relative / self.sectors_per_cluster as u64 + FIRST_DATA_CLUSTER)
    }

    /// First disk sector of `cluster`.
    pub fn cluster_start(&self, cluster: u64) -> Option<u64> {
        let first = self.first_file_sector() as i128
            + cluster as i128 * self.sectors_per_cluster as i128;
        u64::try_from(first).ok()
    }
}

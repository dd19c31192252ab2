use fatquery::{SectorStatus, parse_sector_arg, run_query};
use fatquery_core::StreamOptions;
use fatquery_io::{Source, open_device};
use rstest::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

struct Volume {
    _dir: TempDir,
    image: PathBuf,
    list: PathBuf,
}

/// FAT16-style volume: 512 B/sector, 4 sectors/cluster, 4 reserved, 2 FATs
/// of 16 sectors, 512 root entries, 63 hidden sectors, 1024 sectors long.
#[fixture]
fn volume() -> Volume {
    let dir = TempDir::new().unwrap();

    let mut data = vec![0u8; 1024 * 512];
    let boot = &mut data[..512];
    boot[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    boot[11..13].copy_from_slice(&512u16.to_le_bytes());
    boot[13] = 4;
    boot[14..16].copy_from_slice(&4u16.to_le_bytes());
    boot[16] = 2;
    boot[17..19].copy_from_slice(&512u16.to_le_bytes());
    boot[19..21].copy_from_slice(&1024u16.to_le_bytes());
    boot[22..24].copy_from_slice(&16u16.to_le_bytes());
    boot[28..32].copy_from_slice(&63u32.to_le_bytes());
    boot[510] = 0x55;
    boot[511] = 0xAA;

    let image = dir.path().join("volume.img");
    fs::write(&image, &data).unwrap();

    let list = dir.path().join("sectors.txt");
    fs::write(&list, "63\n\n# comment\n131\n136\n5000\n").unwrap();

    Volume {
        _dir: dir,
        image,
        list,
    }
}

// ============================================================================
// Query Tests
// ============================================================================

// data region starts at 4 + 32 + 32 = 68, disk sector 131
#[rstest]
fn test_query_plain_file(volume: Volume) {
    let sectors = parse_sector_arg(volume.list.to_str().unwrap()).unwrap();
    assert_eq!(sectors, vec![63, 131, 136, 5000]);

    let source = volume.image.to_str().unwrap();
    let mut stream = Source::open(source, &StreamOptions::default()).unwrap();
    assert!(!stream.is_device());

    let report = run_query(source, &mut stream, None, &sectors, false).unwrap();
    assert_eq!(report.first_data_sector, 68);
    assert_eq!(report.first_file_sector, 63 + 68 - 8);

    let statuses: Vec<_> = report.sectors.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SectorStatus::SystemArea,
            SectorStatus::Data,
            SectorStatus::Data,
            SectorStatus::Missing
        ]
    );
    assert_eq!(report.sectors[1].cluster, Some(2));
    assert_eq!(report.sectors[2].cluster, Some(3));
    assert_eq!(report.sectors[2].cluster_first_sector, Some(135));
}

#[rstest]
fn test_device_and_file_reports_agree(volume: Volume) {
    let sectors = [131, 200, 1086];
    let source = volume.image.to_str().unwrap();

    let mut file = Source::open(source, &StreamOptions::default()).unwrap();
    let from_file = run_query(source, &mut file, None, &sectors, true).unwrap();

    let mut device = open_device(&volume.image, &StreamOptions::default()).unwrap();
    let geometry = *device.geometry();
    let from_device = run_query(source, &mut device, Some(&geometry), &sectors, true).unwrap();

    assert_eq!(
        serde_json::to_value(&from_file.sectors).unwrap(),
        serde_json::to_value(&from_device.sectors).unwrap()
    );
    assert_eq!(from_device.geometry.as_ref().unwrap().total_size, 1024 * 512);

    device.close();
    assert!(device.length().is_err());
}

#[rstest]
fn test_unformatted_source_fails(volume: Volume) {
    fs::write(&volume.image, vec![0u8; 4096]).unwrap();
    let source = volume.image.to_str().unwrap();

    let mut stream = Source::open(source, &StreamOptions::default()).unwrap();
    assert!(run_query(source, &mut stream, None, &[1], false).is_err());
}

#![no_main]

use fatquery_core::{AlignedStream, Geometry, MemoryDevice, SeekOrigin, StreamOptions};
use libfuzzer_sys::fuzz_target;

const SECTOR: usize = 512;
const SECTORS: usize = 8;

// Each op is 3 bytes: kind, then a little-endian u16 argument.
fuzz_target!(|data: &[u8]| {
    let image: Vec<u8> = (0..SECTOR * SECTORS).map(|i| (i * 7 % 251) as u8).collect();
    let Ok(geometry) = Geometry::from_sectors(SECTOR as u32, SECTORS as u64) else {
        return;
    };
    let options = StreamOptions::new().with_max_transfer(2 * SECTOR);
    let mut stream = AlignedStream::with_options(
        MemoryDevice::new(image.clone(), SECTOR),
        geometry,
        &options,
    );
    let mut model: u64 = 0;
    let total = image.len() as u64;

    for op in data.chunks_exact(3) {
        let arg = u16::from_le_bytes([op[1], op[2]]) as u64;
        match op[0] % 3 {
            0 => {
                let len = (arg % 2048) as usize;
                match stream.read(len) {
                    Ok(bytes) => {
                        let start = model as usize;
                        assert_eq!(&bytes[..], &image[start..start + len]);
                        model += len as u64;
                    }
                    Err(_) => assert!(len > 0 && model + len as u64 > total),
                }
            }
            1 => {
                let target = arg % (total + 64);
                match stream.seek(target as i64, SeekOrigin::Begin) {
                    Ok(pos) => {
                        assert!(target < total);
                        model = pos;
                    }
                    Err(_) => assert!(target >= total),
                }
            }
            _ => {
                let delta = arg as i64 - 0x8000;
                let target = model as i64 + delta;
                match stream.seek(delta, SeekOrigin::Current) {
                    Ok(pos) => model = pos,
                    Err(_) => assert!(target < 0 || target as u64 >= total),
                }
            }
        }
        assert_eq!(stream.position().ok(), Some(model));
    }
});

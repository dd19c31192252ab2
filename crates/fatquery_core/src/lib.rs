//! Sector-aligned random-access reading.
//!
//! [`AlignedStream`] exposes a byte-addressable [`ByteStream`] over any
//! [`SectorDevice`], a medium that only accepts whole, aligned sectors.

mod error;
pub mod geometry;
pub mod memory;
mod options;
pub mod sector_cache;
pub mod stream;
mod traits;

pub use error::{ErrorKind, Result, StreamError};
pub use geometry::{Geometry, GeometryError};
pub use memory::MemoryDevice;
pub use options::StreamOptions;
pub use sector_cache::SectorCache;
pub use stream::AlignedStream;
pub use traits::{ByteStream, SectorDevice, SeekOrigin, read_end, resolve_seek, seek_args};

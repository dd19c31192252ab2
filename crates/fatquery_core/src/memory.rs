//! In-memory sector device.
//!
//! Behaves like a raw device that rejects unaligned transfers, and records
//! every transfer so callers can check how many device reads a request cost.

use crate::error::{Result, StreamError};
use crate::traits::SectorDevice;
use std::io;

pub struct MemoryDevice {
    data: Vec<u8>,
    sector_size: usize,
    cursor: u64,
    closed: bool,
    transfers: Vec<(u64, usize)>,
    repositions: usize,
    fail_after: Option<usize>,
    fail_reposition: bool,
    truncate_next: Option<usize>,
}

impl MemoryDevice {
    pub fn new(data: Vec<u8>, sector_size: usize) -> Self {
        assert!(sector_size > 0, "Sector size must be greater than 0");

        Self {
            data,
            sector_size,
            cursor: 0,
            closed: false,
            transfers: Vec::new(),
            repositions: 0,
            fail_after: None,
            fail_reposition: false,
            truncate_next: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// `(offset, length)` of every successful or short transfer, in order.
    pub fn transfers(&self) -> &[(u64, usize)] {
        &self.transfers
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn repositions(&self) -> usize {
        self.repositions
    }

    pub fn clear_log(&mut self) {
        self.transfers.clear();
        self.repositions = 0;
    }

    /// Fails every transfer once `count` further transfers have succeeded.
    pub fn fail_after(&mut self, count: usize) {
        self.fail_after = Some(self.transfers.len() + count);
    }

    /// Makes the next reposition fail, leaving the cursor where it was.
    pub fn fail_next_reposition(&mut self) {
        self.fail_reposition = true;
    }

    /// Makes the next transfer deliver at most `bytes` bytes.
    pub fn truncate_next(&mut self, bytes: usize) {
        self.truncate_next = Some(bytes);
    }

    fn check_aligned(&self, offset: u64, len: usize) -> Result<()> {
        let sector = self.sector_size as u64;
        if offset % sector != 0 || len as u64 % sector != 0 {
            return Err(StreamError::Read {
                offset,
                source: io::Error::new(io::ErrorKind::InvalidInput, "unaligned transfer"),
            });
        }
        Ok(())
    }
}

impl SectorDevice for MemoryDevice {
    fn read_aligned(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        if self.closed {
            return Err(StreamError::InvalidState);
        }
        self.check_aligned(offset, buf.len())?;

        if self.fail_after.is_some_and(|limit| self.transfers.len() >= limit) {
            return Err(StreamError::Read {
                offset,
                source: io::Error::other("injected device fault"),
            });
        }

        let start = usize::try_from(offset)
            .map_err(|_| StreamError::Read {
                offset,
                source: io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds address space"),
            })?
            .min(self.data.len());
        let mut actual = buf.len().min(self.data.len() - start);
        if let Some(limit) = self.truncate_next.take() {
            actual = actual.min(limit);
        }

        buf[..actual].copy_from_slice(&self.data[start..start + actual]);
        self.cursor = offset + actual as u64;
        self.transfers.push((offset, actual));

        if actual != buf.len() {
            return Err(StreamError::ShortRead {
                offset,
                expected: buf.len(),
                actual,
            });
        }
        Ok(())
    }

    fn set_aligned_position(&mut self, offset: u64) -> Result<()> {
        if self.closed {
            return Err(StreamError::InvalidState);
        }
        self.check_aligned(offset, 0)?;
        if std::mem::take(&mut self.fail_reposition) {
            return Err(StreamError::Read {
                offset,
                source: io::Error::other("injected reposition fault"),
            });
        }
        if offset > self.data.len() as u64 {
            return Err(StreamError::Read {
                offset,
                source: io::Error::new(io::ErrorKind::InvalidInput, "position past end of device"),
            });
        }
        self.cursor = offset;
        self.repositions += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

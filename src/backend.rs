// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Sector storage behind a device.
// The lock manager never calls into this; handles use it for data transfer
// and the device reads its capacity from it.

use std::io;
use std::sync::{Mutex, PoisonError};

/// Size of one addressable sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Storage that a device copies sectors into and out of.
pub trait BlockBackend: Send + Sync {
    /// Number of addressable sectors.
    fn capacity(&self) -> u64;

    /// Fill `buf` with the sectors starting at `sector`.
    /// `buf.len()` must be a multiple of [`SECTOR_SIZE`].
    fn read_sectors(&self, sector: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Store `data` into the sectors starting at `sector`.
    /// `data.len()` must be a multiple of [`SECTOR_SIZE`].
    fn write_sectors(&self, sector: u64, data: &[u8]) -> io::Result<()>;
}

/// Zero-initialised in-memory sectors.
pub struct MemoryBackend {
    nsectors: u64,
    data: Mutex<Vec<u8>>,
}

impl MemoryBackend {
    /// Allocate `nsectors` zeroed sectors.
    ///
    /// # Errors
    /// `InvalidInput` if the total byte size does not fit in memory.
    pub fn new(nsectors: u64) -> io::Result<Self> {
        let len = usize::try_from(nsectors)
            .ok()
            .and_then(|n| n.checked_mul(SECTOR_SIZE))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{nsectors} sectors exceed the addressable size"),
                )
            })?;
        Ok(Self {
            nsectors,
            data: Mutex::new(vec![0u8; len]),
        })
    }

    /// Byte range for a transfer of `len` bytes at `sector`, or an error if
    /// it is misaligned or runs past the end of the disk.
    fn byte_range(&self, sector: u64, len: usize) -> io::Result<std::ops::Range<usize>> {
        if len % SECTOR_SIZE != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("transfer of {len} bytes is not a whole number of sectors"),
            ));
        }
        let count = (len / SECTOR_SIZE) as u64;
        match sector.checked_add(count) {
            Some(end) if end <= self.nsectors => {
                let start = sector as usize * SECTOR_SIZE;
                Ok(start..start + len)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "sectors {sector}..{} out of range (capacity {})",
                    sector.saturating_add(count),
                    self.nsectors
                ),
            )),
        }
    }
}

impl BlockBackend for MemoryBackend {
    fn capacity(&self) -> u64 {
        self.nsectors
    }

    fn read_sectors(&self, sector: u64, buf: &mut [u8]) -> io::Result<()> {
        let range = self.byte_range(sector, buf.len())?;
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        buf.copy_from_slice(&data[range]);
        Ok(())
    }

    fn write_sectors(&self, sector: u64, data: &[u8]) -> io::Result<()> {
        let range = self.byte_range(sector, data.len())?;
        let mut store = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        store[range].copy_from_slice(data);
        Ok(())
    }
}

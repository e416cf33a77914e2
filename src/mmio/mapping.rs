//! Memory-mapped register window
//!
//! Maps either a PCI BAR through its sysfs `resourceN` file or a register
//! dump file. Every access is a single volatile load or store so the compiler
//! never merges, caches, or reorders register traffic.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::ptr;

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use super::RegisterSpace;
use crate::error::{Error, Result};

/// A mapped window of 32-bit registers
#[derive(Debug)]
pub struct MmioMapping {
    map: MmapMut,
    path: PathBuf,
}

impl MmioMapping {
    /// Map `len` bytes of a device BAR, shared with the hardware
    pub fn open_device(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::mapping(path, e))?;

        let bar_len = file.metadata().map_err(|e| Error::mapping(path, e))?.len() as usize;
        let len = if bar_len > 0 { len.min(bar_len) } else { len };

        // Safety: the BAR stays mapped until the MmapMut is dropped, and all
        // accesses go through volatile reads and writes.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }
            .map_err(|e| Error::mapping(path, e))?;

        debug!("mapped {:#x} bytes of {}", len, path.display());
        Ok(Self {
            map,
            path: path.to_path_buf(),
        })
    }

    /// Map a register dump file privately; writes never reach the file
    pub fn open_dump(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| Error::mapping(path, e))?;

        // Safety: a private copy-on-write mapping; concurrent modification
        // of the file by another process is outside our control but cannot
        // violate memory safety of volatile u32 accesses.
        let map = unsafe { MmapOptions::new().map_copy(&file) }
            .map_err(|e| Error::mapping(path, e))?;

        debug!("mapped register dump {} ({:#x} bytes)", path.display(), map.len());
        Ok(Self {
            map,
            path: path.to_path_buf(),
        })
    }

    /// Length of the mapped window in bytes
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is mapped
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// File the window was mapped from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checked_offset(&self, offset: u32) -> Result<usize> {
        let start = offset as usize;
        if start % 4 != 0 || start + 4 > self.map.len() {
            return Err(Error::OffsetOutOfBounds {
                offset,
                len: self.map.len(),
            });
        }
        Ok(start)
    }
}

impl RegisterSpace for MmioMapping {
    fn read32(&self, offset: u32) -> Result<u32> {
        let start = self.checked_offset(offset)?;
        // Safety: start is 4-byte aligned and start + 4 lies inside the
        // mapping, which is page aligned.
        Ok(unsafe { ptr::read_volatile(self.map.as_ptr().add(start) as *const u32) })
    }

    fn write32(&mut self, offset: u32, value: u32) -> Result<()> {
        let start = self.checked_offset(offset)?;
        // Safety: as in read32.
        unsafe { ptr::write_volatile(self.map.as_mut_ptr().add(start) as *mut u32, value) };
        Ok(())
    }
}

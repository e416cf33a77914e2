//! SysV shared-memory publishing of the primary ring's load
//!
//! Another process can attach the segment keyed by [`SHM_KEY`] and read a
//! single native-endian `i32` holding the render ring's percent-busy. The
//! segment is created on the first write.

use std::io;
use std::mem;
use std::ptr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::report::ReportSink;
use crate::types::RingReport;

/// Well-known key of the published segment
pub const SHM_KEY: libc::key_t = 0x4750_5554;

/// An attached SysV shared-memory integer
#[derive(Debug)]
struct Segment {
    id: libc::c_int,
    addr: *mut i32,
}

impl Segment {
    fn attach(key: libc::key_t) -> Result<Self> {
        // Safety: plain syscalls; the returned address is checked below.
        let id = unsafe { libc::shmget(key, mem::size_of::<i32>(), libc::IPC_CREAT | 0o666) };
        if id < 0 {
            return Err(Error::SharedMemory {
                operation: "shmget",
                source: io::Error::last_os_error(),
            });
        }

        let addr = unsafe { libc::shmat(id, ptr::null(), 0) };
        if addr as isize == -1 {
            return Err(Error::SharedMemory {
                operation: "shmat",
                source: io::Error::last_os_error(),
            });
        }

        if key == libc::IPC_PRIVATE {
            // Private segments go away with their last attachment.
            unsafe { libc::shmctl(id, libc::IPC_RMID, ptr::null_mut()) };
        }

        debug!("attached shared memory segment {} (key {:#x})", id, key);
        Ok(Self {
            id,
            addr: addr as *mut i32,
        })
    }

    fn store(&mut self, value: i32) {
        // Safety: addr is an attached segment of at least size_of::<i32>()
        // bytes, page aligned, and lives until detach in drop.
        unsafe { ptr::write_volatile(self.addr, value) };
    }

    fn load(&self) -> i32 {
        // Safety: as in store.
        unsafe { ptr::read_volatile(self.addr) }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        // Safety: addr came from shmat and is detached exactly once.
        if unsafe { libc::shmdt(self.addr as *const libc::c_void) } != 0 {
            warn!(
                "failed to detach shared memory segment {}: {}",
                self.id,
                io::Error::last_os_error()
            );
        }
    }
}

/// Publishes the primary ring's percent-busy to shared memory
#[derive(Debug)]
pub struct ShmSink {
    key: libc::key_t,
    segment: Option<Segment>,
}

impl ShmSink {
    /// Sink for the well-known key
    pub fn new() -> Self {
        Self::with_key(SHM_KEY)
    }

    /// Sink for a custom key
    pub fn with_key(key: libc::key_t) -> Self {
        Self { key, segment: None }
    }

    /// Returns true once the segment has been created and attached
    pub fn is_attached(&self) -> bool {
        self.segment.is_some()
    }

    /// Last value written, if attached
    pub fn last_value(&self) -> Option<i32> {
        self.segment.as_ref().map(Segment::load)
    }

    fn publish(&mut self, value: i32) -> Result<()> {
        if self.segment.is_none() {
            self.segment = Some(Segment::attach(self.key)?);
        }
        if let Some(ref mut segment) = self.segment {
            segment.store(value);
        }
        Ok(())
    }
}

impl Default for ShmSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for ShmSink {
    fn emit(&mut self, ring: &RingReport) -> Result<()> {
        if !ring.primary {
            return Ok(());
        }
        // Publishing is best effort; the text report carries on without it.
        if let Err(e) = self.publish(ring.percent_busy() as i32) {
            warn!("{}", e);
        }
        Ok(())
    }
}

//! Ring buffer state tracking
//!
//! Each command streamer consumes a circular buffer of commands. The CPU
//! advances the tail as it queues work and the GPU advances the head as it
//! executes it; a ring whose head has caught up with its tail is idle.

use tracing::{debug, warn};

use crate::chipset::Capabilities;
use crate::error::{Error, Result};
use crate::mmio::{RegisterAccess, RegisterSpace};
use crate::regs::ring::*;
use crate::types::RingReport;

/// Raw length register value of a device that has dropped off the bus
const ALL_ONES: u32 = 0xffff_ffff;

/// One monitored command ring
#[derive(Debug, Clone)]
pub struct Ring {
    name: &'static str,
    mmio: u32,
    size: u32,
    head: u32,
    tail: u32,
    idle: u32,
    full: u64,
}

impl Ring {
    /// Create an uninitialized ring; it stays inert until [`Ring::init`]
    pub fn new(name: &'static str, mmio: u32) -> Self {
        Self {
            name,
            mmio,
            size: 0,
            head: 0,
            tail: 0,
            idle: 0,
            full: 0,
        }
    }

    /// The rings a device with `caps` exposes, render ring first
    pub fn for_capabilities(caps: &Capabilities) -> Vec<Ring> {
        let mut rings = vec![Ring::new("render", RENDER_BASE)];
        if caps.bsd_ring {
            rings.push(Ring::new("bitstream", BSD_BASE));
        }
        if caps.video_ring {
            rings.push(Ring::new("bitstream", GEN6_BSD_BASE));
        }
        if caps.blitter_ring {
            rings.push(Ring::new("blitter", BLT_BASE));
        }
        rings
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// MMIO base offset of the ring's registers
    pub fn mmio(&self) -> u32 {
        self.mmio
    }

    /// Capacity in bytes, 0 while the ring is absent
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Head offset seen by the last sample
    pub fn head(&self) -> u32 {
        self.head
    }

    /// Tail offset seen by the last sample
    pub fn tail(&self) -> u32 {
        self.tail
    }

    /// Idle samples in the current window
    pub fn idle(&self) -> u32 {
        self.idle
    }

    /// Outstanding bytes summed over the current window
    pub fn full(&self) -> u64 {
        self.full
    }

    /// Returns true once the ring has a size
    pub fn is_present(&self) -> bool {
        self.size != 0
    }

    /// Read the ring length from the control register
    ///
    /// A safe-mode refusal leaves the ring inert. An all-ones length from an
    /// unchecked read means the device is gone.
    pub fn init<S: RegisterSpace>(&mut self, regs: &RegisterAccess<S>) -> Result<()> {
        let ctl = match regs.try_read(self.mmio + CTL) {
            Ok(value) => value,
            Err(e) if e.is_recoverable() => {
                warn!("{} ring left inactive: {}", self.name, e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if ctl == ALL_ONES && !regs.is_safe() {
            return Err(Error::GpuUnavailable);
        }

        self.size = Self::size_from_ctl(ctl);
        debug!(
            "{} ring at {:#x}: {} bytes",
            self.name, self.mmio, self.size
        );
        Ok(())
    }

    /// Ring size in bytes encoded by a control register value
    pub fn size_from_ctl(ctl: u32) -> u32 {
        (((ctl & NR_PAGES) >> NR_PAGES_SHIFT) + 1) * PAGE_SIZE
    }

    /// Start a new measurement window
    pub fn reset(&mut self) {
        self.idle = 0;
        self.full = 0;
    }

    /// Take one head/tail sample
    ///
    /// Both pointers reading all ones without safe mode means the device
    /// dropped off the bus.
    pub fn sample<S: RegisterSpace>(&mut self, regs: &RegisterAccess<S>) -> Result<()> {
        if self.size == 0 {
            return Ok(());
        }

        let head = regs.read(self.mmio + HEAD);
        let tail = regs.read(self.mmio + TAIL);
        if head == ALL_ONES && tail == ALL_ONES && !regs.is_safe() {
            return Err(Error::GpuUnavailable);
        }

        self.head = (head & HEAD_ADDR) % self.size;
        self.tail = (tail & TAIL_ADDR) % self.size;

        if self.head == self.tail {
            self.idle += 1;
        }

        self.full += u64::from(outstanding(self.head, self.tail, self.size));
        Ok(())
    }

    /// Summarize the window that just closed
    pub fn report(&self, actual_samples: u32, primary: bool) -> RingReport {
        RingReport {
            name: self.name,
            idle: self.idle,
            full: self.full,
            size: self.size,
            actual_samples,
            primary,
        }
    }
}

/// Bytes queued between `head` and `tail` in a ring of `size` bytes
pub fn outstanding(head: u32, tail: u32, size: u32) -> u32 {
    let full = i64::from(tail) - i64::from(head);
    if full < 0 {
        (full + i64::from(size)) as u32
    } else {
        full as u32
    }
}

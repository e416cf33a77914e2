//! Data types shared by the sampler and its report sinks

use std::path::PathBuf;

use crate::chipset::INTEL_VENDOR_ID;
use crate::stats::StatCounter;

/// Information about a detected graphics device
#[derive(Debug, Clone)]
pub struct GpuInfo {
    /// PCI slot (e.g., "0000:00:02.0")
    pub slot: String,
    /// sysfs device directory
    pub sysfs_path: PathBuf,
    /// PCI vendor ID (should be 0x8086 for Intel)
    pub vendor_id: u16,
    /// PCI device ID
    pub device_id: u16,
    /// PCI class code (0x03xxxx for display controllers)
    pub class: u32,
    /// Kernel driver bound to the device, if any
    pub driver: Option<String>,
}

impl GpuInfo {
    /// Returns true if this is an Intel device
    pub fn is_intel(&self) -> bool {
        self.vendor_id == INTEL_VENDOR_ID
    }

    /// Returns true if the PCI class is a display controller
    pub fn is_display(&self) -> bool {
        self.class >> 16 == 0x03
    }

    /// sysfs file exposing PCI BAR `bar`
    pub fn resource_path(&self, bar: u8) -> PathBuf {
        self.sysfs_path.join(format!("resource{}", bar))
    }
}

/// Timing of one measurement window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    /// Samples the window aims for
    pub target_samples: u32,
    /// Clock reading when the window opened, in microseconds
    pub started_at_us: u64,
    /// Samples actually taken
    pub actual_samples: u32,
    /// True if wall time ran out before the target was reached
    pub closed_early: bool,
}

impl SamplingWindow {
    /// Returns true if every target sample was taken
    pub fn is_complete(&self) -> bool {
        self.actual_samples == self.target_samples
    }
}

/// One ring's result for a closed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingReport {
    /// Ring display name
    pub name: &'static str,
    /// Samples where head == tail
    pub idle: u32,
    /// Outstanding bytes summed over all samples
    pub full: u64,
    /// Ring capacity in bytes
    pub size: u32,
    /// Samples taken in the window
    pub actual_samples: u32,
    /// True for the render ring, the one published externally
    pub primary: bool,
}

impl RingReport {
    /// Share of samples in which the ring had work, 0 - 100
    pub fn percent_busy(&self) -> u32 {
        if self.actual_samples == 0 {
            return 0;
        }
        let idle = u64::from(self.idle.min(self.actual_samples));
        (100 - 100 * idle / u64::from(self.actual_samples)) as u32
    }

    /// Mean outstanding bytes per sample
    pub fn average_full(&self) -> u64 {
        if self.actual_samples == 0 {
            0
        } else {
            self.full / u64::from(self.actual_samples)
        }
    }
}

/// A pipeline statistics counter read at report time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    /// Which counter
    pub counter: StatCounter,
    /// Raw 64-bit value
    pub value: u64,
    /// Change since the previous report
    pub delta: u64,
}

/// Everything produced by one closed window
#[derive(Debug, Clone)]
pub struct WindowReport {
    /// Window timing
    pub window: SamplingWindow,
    /// One entry per present ring
    pub rings: Vec<RingReport>,
    /// Counter deltas, empty when the device has no counters
    pub counters: Vec<CounterSample>,
}

impl WindowReport {
    /// The externally published ring, if present
    pub fn primary(&self) -> Option<&RingReport> {
        self.rings.iter().find(|r| r.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(idle: u32, actual_samples: u32) -> RingReport {
        RingReport {
            name: "render",
            idle,
            full: 0,
            size: 4096,
            actual_samples,
            primary: true,
        }
    }

    #[test]
    fn test_percent_busy_bounds() {
        assert_eq!(report(100, 100).percent_busy(), 0);
        assert_eq!(report(0, 100).percent_busy(), 100);
        assert_eq!(report(25, 100).percent_busy(), 75);
        assert_eq!(report(0, 0).percent_busy(), 0);
    }

    #[test]
    fn test_percent_busy_uses_actual_samples() {
        // 10 idle of 40 taken is 75% busy, not 90%
        assert_eq!(report(10, 40).percent_busy(), 75);
        assert_eq!(report(1, 3).percent_busy(), 67);
    }

    #[test]
    fn test_average_full() {
        let mut r = report(0, 4);
        r.full = 400;
        assert_eq!(r.average_full(), 100);
    }

    #[test]
    fn test_gpu_info_class() {
        let info = GpuInfo {
            slot: "0000:00:02.0".into(),
            sysfs_path: PathBuf::from("/sys/bus/pci/devices/0000:00:02.0"),
            vendor_id: 0x8086,
            device_id: 0x0126,
            class: 0x030000,
            driver: Some("i915".into()),
        };
        assert!(info.is_intel());
        assert!(info.is_display());
        assert_eq!(
            info.resource_path(0),
            PathBuf::from("/sys/bus/pci/devices/0000:00:02.0/resource0")
        );
    }
}

//! Intel GPU Ring Utilization Library
//!
//! Estimates how busy an Intel integrated GPU is by sampling the head and
//! tail pointers of its command rings directly through memory-mapped
//! registers. A ring whose head equals its tail has nothing queued; the
//! fraction of samples in which the render ring was not idle is reported as
//! its percent-busy, once per second.
//!
//! # Platform Support
//!
//! - **Linux**: Maps the GPU's PCI BAR through sysfs (requires root)
//!
//! # Features
//!
//! - Render, bitstream and blitter ring sampling at 100 Hz
//! - Chipset identification and per-generation ring layout
//! - Safe mode that validates every access against a register map
//! - GT forcewake through debugfs or the register handshake
//! - Optional pipeline statistics counters
//! - Publishing the render load to SysV shared memory
//! - Replaying register dumps without hardware
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> intel_gpu_top::Result<()> {
//! use intel_gpu_top::linux::{AccessOptions, IntelGpu};
//! use intel_gpu_top::TextSink;
//! use std::sync::atomic::AtomicBool;
//!
//! let gpu = IntelGpu::detect(AccessOptions::default())?;
//! let mut sampler = gpu.into_sampler()?;
//!
//! let running = AtomicBool::new(true);
//! let mut sink = TextSink::new(std::io::stdout());
//! sampler.run(&mut sink, &running)?;
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chipset;
pub mod error;
pub mod mmio;
pub mod regs;
pub mod report;
pub mod ring;
pub mod sampler;
pub mod stats;
pub mod types;

#[cfg(target_os = "linux")]
pub mod linux;

// Re-export main types at crate root
pub use chipset::{Capabilities, Chipset};
pub use error::{Error, Result};
pub use mmio::{AccessMode, RegisterAccess, RegisterSpace};
pub use report::{ReportSink, SinkSet, TextSink};
pub use ring::Ring;
pub use sampler::{Clock, Sampler, SystemClock};
pub use stats::{PipelineStatistics, StatCounter};
pub use types::*;

#[cfg(target_os = "linux")]
pub use linux::{AccessOptions, IntelGpu};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check if the current platform is supported
pub fn is_platform_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Get a human-readable description of the current platform support status
pub fn platform_support_status() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "Linux: supported via PCI BAR mapping"
    }

    #[cfg(not(target_os = "linux"))]
    {
        "This platform is not supported"
    }
}

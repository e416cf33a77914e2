//! Linux device access: PCI discovery, BAR mapping and forcewake
//!
//! The register window is mapped from the device's sysfs `resourceN` file,
//! which requires root. A register dump can be replayed instead through
//! [`IntelGpu::from_dump`].

pub mod forcewake;
pub mod pci;
pub mod shm;

use tracing::{info, warn};

use crate::chipset::{Capabilities, Chipset};
use crate::error::Result;
use crate::mmio::{MmioMapping, RegisterAccess, RegisterMap};
use crate::sampler::{Sampler, SystemClock};
use crate::types::GpuInfo;

/// Generation assumed for Intel devices missing from the chipset table
const FALLBACK_GENERATION: u32 = 12;

/// How registers are accessed
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessOptions {
    /// Validate every access against the generation's register map
    pub safe: bool,
}

/// A mapped Intel GPU ready to be sampled
pub struct IntelGpu {
    info: Option<GpuInfo>,
    chipset: Chipset,
    regs: RegisterAccess<MmioMapping>,
}

impl IntelGpu {
    /// Detect and map the first Intel GPU
    pub fn detect(options: AccessOptions) -> Result<Self> {
        let info = pci::find_gpu()?;
        Self::open_device(info, options)
    }

    /// Map the GPU at a specific PCI slot (e.g., "0000:00:02.0")
    pub fn open(slot: &str, options: AccessOptions) -> Result<Self> {
        let info = pci::open_slot(slot)?;
        Self::open_device(info, options)
    }

    /// Replay a register dump taken from a device of the given chipset
    pub fn from_dump(
        path: impl AsRef<std::path::Path>,
        chipset: Chipset,
        options: AccessOptions,
    ) -> Result<Self> {
        let mapping = MmioMapping::open_dump(path)?;
        info!("replaying {} as {}", mapping.path().display(), chipset);
        Ok(Self {
            info: None,
            chipset,
            regs: register_access(mapping, &chipset, options),
        })
    }

    fn open_device(info: GpuInfo, options: AccessOptions) -> Result<Self> {
        let chipset = resolve_chipset(info.device_id);

        let mapping = MmioMapping::open_device(
            info.resource_path(chipset.mmio_bar()),
            chipset.mmio_len(),
        )?;
        let mut regs = register_access(mapping, &chipset, options);

        if chipset.capabilities().forcewake {
            match pci::drm_minor(&info).and_then(forcewake::open_forcewake_user) {
                Some(file) => regs.hold_kernel_forcewake(file),
                None if info.driver.is_none() => {
                    regs.acquire_register_forcewake();
                }
                None => warn!("GT forcewake unavailable; idle rings may read as zero"),
            }
        }

        info!(
            "GPU {} at {} (driver: {})",
            chipset,
            info.slot,
            info.driver.as_deref().unwrap_or("none")
        );

        Ok(Self {
            info: Some(info),
            chipset,
            regs,
        })
    }

    /// PCI information, `None` when replaying a dump
    pub fn gpu_info(&self) -> Option<&GpuInfo> {
        self.info.as_ref()
    }

    /// Resolved chipset
    pub fn chipset(&self) -> &Chipset {
        &self.chipset
    }

    /// Optional features of this device
    pub fn capabilities(&self) -> Capabilities {
        self.chipset.capabilities()
    }

    /// Returns true if accesses are validated
    pub fn is_safe(&self) -> bool {
        self.regs.is_safe()
    }

    /// Initialize the rings and hand the register window to a sampler
    pub fn into_sampler(self) -> Result<Sampler<MmioMapping, SystemClock>> {
        let caps = self.capabilities();
        Sampler::new(self.regs, &caps, SystemClock::new())
    }
}

/// Identify a device id, assuming a recent generation for unknown ids
pub fn resolve_chipset(device_id: u16) -> Chipset {
    Chipset::from_device_id(device_id).unwrap_or_else(|| {
        warn!(
            "unknown device id 0x{:04x}, assuming gen{}",
            device_id, FALLBACK_GENERATION
        );
        Chipset::with_generation(device_id, FALLBACK_GENERATION)
    })
}

fn register_access(
    mapping: MmioMapping,
    chipset: &Chipset,
    options: AccessOptions,
) -> RegisterAccess<MmioMapping> {
    if options.safe {
        RegisterAccess::with_map(mapping, RegisterMap::for_chipset(chipset))
    } else {
        RegisterAccess::new(mapping)
    }
}

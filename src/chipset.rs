//! Device identifier to hardware generation lookup
//!
//! Only the facts the sampler needs are resolved here: which generation a
//! PCI device id belongs to, and which optional register blocks that
//! generation exposes.

use std::fmt;

/// Intel PCI vendor ID
pub const INTEL_VENDOR_ID: u16 = 0x8086;

/// A resolved graphics generation with its optional features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chipset {
    /// PCI device ID the chipset was resolved from
    pub device_id: u16,
    /// Hardware generation (2 = i8xx, 3 = i915/i945/G33, 4 = i965/G4x, ...)
    pub generation: u32,
    /// Marketing family name
    pub family: &'static str,
}

/// Optional hardware features, resolved once at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Gen4/Gen5 bitstream decode ring at 0x4030
    pub bsd_ring: bool,
    /// Gen6 to gen10 video ring at 0x12030
    pub video_ring: bool,
    /// Gen6+ blitter ring at 0x22030
    pub blitter_ring: bool,
    /// 64-bit pipeline statistics counters
    pub stats_regs: bool,
    /// GT must be kept awake for register reads
    pub forcewake: bool,
}

impl Chipset {
    /// Resolve a chipset from its PCI device ID
    ///
    /// Unknown IDs resolve to `None`; callers may fall back to
    /// [`Chipset::with_generation`] when the generation is known by other means.
    pub fn from_device_id(device_id: u16) -> Option<Self> {
        let (generation, family) = match device_id {
            0x3577 | 0x2562 | 0x3582 | 0x358e | 0x2572 => (2, "i8xx"),

            0x2582 | 0x258a | 0x2592 | 0x2772 | 0x27a2 | 0x27ae => (3, "i915/i945"),
            0x29b2 | 0x29c2 | 0x29d2 | 0xa001 | 0xa011 => (3, "G33/Pineview"),

            0x29a2 | 0x2982 | 0x2992 | 0x2972 | 0x2a02 | 0x2a12 => (4, "i965"),
            0x2a42 | 0x2e02 | 0x2e12 | 0x2e22 | 0x2e32 | 0x2e42 | 0x2e92 => (4, "G4x"),

            0x0042 | 0x0046 => (5, "Ironlake"),

            0x0102 | 0x0106 | 0x010a | 0x0112 | 0x0116 | 0x0122 | 0x0126 => (6, "Sandybridge"),

            0x0152 | 0x0156 | 0x015a | 0x0162 | 0x0166 | 0x016a => (7, "Ivybridge"),
            0x0f30..=0x0f33 => (7, "Valleyview"),
            id if matches!(id >> 8, 0x04 | 0x0a | 0x0c | 0x0d) => (7, "Haswell"),

            id if id >> 8 == 0x16 => (8, "Broadwell"),
            0x22b0..=0x22b3 => (8, "Cherryview"),

            id if matches!(id >> 8, 0x19 | 0x59 | 0x3e | 0x87 | 0x9b) => (9, "Skylake-family"),
            0x5a84 | 0x5a85 | 0x1a84 | 0x1a85 | 0x3184 | 0x3185 => (9, "Broxton/Geminilake"),
            0x5a40..=0x5a5f => (10, "Cannonlake"),

            id if matches!(id >> 8, 0x8a | 0x4e | 0x4c | 0x9a) => (11, "Icelake-family"),
            id if matches!(id >> 8, 0x46 | 0x56 | 0xa7) => (12, "Xe"),

            _ => return None,
        };

        Some(Self {
            device_id,
            generation,
            family,
        })
    }

    /// Build a chipset for an explicit generation (e.g. replaying a dump)
    pub fn with_generation(device_id: u16, generation: u32) -> Self {
        Self {
            device_id,
            generation,
            family: "unknown",
        }
    }

    /// Optional features available on this generation
    pub fn capabilities(&self) -> Capabilities {
        let gen = self.generation;
        Capabilities {
            bsd_ring: gen == 4 || gen == 5,
            // gen11 moved the video engines to 0x1c0000
            video_ring: (6..=10).contains(&gen),
            blitter_ring: gen >= 6,
            stats_regs: gen >= 4,
            forcewake: gen >= 6,
        }
    }

    /// PCI BAR that holds the register window
    pub fn mmio_bar(&self) -> u8 {
        if self.generation == 2 {
            1
        } else {
            0
        }
    }

    /// Size of the register window to map
    pub fn mmio_len(&self) -> usize {
        if self.generation < 5 {
            512 * 1024
        } else {
            2 * 1024 * 1024
        }
    }
}

impl fmt::Display for Chipset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (gen{}, 0x{:04x})",
            self.family, self.generation, self.device_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_generations() {
        assert_eq!(Chipset::from_device_id(0x3577).unwrap().generation, 2);
        assert_eq!(Chipset::from_device_id(0x2a42).unwrap().generation, 4);
        assert_eq!(Chipset::from_device_id(0x0046).unwrap().generation, 5);
        assert_eq!(Chipset::from_device_id(0x0126).unwrap().generation, 6);
        assert_eq!(Chipset::from_device_id(0x0166).unwrap().generation, 7);
        assert_eq!(Chipset::from_device_id(0x0412).unwrap().generation, 7);
        assert_eq!(Chipset::from_device_id(0x1616).unwrap().generation, 8);
        assert_eq!(Chipset::from_device_id(0x3e92).unwrap().generation, 9);
        assert!(Chipset::from_device_id(0xffff).is_none());
    }

    #[test]
    fn test_capabilities_by_generation() {
        let ilk = Chipset::with_generation(0x0046, 5).capabilities();
        assert!(ilk.bsd_ring);
        assert!(!ilk.video_ring);
        assert!(!ilk.blitter_ring);
        assert!(ilk.stats_regs);
        assert!(!ilk.forcewake);

        let snb = Chipset::with_generation(0x0126, 6).capabilities();
        assert!(!snb.bsd_ring);
        assert!(snb.video_ring);
        assert!(snb.blitter_ring);
        assert!(snb.forcewake);

        let tgl = Chipset::from_device_id(0x4680).unwrap().capabilities();
        assert!(!tgl.video_ring);
        assert!(tgl.blitter_ring);
        assert!(tgl.forcewake);

        let gen3 = Chipset::with_generation(0x2592, 3).capabilities();
        assert_eq!(gen3, Capabilities::default());
    }

    #[test]
    fn test_mmio_window() {
        let gen2 = Chipset::with_generation(0x3577, 2);
        assert_eq!(gen2.mmio_bar(), 1);
        assert_eq!(gen2.mmio_len(), 512 * 1024);

        let gen7 = Chipset::with_generation(0x0166, 7);
        assert_eq!(gen7.mmio_bar(), 0);
        assert_eq!(gen7.mmio_len(), 2 * 1024 * 1024);
    }
}

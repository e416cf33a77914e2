//! Per-generation register range tables for safe-mode access checks

use super::AccessMode;
use crate::chipset::Chipset;
use crate::error::AccessDenial;

/// Range access flags
pub mod flags {
    /// Shouldn't be read or written
    pub const RESERVED: u32 = 0;
    /// Readable
    pub const READ: u32 = 1 << 0;
    /// Writable
    pub const WRITE: u32 = 1 << 1;
    /// Readable and writable
    pub const RW: u32 = READ | WRITE;
}

/// One entry of a register access table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRange {
    /// First byte offset covered by the range
    pub base: u32,
    /// Number of bytes covered
    pub size: u32,
    /// Access flags (see [`flags`])
    pub flags: u32,
}

impl RegisterRange {
    /// Create a new range
    pub const fn new(base: u32, size: u32, flags: u32) -> Self {
        Self { base, size, flags }
    }

    /// Returns true if `offset` falls in `[base, base + size)`
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset - self.base < self.size
    }

    /// Returns true if the range is reserved
    pub fn is_reserved(&self) -> bool {
        self.flags & flags::RW == flags::RESERVED
    }

    /// Returns true if the range allows `mode`
    pub fn allows(&self, mode: AccessMode) -> bool {
        self.flags & mode.flag() != 0
    }
}

/// Ordered register access table for one device
#[derive(Debug, Clone)]
pub struct RegisterMap {
    ranges: Vec<RegisterRange>,
    top: u32,
    alignment_mask: u32,
}

impl RegisterMap {
    /// Build a map from ranges; ranges are sorted by base address
    pub fn new(mut ranges: Vec<RegisterRange>, top: u32, alignment_mask: u32) -> Self {
        ranges.sort_by_key(|r| r.base);
        Self {
            ranges,
            top,
            alignment_mask,
        }
    }

    /// Table for the given chipset's generation
    pub fn for_chipset(chipset: &Chipset) -> Self {
        match chipset.generation {
            0..=3 => Self::new(GEN2_3_RANGES.to_vec(), 0x8_0000, 0x3),
            4 | 5 => Self::new(GEN4_5_RANGES.to_vec(), 0x8_0000, 0x3),
            _ => Self::new(GEN6_RANGES.to_vec(), 0x18_0000, 0x3),
        }
    }

    /// All ranges, ordered by base
    pub fn ranges(&self) -> &[RegisterRange] {
        &self.ranges
    }

    /// Find the range that permits `mode` at `offset`
    pub fn lookup(&self, offset: u32, mode: AccessMode) -> Result<&RegisterRange, AccessDenial> {
        if offset & self.alignment_mask != 0 {
            return Err(AccessDenial::Misaligned);
        }
        if offset >= self.top {
            return Err(AccessDenial::BeyondTop);
        }

        // Last range whose base is <= offset
        let idx = self.ranges.partition_point(|r| r.base <= offset);
        let range = idx
            .checked_sub(1)
            .map(|i| &self.ranges[i])
            .filter(|r| r.contains(offset))
            .ok_or(AccessDenial::Unknown)?;

        if range.is_reserved() {
            Err(AccessDenial::Reserved)
        } else if !range.allows(mode) {
            Err(AccessDenial::ModeMismatch)
        } else {
            Ok(range)
        }
    }
}

use flags::{READ, RESERVED, RW};

const GEN2_3_RANGES: &[RegisterRange] = &[
    RegisterRange::new(0x0000_0000, 0x1000, RW),
    RegisterRange::new(0x0000_1000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_2000, 0x1000, RW),
    RegisterRange::new(0x0000_3000, 0x1000, RW),
    RegisterRange::new(0x0000_4000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_5000, 0x1000, RW),
    RegisterRange::new(0x0000_6000, 0x1000, RW),
    RegisterRange::new(0x0000_7000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_8000, 0x8000, RESERVED),
    RegisterRange::new(0x0001_0000, 0x1_0000, RESERVED),
    RegisterRange::new(0x0003_0000, 0x1_0000, RW),
    RegisterRange::new(0x0006_0000, 0x2_0000, RW),
];

const GEN4_5_RANGES: &[RegisterRange] = &[
    RegisterRange::new(0x0000_0000, 0x1000, RW),
    RegisterRange::new(0x0000_1000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_2000, 0x1000, RW),
    RegisterRange::new(0x0000_3000, 0x1000, RW),
    RegisterRange::new(0x0000_4000, 0x1000, RW),
    RegisterRange::new(0x0000_5000, 0x1000, RW),
    RegisterRange::new(0x0000_6000, 0x1000, RW),
    RegisterRange::new(0x0000_7000, 0x1000, RW),
    RegisterRange::new(0x0000_8000, 0x2000, RESERVED),
    RegisterRange::new(0x0000_a000, 0x1000, RW),
    RegisterRange::new(0x0000_b000, 0x5000, RESERVED),
    RegisterRange::new(0x0001_0000, 0x1_0000, RW),
    RegisterRange::new(0x0002_0000, 0x1_0000, RESERVED),
    RegisterRange::new(0x0003_0000, 0x1_0000, RW),
    RegisterRange::new(0x0004_0000, 0x2_0000, RESERVED),
    RegisterRange::new(0x0006_0000, 0x2_0000, RW),
];

const GEN6_RANGES: &[RegisterRange] = &[
    RegisterRange::new(0x0000_0000, 0x1000, RW),
    RegisterRange::new(0x0000_1000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_2000, 0x1000, RW),
    RegisterRange::new(0x0000_3000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_4000, 0x1000, RW),
    RegisterRange::new(0x0000_5000, 0x1000, RW),
    RegisterRange::new(0x0000_6000, 0x1000, RESERVED),
    RegisterRange::new(0x0000_7000, 0x1000, RW),
    RegisterRange::new(0x0000_8000, 0x2000, RESERVED),
    RegisterRange::new(0x0000_a000, 0x1000, RW),
    RegisterRange::new(0x0000_b000, 0x5000, RESERVED),
    RegisterRange::new(0x0001_0000, 0x2000, RW),
    RegisterRange::new(0x0001_2000, 0x1000, RW),
    RegisterRange::new(0x0001_3000, 0xf000, RESERVED),
    RegisterRange::new(0x0002_2000, 0x1000, RW),
    RegisterRange::new(0x0002_3000, 0xd000, RESERVED),
    RegisterRange::new(0x0003_0000, 0x1_0000, RW),
    RegisterRange::new(0x0004_0000, 0x2_0000, RESERVED),
    RegisterRange::new(0x0006_0000, 0x2_0000, RW),
    RegisterRange::new(0x0008_0000, 0x8_0000, RESERVED),
    RegisterRange::new(0x0010_0000, 0x3_0000, RW),
    RegisterRange::new(0x0013_0000, 0x1000, READ),
    RegisterRange::new(0x0013_1000, 0x4_f000, RESERVED),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs;

    fn small_map() -> RegisterMap {
        RegisterMap::new(
            vec![
                RegisterRange::new(0x200, 0x100, flags::READ),
                RegisterRange::new(0x000, 0x100, flags::RW),
                RegisterRange::new(0x100, 0x100, flags::RESERVED),
            ],
            0x400,
            0x3,
        )
    }

    #[test]
    fn test_ranges_are_sorted() {
        let map = small_map();
        let bases: Vec<u32> = map.ranges().iter().map(|r| r.base).collect();
        assert_eq!(bases, vec![0x000, 0x100, 0x200]);
    }

    #[test]
    fn test_lookup_outcomes() {
        let map = small_map();
        assert_eq!(map.lookup(0x04, AccessMode::Write).unwrap().base, 0x000);
        assert_eq!(map.lookup(0x200, AccessMode::Read).unwrap().base, 0x200);
        assert_eq!(map.lookup(0x104, AccessMode::Read), Err(AccessDenial::Reserved));
        assert_eq!(
            map.lookup(0x204, AccessMode::Write),
            Err(AccessDenial::ModeMismatch)
        );
        assert_eq!(map.lookup(0x302, AccessMode::Read), Err(AccessDenial::Misaligned));
        assert_eq!(map.lookup(0x300, AccessMode::Read), Err(AccessDenial::Unknown));
        assert_eq!(map.lookup(0x400, AccessMode::Read), Err(AccessDenial::BeyondTop));
    }

    #[test]
    fn test_generation_tables_cover_sampled_registers() {
        let snb = RegisterMap::for_chipset(&Chipset::with_generation(0x0126, 6));
        for base in [regs::ring::RENDER_BASE, regs::ring::GEN6_BSD_BASE, regs::ring::BLT_BASE] {
            for reg in [regs::ring::TAIL, regs::ring::HEAD, regs::ring::CTL] {
                assert!(snb.lookup(base + reg, AccessMode::Read).is_ok());
            }
        }
        assert!(snb.lookup(regs::FORCEWAKE, AccessMode::Write).is_ok());
        assert!(snb.lookup(regs::FORCEWAKE_ACK, AccessMode::Read).is_ok());
        assert!(snb.lookup(regs::FORCEWAKE_ACK, AccessMode::Write).is_err());

        let ilk = RegisterMap::for_chipset(&Chipset::with_generation(0x0046, 5));
        assert!(ilk.lookup(regs::ring::BSD_BASE + regs::ring::HEAD, AccessMode::Read).is_ok());
        assert!(ilk.lookup(regs::stats::PS_DEPTH_COUNT_QW + 4, AccessMode::Read).is_ok());
    }
}

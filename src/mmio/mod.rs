//! Register access layer
//!
//! All reads and writes of device registers go through [`RegisterAccess`].
//! The raw window is any [`RegisterSpace`]; in production that is an
//! [`MmioMapping`] of the PCI BAR, which is the only place in the crate that
//! touches device memory. In safe mode every access is first validated
//! against the device's [`RegisterMap`].

pub mod mapping;
pub mod range;

use std::fmt;
use std::fs::File;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::regs;

pub use mapping::MmioMapping;
pub use range::{RegisterMap, RegisterRange};

/// Value returned by [`RegisterAccess::read`] when safe mode blocks the read
pub const REGISTER_READ_FAILED: u32 = 0xffff_ffff;

/// Number of acknowledge polls before giving up on register forcewake
const FORCEWAKE_ACK_POLLS: u32 = 50_000;

/// Direction of a register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Register read
    Read,
    /// Register write
    Write,
}

impl AccessMode {
    /// Range flag bit that permits this mode
    pub fn flag(self) -> u32 {
        match self {
            AccessMode::Read => range::flags::READ,
            AccessMode::Write => range::flags::WRITE,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => f.write_str("read"),
            AccessMode::Write => f.write_str("write"),
        }
    }
}

/// A window of 32-bit device registers addressed by byte offset
///
/// Implementations must not cache: every call observes the live value.
pub trait RegisterSpace {
    /// Read the register at `offset`
    fn read32(&self, offset: u32) -> Result<u32>;

    /// Write `value` to the register at `offset`
    fn write32(&mut self, offset: u32, value: u32) -> Result<()>;
}

/// How the GT is being kept awake
#[derive(Debug)]
pub enum Forcewake {
    /// Kernel-managed reference held through debugfs `i915_forcewake_user`
    Kernel(File),
    /// Direct FORCEWAKE register handshake, released on drop
    Register,
}

/// Validated access to a register window
pub struct RegisterAccess<S: RegisterSpace> {
    space: S,
    map: Option<RegisterMap>,
    forcewake: Option<Forcewake>,
}

impl<S: RegisterSpace> RegisterAccess<S> {
    /// Unchecked access: offsets are only bounds-checked by the space
    pub fn new(space: S) -> Self {
        Self {
            space,
            map: None,
            forcewake: None,
        }
    }

    /// Safe mode: every access is validated against `map`
    pub fn with_map(space: S, map: RegisterMap) -> Self {
        Self {
            space,
            map: Some(map),
            forcewake: None,
        }
    }

    /// Returns true when accesses are validated
    pub fn is_safe(&self) -> bool {
        self.map.is_some()
    }

    /// The underlying register space
    pub fn space(&self) -> &S {
        &self.space
    }

    fn check(&self, offset: u32, mode: AccessMode) -> Result<()> {
        match self.map {
            Some(ref map) => map
                .lookup(offset, mode)
                .map(|_| ())
                .map_err(|reason| Error::RegisterAccess {
                    offset,
                    mode,
                    reason,
                }),
            None => Ok(()),
        }
    }

    /// Read a register, failing if safe mode refuses it
    pub fn try_read(&self, offset: u32) -> Result<u32> {
        self.check(offset, AccessMode::Read)?;
        self.space.read32(offset)
    }

    /// Write a register, failing if safe mode refuses it
    pub fn try_write(&mut self, offset: u32, value: u32) -> Result<()> {
        self.check(offset, AccessMode::Write)?;
        self.space.write32(offset, value)
    }

    /// Read a register
    ///
    /// Refused or out-of-window reads are logged and return
    /// [`REGISTER_READ_FAILED`].
    pub fn read(&self, offset: u32) -> u32 {
        match self.try_read(offset) {
            Ok(value) => value,
            Err(e) => {
                warn!("{}", e);
                REGISTER_READ_FAILED
            }
        }
    }

    /// Write a register
    ///
    /// Refused or out-of-window writes are logged and dropped.
    pub fn write(&mut self, offset: u32, value: u32) {
        if let Err(e) = self.try_write(offset, value) {
            warn!("{}", e);
        }
    }

    /// Keep the GT awake through a kernel-held reference
    pub fn hold_kernel_forcewake(&mut self, file: File) {
        self.release_forcewake();
        self.forcewake = Some(Forcewake::Kernel(file));
    }

    /// Keep the GT awake through the FORCEWAKE register handshake
    ///
    /// Returns true once the hardware acknowledged the request.
    pub fn acquire_register_forcewake(&mut self) -> bool {
        self.release_forcewake();
        self.write(regs::FORCEWAKE, 1);
        self.forcewake = Some(Forcewake::Register);

        for _ in 0..FORCEWAKE_ACK_POLLS {
            if let Ok(ack) = self.try_read(regs::FORCEWAKE_ACK) {
                if ack & 1 == 1 {
                    debug!("register forcewake acknowledged");
                    return true;
                }
            }
        }

        warn!("forcewake request was not acknowledged");
        false
    }

    /// Current forcewake hold, if any
    pub fn forcewake(&self) -> Option<&Forcewake> {
        self.forcewake.as_ref()
    }

    fn release_forcewake(&mut self) {
        if let Some(Forcewake::Register) = self.forcewake.take() {
            self.write(regs::FORCEWAKE, 0);
        }
    }
}

impl<S: RegisterSpace> Drop for RegisterAccess<S> {
    fn drop(&mut self) {
        self.release_forcewake();
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable in-memory register space for tests

    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    use super::RegisterSpace;
    use crate::error::Result;

    /// Registers hold fixed values; a per-offset script overrides them
    /// until it is drained.
    #[derive(Debug, Default)]
    pub struct MockRegisters {
        values: RefCell<HashMap<u32, u32>>,
        scripts: RefCell<HashMap<u32, VecDeque<u32>>>,
        reads: RefCell<Vec<u32>>,
    }

    impl MockRegisters {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, offset: u32, value: u32) {
            self.values.borrow_mut().insert(offset, value);
        }

        pub fn get(&self, offset: u32) -> u32 {
            self.values.borrow().get(&offset).copied().unwrap_or(0)
        }

        pub fn script(&self, offset: u32, values: &[u32]) {
            self.scripts
                .borrow_mut()
                .entry(offset)
                .or_default()
                .extend(values.iter().copied());
        }

        /// Offsets read so far, in order
        pub fn reads(&self) -> Vec<u32> {
            self.reads.borrow().clone()
        }
    }

    impl RegisterSpace for MockRegisters {
        fn read32(&self, offset: u32) -> Result<u32> {
            self.reads.borrow_mut().push(offset);
            let scripted = self
                .scripts
                .borrow_mut()
                .get_mut(&offset)
                .and_then(|s| s.pop_front());
            Ok(scripted.unwrap_or_else(|| self.get(offset)))
        }

        fn write32(&mut self, offset: u32, value: u32) -> Result<()> {
            self.set(offset, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockRegisters;
    use super::range::flags;
    use super::*;
    use crate::error::AccessDenial;

    fn safe_access() -> RegisterAccess<MockRegisters> {
        let map = RegisterMap::new(
            vec![
                RegisterRange::new(0x0000, 0x1000, flags::RW),
                RegisterRange::new(0x1000, 0x1000, flags::RESERVED),
                RegisterRange::new(0x2000, 0x1000, flags::READ),
            ],
            0x3000,
            0x3,
        );
        RegisterAccess::with_map(MockRegisters::new(), map)
    }

    #[test]
    fn test_unchecked_pass_through() {
        let mut regs = RegisterAccess::new(MockRegisters::new());
        assert!(!regs.is_safe());
        regs.write(0x1004, 0xdead_beef);
        assert_eq!(regs.read(0x1004), 0xdead_beef);
    }

    #[test]
    fn test_reads_are_not_cached() {
        let regs = RegisterAccess::new(MockRegisters::new());
        regs.space().script(0x10, &[1, 2, 3]);
        assert_eq!(regs.read(0x10), 1);
        assert_eq!(regs.read(0x10), 2);
        assert_eq!(regs.read(0x10), 3);
    }

    #[test]
    fn test_safe_mode_reserved_read_returns_sentinel() {
        let regs = safe_access();
        regs.space().set(0x1000, 0x1234);
        assert_eq!(regs.read(0x1000), REGISTER_READ_FAILED);
        assert!(matches!(
            regs.try_read(0x1000),
            Err(Error::RegisterAccess {
                reason: AccessDenial::Reserved,
                ..
            })
        ));
        // blocked reads never reach the hardware
        assert!(regs.space().reads().is_empty());
    }

    #[test]
    fn test_safe_mode_reserved_write_is_dropped() {
        let mut regs = safe_access();
        regs.space().set(0x0ffc, 0x11);
        regs.space().set(0x2000, 0x22);

        regs.write(0x1000, 0xffff);
        assert_eq!(regs.space().get(0x1000), 0);
        assert_eq!(regs.read(0x0ffc), 0x11);
        assert_eq!(regs.read(0x2000), 0x22);
    }

    #[test]
    fn test_safe_mode_write_to_read_only_range() {
        let mut regs = safe_access();
        regs.space().set(0x2004, 7);
        assert!(matches!(
            regs.try_write(0x2004, 9),
            Err(Error::RegisterAccess {
                reason: AccessDenial::ModeMismatch,
                ..
            })
        ));
        assert_eq!(regs.read(0x2004), 7);
    }

    #[test]
    fn test_safe_mode_unknown_offset() {
        let regs = safe_access();
        assert_eq!(regs.read(0x3000), REGISTER_READ_FAILED);
        assert_eq!(regs.read(0x0002), REGISTER_READ_FAILED);
    }

    #[test]
    fn test_register_forcewake_handshake_and_release() {
        let mut regs = RegisterAccess::new(MockRegisters::new());
        regs.space().script(regs::FORCEWAKE_ACK, &[0, 0, 1]);

        assert!(regs.acquire_register_forcewake());
        assert_eq!(regs.space().get(regs::FORCEWAKE), 1);
        assert!(matches!(regs.forcewake(), Some(Forcewake::Register)));

        regs.release_forcewake();
        assert_eq!(regs.space().get(regs::FORCEWAKE), 0);
        assert!(regs.forcewake().is_none());
    }
}

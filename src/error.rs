//! Error types for intel-gpu-top

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::mmio::AccessMode;

/// Result type alias for intel-gpu-top operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a register access was refused in safe mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// Offset is not aligned to the register width
    Misaligned,
    /// Offset lies beyond the top of the register map
    BeyondTop,
    /// No range in the map covers the offset
    Unknown,
    /// The covering range is reserved
    Reserved,
    /// The covering range does not allow the requested mode
    ModeMismatch,
}

impl std::fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            AccessDenial::Misaligned => "misaligned offset",
            AccessDenial::BeyondTop => "offset beyond register map",
            AccessDenial::Unknown => "no matching register range",
            AccessDenial::Reserved => "reserved range",
            AccessDenial::ModeMismatch => "access mode not permitted",
        };
        f.write_str(reason)
    }
}

/// Errors that can occur while monitoring an Intel GPU
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No Intel GPU was found on this system
    #[error("No Intel GPU found on this system")]
    NoGpuFound,

    /// The specified GPU device was not found
    #[error("GPU device not found: {path}")]
    DeviceNotFound {
        /// The path or PCI slot that was not found
        path: PathBuf,
    },

    /// Permission denied when accessing the register space
    #[error("Permission denied: {message}. Try running as root")]
    PermissionDenied {
        /// Description of the permission error
        message: String,
    },

    /// Mapping the register window failed
    #[error("Failed to map register window {path}: {source}")]
    Mapping {
        /// The file that was being mapped
        path: PathBuf,
        /// The underlying IO error
        source: io::Error,
    },

    /// A raw access fell outside the mapped window
    #[error("Register offset {offset:#x} outside mapped window of {len:#x} bytes")]
    OffsetOutOfBounds {
        /// Byte offset of the access
        offset: u32,
        /// Length of the mapped window
        len: usize,
    },

    /// A safe-mode access was refused by the register map
    #[error("Register {mode} at {offset:#x} blocked for safety: {reason}")]
    RegisterAccess {
        /// Byte offset of the access
        offset: u32,
        /// Requested access mode
        mode: AccessMode,
        /// Why the access was refused
        reason: AccessDenial,
    },

    /// Error parsing sysfs data
    #[error("Failed to parse sysfs data at {path}: {message}")]
    SysfsParse {
        /// The sysfs path that failed to parse
        path: PathBuf,
        /// Description of the parse error
        message: String,
    },

    /// Creating or attaching the shared memory segment failed
    #[error("Shared memory {operation} failed: {source}")]
    SharedMemory {
        /// The failing call (shmget, shmat)
        operation: &'static str,
        /// The underlying OS error
        source: io::Error,
    },

    /// The GPU was disconnected or became unavailable
    #[error("GPU became unavailable during operation")]
    GpuUnavailable,

    /// Generic IO failure (report output, sysfs reads)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Platform not supported
    #[error("This platform is not currently supported")]
    PlatformNotSupported,
}

impl Error {
    /// Returns true if this error is due to insufficient permissions
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Error::PermissionDenied { .. })
    }

    /// Returns true if the error indicates a missing GPU
    pub fn is_gpu_missing(&self) -> bool {
        matches!(
            self,
            Error::NoGpuFound | Error::DeviceNotFound { .. } | Error::GpuUnavailable
        )
    }

    /// Returns true if the sampling loop may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RegisterAccess { .. })
    }

    /// Create a permission denied error from an IO error
    pub(crate) fn permission_denied(source: &io::Error) -> Self {
        Error::PermissionDenied {
            message: source.to_string(),
        }
    }

    /// Create a sysfs parse error
    pub(crate) fn sysfs_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::SysfsParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify an IO error raised while mapping a register window
    pub(crate) fn mapping(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                message: format!("cannot map {}", path.display()),
            },
            io::ErrorKind::NotFound => Error::DeviceNotFound { path },
            _ => Error::Mapping { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_error_classification() {
        let err = Error::mapping(
            "/sys/bus/pci/devices/0000:00:02.0/resource0",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.is_permission_error());

        let err = Error::mapping("/nope", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_gpu_missing());
    }

    #[test]
    fn test_register_access_is_recoverable() {
        let err = Error::RegisterAccess {
            offset: 0x1000,
            mode: AccessMode::Read,
            reason: AccessDenial::Reserved,
        };
        assert!(err.is_recoverable());
        assert!(!Error::GpuUnavailable.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Register read at 0x1000 blocked for safety: reserved range"
        );
    }
}

//! Kernel-managed forcewake through debugfs
//!
//! While `i915_forcewake_user` is held open the i915 driver keeps the GT
//! powered, so register reads return live values instead of zeros.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

/// debugfs mount point for DRM devices
const DEBUGFS_DRI: &str = "/sys/kernel/debug/dri";

/// Path of the forcewake file for DRM minor `minor`
pub fn forcewake_user_path(minor: u32) -> PathBuf {
    Path::new(DEBUGFS_DRI)
        .join(minor.to_string())
        .join("i915_forcewake_user")
}

/// Open the forcewake file; `None` when debugfs or the file is unavailable
pub fn open_forcewake_user(minor: u32) -> Option<File> {
    let path = forcewake_user_path(minor);
    match File::open(&path) {
        Ok(file) => {
            debug!("holding forcewake through {}", path.display());
            Some(file)
        }
        Err(e) => {
            debug!("{} unavailable: {}", path.display(), e);
            None
        }
    }
}

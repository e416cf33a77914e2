//! PCI discovery of the Intel graphics device through sysfs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::GpuInfo;

/// Base path for PCI devices
const PCI_DEVICES_PATH: &str = "/sys/bus/pci/devices";

/// Slot the integrated GPU normally occupies
pub const CANONICAL_SLOT: &str = "0000:00:02.0";

/// Find the Intel graphics device
///
/// Tries the canonical slot first, then walks the bus for any Intel
/// display-class device.
pub fn find_gpu() -> Result<GpuInfo> {
    find_gpu_in(Path::new(PCI_DEVICES_PATH))
}

/// Open the device at a given PCI slot
pub fn open_slot(slot: &str) -> Result<GpuInfo> {
    let path = Path::new(PCI_DEVICES_PATH).join(slot);
    if !path.exists() {
        return Err(Error::DeviceNotFound { path });
    }
    let gpu = read_gpu_info(&path, slot)?;
    if !gpu.is_intel() {
        return Err(Error::NoGpuFound);
    }
    Ok(gpu)
}

fn find_gpu_in(base: &Path) -> Result<GpuInfo> {
    if !base.exists() {
        return Err(Error::NoGpuFound);
    }

    let canonical = base.join(CANONICAL_SLOT);
    if let Ok(gpu) = read_gpu_info(&canonical, CANONICAL_SLOT) {
        if gpu.is_intel() {
            return Ok(gpu);
        }
    }

    let entries = fs::read_dir(base).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            Error::permission_denied(&e)
        } else {
            Error::NoGpuFound
        }
    })?;

    let mut slots: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    slots.sort();

    for slot in slots {
        if let Ok(gpu) = read_gpu_info(&base.join(&slot), &slot) {
            if gpu.is_intel() && gpu.is_display() {
                debug!("found Intel display device at {}", slot);
                return Ok(gpu);
            }
        }
    }

    Err(Error::NoGpuFound)
}

/// Read device identity from a sysfs PCI device directory
fn read_gpu_info(device_path: &Path, slot: &str) -> Result<GpuInfo> {
    let vendor_id = read_hex(&device_path.join("vendor"))? as u16;
    let device_id = read_hex(&device_path.join("device"))? as u16;
    let class = read_hex(&device_path.join("class"))? as u32;

    Ok(GpuInfo {
        slot: slot.to_string(),
        sysfs_path: device_path.to_path_buf(),
        vendor_id,
        device_id,
        class,
        driver: detect_driver(device_path),
    })
}

/// Name of the kernel driver bound to the device
fn detect_driver(device_path: &Path) -> Option<String> {
    let target = fs::read_link(device_path.join("driver")).ok()?;
    target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
}

/// DRM minor number of the card node belonging to this device
pub fn drm_minor(gpu: &GpuInfo) -> Option<u32> {
    let entries = fs::read_dir(gpu.sysfs_path.join("drm")).ok()?;
    entries
        .flatten()
        .filter_map(|e| {
            e.file_name()
                .to_string_lossy()
                .strip_prefix("card")
                .and_then(|n| n.parse().ok())
        })
        .min()
}

fn read_hex(path: &Path) -> Result<u64> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::sysfs_parse(path, format!("failed to read: {}", e)))?;
    parse_hex_or_dec(&text).ok_or_else(|| Error::sysfs_parse(path, "invalid number"))
}

/// Parse a hex (0x...) or decimal number
fn parse_hex_or_dec(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(base: &Path, slot: &str, vendor: &str, device: &str, class: &str) {
        let dir = base.join(slot);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vendor"), vendor).unwrap();
        fs::write(dir.join("device"), device).unwrap();
        fs::write(dir.join("class"), class).unwrap();
    }

    #[test]
    fn test_parse_hex_or_dec() {
        assert_eq!(parse_hex_or_dec("0x8086\n"), Some(0x8086));
        assert_eq!(parse_hex_or_dec("0X10"), Some(16));
        assert_eq!(parse_hex_or_dec("16"), Some(16));
        assert_eq!(parse_hex_or_dec("invalid"), None);
    }

    #[test]
    fn test_canonical_slot_preferred() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), "0000:00:01.0", "0x8086", "0x0166", "0x030000");
        fake_device(tmp.path(), CANONICAL_SLOT, "0x8086", "0x0126", "0x030000");

        let gpu = find_gpu_in(tmp.path()).unwrap();
        assert_eq!(gpu.slot, CANONICAL_SLOT);
        assert_eq!(gpu.device_id, 0x0126);
        assert!(gpu.driver.is_none());
    }

    #[test]
    fn test_bus_walk_skips_non_display_devices() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), "0000:00:00.0", "0x8086", "0x0100", "0x060000");
        fake_device(tmp.path(), "0000:01:00.0", "0x10de", "0x1234", "0x030000");
        fake_device(tmp.path(), "0000:03:00.0", "0x8086", "0x56a0", "0x030000");

        let gpu = find_gpu_in(tmp.path()).unwrap();
        assert_eq!(gpu.slot, "0000:03:00.0");
        assert_eq!(gpu.resource_path(0), tmp.path().join("0000:03:00.0/resource0"));
    }

    #[test]
    fn test_no_intel_device() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), "0000:01:00.0", "0x1002", "0x7340", "0x030000");
        assert!(matches!(find_gpu_in(tmp.path()), Err(Error::NoGpuFound)));
    }

    #[test]
    fn test_drm_minor() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), CANONICAL_SLOT, "0x8086", "0x0126", "0x030000");
        let drm = tmp.path().join(CANONICAL_SLOT).join("drm");
        fs::create_dir_all(drm.join("card1")).unwrap();
        fs::create_dir_all(drm.join("renderD129")).unwrap();

        let gpu = find_gpu_in(tmp.path()).unwrap();
        assert_eq!(drm_minor(&gpu), Some(1));
    }
}

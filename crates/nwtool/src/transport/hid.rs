//! hidapi-backed vendor channel.

use crate::error::CliError;
use hid_nextwindow_protocol::ids::REPORT_LEN;
use hid_nextwindow_protocol::{NEXTWINDOW_VENDOR_ID, VENDOR_INTERFACE, product_ids};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use nwtool_hid_common::{
    DeviceMatcher, HidCommonError, HidCommonResult, HidDeviceInfo, ReportDevice, UsbLocation,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An open NextWindow vendor interface.
pub struct HidapiDevice {
    device: HidDevice,
    info: HidDeviceInfo,
}

impl ReportDevice for HidapiDevice {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
        // hidapi expects the report ID first; the vendor channel has none.
        let mut buf = Vec::with_capacity(data.len() + 1);
        buf.push(0);
        buf.extend_from_slice(data);
        self.device
            .write(&buf)
            .map_err(|e| HidCommonError::WriteError(e.to_string()))
    }

    fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>> {
        let mut buf = [0u8; REPORT_LEN];
        let timeout = i32::try_from(timeout_ms).unwrap_or(i32::MAX);
        match self.device.read_timeout(&mut buf, timeout) {
            Ok(0) => Err(HidCommonError::Timeout { timeout_ms }),
            Ok(n) => Ok(buf.get(..n).unwrap_or_default().to_vec()),
            Err(e) => Err(HidCommonError::ReadError(e.to_string())),
        }
    }

    fn get_device_info(&self) -> &HidDeviceInfo {
        &self.info
    }
}

/// Open the first NextWindow vendor interface accepted by `matcher`.
///
/// Product IDs are tried in probe order.
pub fn open(matcher: &dyn DeviceMatcher) -> Result<HidapiDevice, CliError> {
    let api = HidApi::new().map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?;
    let mut last_error = None;

    for product_id in product_ids::PROBE_ORDER {
        let candidates = api.device_list().filter(|d| {
            d.vendor_id() == NEXTWINDOW_VENDOR_ID
                && d.product_id() == product_id
                && d.interface_number() == VENDOR_INTERFACE
        });

        for candidate in candidates {
            let info = describe(candidate);
            if !matcher.is_target(&info) {
                debug!("Skipping {} (filtered)", info.display_name());
                continue;
            }

            match candidate.open_device(&api) {
                Ok(device) => {
                    info!("Opened {} at {}", info.display_name(), info.path);
                    return Ok(HidapiDevice { device, info });
                }
                Err(e) => {
                    debug!("Failed to open {}: {e}", info.path);
                    last_error = Some(classify_open_error(&info.path, &e.to_string()));
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        CliError::DeviceNotFound(format!(
            "no device with VID 0x{NEXTWINDOW_VENDOR_ID:04X} on interface {VENDOR_INTERFACE}"
        ))
    }))
}

fn describe(device: &DeviceInfo) -> HidDeviceInfo {
    let path = device.path().to_string_lossy().into_owned();
    let location = UsbLocation::from_hid_path(&path).or_else(|| sysfs_location(&path));

    let mut info = HidDeviceInfo::new(device.vendor_id(), device.product_id(), path)
        .with_interface(device.interface_number());
    if let Some(location) = location {
        info = info.with_location(location);
    }
    if let Some(serial) = device.serial_number() {
        info = info.with_serial(serial);
    }
    if let Some(manufacturer) = device.manufacturer_string() {
        info = info.with_manufacturer(manufacturer);
    }
    if let Some(product) = device.product_string() {
        info = info.with_product_name(product);
    }
    info
}

/// Resolve bus and device number of a `/dev/hidrawN` node through sysfs.
fn sysfs_location(path: &str) -> Option<UsbLocation> {
    let name = Path::new(path).file_name()?.to_str()?;
    if !name.starts_with("hidraw") {
        return None;
    }
    let device = std::fs::canonicalize(format!("/sys/class/hidraw/{name}/device")).ok()?;
    usb_ancestor_location(device)
}

fn usb_ancestor_location(mut dir: PathBuf) -> Option<UsbLocation> {
    loop {
        let bus = std::fs::read_to_string(dir.join("busnum"));
        let address = std::fs::read_to_string(dir.join("devnum"));
        if let (Ok(bus), Ok(address)) = (bus, address) {
            return Some(UsbLocation::new(
                bus.trim().parse().ok()?,
                address.trim().parse().ok()?,
            ));
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn classify_open_error(path: &str, message: &str) -> CliError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission denied") || lower.contains("access denied") {
        CliError::PermissionDenied(path.to_string())
    } else {
        CliError::Io(std::io::Error::other(format!("{path}: {message}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_recognised() {
        assert!(matches!(
            classify_open_error("/dev/hidraw3", "Failed to open a device with path '/dev/hidraw3': Permission denied"),
            CliError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_open_error("0001:0004:01", "LIBUSB_ERROR_IO"),
            CliError::Io(_)
        ));
    }

    #[test]
    fn non_hidraw_paths_have_no_sysfs_location() {
        assert_eq!(sysfs_location("0001:0004:01"), None);
        assert_eq!(sysfs_location("IOService:/AppleACPI"), None);
    }

    #[test]
    fn sysfs_walk_finds_usb_device_directory() -> Result<(), Box<dyn std::error::Error>> {
        let root = std::env::temp_dir().join(format!("nwtool-sysfs-{}", std::process::id()));
        let usb = root.join("usb1").join("1-2");
        let hid = usb.join("1-2:1.1").join("0003:1926:0001.0004");
        std::fs::create_dir_all(&hid)?;
        std::fs::write(usb.join("busnum"), "1\n")?;
        std::fs::write(usb.join("devnum"), "4\n")?;

        let location = usb_ancestor_location(hid);
        std::fs::remove_dir_all(&root)?;
        assert_eq!(location, Some(UsbLocation::new(1, 4)));
        Ok(())
    }
}

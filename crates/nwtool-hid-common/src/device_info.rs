//! Device information and matching for HID devices

use serde::{Deserialize, Serialize};
use std::fmt;

/// USB topology position of a device: bus number and device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbLocation {
    pub bus: u16,
    pub address: u16,
}

impl UsbLocation {
    pub fn new(bus: u16, address: u16) -> Self {
        Self { bus, address }
    }

    /// Parse the `bbbb:dddd:ii` path form produced by the libusb hidapi backend.
    ///
    /// All three components are hexadecimal. Paths in any other form
    /// (e.g. `/dev/hidraw3`) carry no topology and yield `None`.
    pub fn from_hid_path(path: &str) -> Option<Self> {
        let mut parts = path.split(':');
        let bus = u16::from_str_radix(parts.next()?, 16).ok()?;
        let address = u16::from_str_radix(parts.next()?, 16).ok()?;
        let interface = parts.next()?;
        if parts.next().is_some() || u8::from_str_radix(interface, 16).is_err() {
            return None;
        }
        Some(Self { bus, address })
    }
}

impl fmt::Display for UsbLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}:{:03}", self.bus, self.address)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface_number: i32,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub location: Option<UsbLocation>,
    pub path: String,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: String) -> Self {
        let location = UsbLocation::from_hid_path(&path);
        Self {
            vendor_id,
            product_id,
            interface_number: -1,
            serial_number: None,
            manufacturer: None,
            product_name: None,
            location,
            path,
        }
    }

    pub fn with_interface(mut self, interface_number: i32) -> Self {
        self.interface_number = interface_number;
        self
    }

    pub fn with_location(mut self, location: UsbLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    pub fn display_name(&self) -> String {
        self.product_name
            .clone()
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| format!("{:04x}:{:04x}", self.vendor_id, self.product_id))
    }
}

impl Default for HidDeviceInfo {
    fn default() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            interface_number: -1,
            serial_number: None,
            manufacturer: None,
            product_name: None,
            location: None,
            path: String::new(),
        }
    }
}

/// Predicate deciding whether an enumerated device is the one to open.
///
/// Enumeration code hands every candidate that already passed the vendor,
/// product and interface checks to the matcher; protocol code never sees it.
pub trait DeviceMatcher {
    fn is_target(&self, info: &HidDeviceInfo) -> bool;
}

impl<F> DeviceMatcher for F
where
    F: Fn(&HidDeviceInfo) -> bool,
{
    fn is_target(&self, info: &HidDeviceInfo) -> bool {
        self(info)
    }
}

/// Accepts every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyDevice;

impl DeviceMatcher for AnyDevice {
    fn is_target(&self, _info: &HidDeviceInfo) -> bool {
        true
    }
}

/// Restricts matching to one USB bus and, optionally, one device address on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFilter {
    pub bus: u16,
    pub address: Option<u16>,
}

impl BusFilter {
    pub fn bus(bus: u16) -> Self {
        Self { bus, address: None }
    }

    pub fn with_address(mut self, address: u16) -> Self {
        self.address = Some(address);
        self
    }
}

impl DeviceMatcher for BusFilter {
    fn is_target(&self, info: &HidDeviceInfo) -> bool {
        let Some(location) = info.location else {
            tracing::debug!(
                "Device path '{}' carries no bus topology; rejecting for bus filter {}",
                info.path,
                self.bus
            );
            return false;
        };
        location.bus == self.bus && self.address.is_none_or(|address| address == location.address)
    }
}

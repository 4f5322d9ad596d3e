//! NextWindow vendor ID, product IDs and vendor channel constants.
//!
//! Both known product IDs expose the same vendor-defined field protocol on
//! interface 1. Product `0x0001` is tried first, then `0x0003`.

#![deny(static_mut_refs)]

/// NextWindow USB Vendor ID.
pub const NEXTWINDOW_VENDOR_ID: u16 = 0x1926;

/// Known NextWindow product IDs.
pub mod product_ids {
    pub const TOUCHSCREEN: u16 = 0x0001;
    pub const TOUCHSCREEN_ALT: u16 = 0x0003;

    /// Probe order used when opening a device.
    pub const PROBE_ORDER: [u16; 2] = [TOUCHSCREEN, TOUCHSCREEN_ALT];
}

/// Interface number carrying the vendor report channel.
pub const VENDOR_INTERFACE: i32 = 1;

/// Size of every vendor report, both directions.
pub const REPORT_LEN: usize = 64;

/// Whether `product_id` is one of the known NextWindow touchscreens.
pub fn is_nextwindow_product(product_id: u16) -> bool {
    product_ids::PROBE_ORDER.contains(&product_id)
}

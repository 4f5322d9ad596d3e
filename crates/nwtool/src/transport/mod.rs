//! Device transports.

pub mod hid;
#[cfg(target_os = "linux")]
pub mod serial;

//! Common transport utilities for the NextWindow touchscreen tools
//!
//! This crate provides the narrow interfaces the protocol layer talks through
//! (report devices, device matching) together with big-endian report parsing
//! helpers and in-memory test doubles.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod device_info;
pub mod hid_traits;
pub mod report_parser;

pub use device_info::*;
pub use hid_traits::*;
pub use report_parser::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidCommonError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Read timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u32 },

    #[error("Invalid report format: {0}")]
    InvalidReport(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HidCommonError {
    /// Whether the error only means "nothing arrived in time".
    ///
    /// Poll loops treat this as a consumed attempt rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, HidCommonError::Timeout { .. })
    }
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;

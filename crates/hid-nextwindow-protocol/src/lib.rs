//! NextWindow touchscreen protocol.
//!
//! Two transports share this crate:
//!
//! - **Serial**: the controller streams 15-byte frames (9-byte payload plus
//!   `<END>\r`) carrying touches, device info and calibration status.
//!   [`SerialFramer`] extracts frames, [`SerialSession`] drives one line.
//! - **USB**: 64-byte vendor reports on interface 1 read and write
//!   configuration fields. [`UsbCommandChannel`] implements the
//!   request/poll exchange on top of any [`nwtool_hid_common::ReportDevice`].
//!
//! Nothing here opens devices; transports are injected.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod channel;
pub mod dispatch;
pub mod field;
pub mod framer;
pub mod ids;
pub mod report;
pub mod serial;
pub mod session;
pub mod types;

pub use channel::{ChannelConfig, FieldCache, FieldReading, UsbCommandChannel};
pub use dispatch::{Diagnostic, EventDispatcher, NullPointer, PointerEmitter, Severity};
pub use field::{Field, FieldUnit, FieldWidth, GotMask};
pub use framer::{FRAMER_CAPACITY, FramerOutput, SerialFramer};
pub use ids::{NEXTWINDOW_VENDOR_ID, VENDOR_INTERFACE, is_nextwindow_product, product_ids};
pub use report::{Report, Response};
pub use serial::{RawPacket, SerialEvent, TouchEvent};
pub use session::{SerialDeviceStatus, SerialSession};
pub use types::{AXIS_MAX, FirmwareVersion, PointerUpdate, TouchKey, TouchRegion};

use nwtool_hid_common::HidCommonError;
use thiserror::Error;

/// Errors raised by the protocol layer.
#[derive(Debug, Error)]
pub enum NextWindowError {
    #[error("transport error: {0}")]
    Transport(#[from] HidCommonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no response for {field} after {attempts} attempts")]
    AcquisitionTimeout { field: Field, attempts: u8 },

    #[error("{0} is read-only")]
    ReadOnlyField(Field),

    #[error("value {value} out of range for {field} (max {max})")]
    ValueOutOfRange { field: Field, value: u32, max: u32 },

    #[error("unknown field: {0}")]
    UnknownField(String),
}

impl NextWindowError {
    pub fn is_acquisition_timeout(&self) -> bool {
        matches!(self, Self::AcquisitionTimeout { .. })
    }
}

pub type NextWindowResult<T> = Result<T, NextWindowError>;

//! USB vendor report encoding and response parsing.
//!
//! Requests and responses share one 64-byte layout:
//!
//! ```text
//! b0    group tag ('C' field protocol, 'T' transient commands)
//! b1    payload length (selector plus value bytes)
//! b2    selector
//! b3..  big-endian value, zero padded
//! ```

#![deny(static_mut_refs)]

use crate::field::{Field, FieldWidth, selectors};
use crate::ids::REPORT_LEN;
use nwtool_hid_common::{ReportBuilder, ReportParser};
use tracing::trace;

/// A full vendor report.
pub type Report = [u8; REPORT_LEN];

/// Group tags (report byte 0).
pub mod groups {
    /// Field read, write and response packets.
    pub const FIELD: u8 = b'C';
    /// Transient commands that expect no response.
    pub const TRANSIENT: u8 = b'T';
}

/// Transient command codes carried in the selector byte of a `'T'` report.
pub mod transient {
    pub const HARD_RESET: u8 = b'R';
    pub const FACTORY_DEFAULTS: u8 = b'L';
}

fn request(group: u8, selector: u8, value: &[u8]) -> Report {
    let mut builder = ReportBuilder::<REPORT_LEN>::new();
    // Length counts the selector plus value bytes; at most 5.
    builder.write_u8(group);
    builder.write_u8((1 + value.len()) as u8);
    builder.write_u8(selector);
    builder.write_bytes(value);
    builder.into_inner()
}

/// Ask the device to report `field`.
pub fn read_request(field: Field) -> Report {
    request(groups::FIELD, field.selector(), &[])
}

/// Write `raw` to `field`, using the field's wire width.
///
/// Bits above the field width are dropped; callers validate the range first.
pub fn write_request(field: Field, raw: u32) -> Report {
    let bytes = raw.to_be_bytes();
    let skip = bytes.len().saturating_sub(field.width().bytes());
    let value = bytes.get(skip..);
    request(groups::FIELD, field.selector(), value.unwrap_or_default())
}

/// Enter or leave calibration mode.
pub fn calibrate_request(enable: bool) -> Report {
    request(groups::FIELD, selectors::CALIBRATION_MODE, &[u8::from(enable)])
}

pub fn hard_reset_request() -> Report {
    request(groups::TRANSIENT, transient::HARD_RESET, &[])
}

pub fn factory_defaults_request() -> Report {
    request(groups::TRANSIENT, transient::FACTORY_DEFAULTS, &[])
}

/// A parsed inbound report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// A `'C'` packet carrying a known field.
    Field { field: Field, raw: u32 },
    /// Acknowledgement of a calibration mode change.
    CalibrationEcho { raw: u8 },
    /// A `'C'` packet with a selector outside the field table.
    UnknownSelector { selector: u8 },
    /// A packet whose group tag is not `'C'`.
    UnknownGroup { tag: u8 },
    /// Too short to carry a selector.
    Truncated { len: usize },
}

impl Response {
    /// Parse an inbound report.
    ///
    /// Short reports are treated as zero padded, matching what the device
    /// sends for narrow fields.
    pub fn parse(data: &[u8]) -> Self {
        let mut parser = ReportParser::new(data);
        let (Ok(tag), Ok(_len), Ok(selector)) =
            (parser.read_u8(), parser.read_u8(), parser.read_u8())
        else {
            return Self::Truncated { len: data.len() };
        };

        if tag != groups::FIELD {
            return Self::UnknownGroup { tag };
        }

        let mut value = [0u8; 4];
        for (dst, src) in value.iter_mut().zip(data.iter().skip(3)) {
            *dst = *src;
        }
        let [b3, b4, b5, b6] = value;

        if selector == selectors::CALIBRATION_MODE {
            return Self::CalibrationEcho { raw: b3 };
        }

        let Some(field) = Field::from_selector(selector) else {
            return Self::UnknownSelector { selector };
        };

        let raw = match field.width() {
            FieldWidth::U8 => u32::from(b3),
            FieldWidth::U16 => u32::from(u16::from_be_bytes([b3, b4])),
            FieldWidth::U32 => u32::from_be_bytes([b3, b4, b5, b6]),
        };
        trace!("Parsed {field} = {raw:#x}");
        Self::Field { field, raw }
    }

    pub fn field(&self) -> Option<(Field, u32)> {
        match *self {
            Self::Field { field, raw } => Some((field, raw)),
            _ => None,
        }
    }
}

//! Serial wire format: frame layout, packet types and outbound commands.
//!
//! Every frame is a 9-byte payload followed by the literal footer `<END>\r`:
//!
//! ```text
//! b0..4   X coordinate, big-endian IEEE-754 f32
//! b4..8   Y coordinate, big-endian IEEE-754 f32
//! b8      packet type
//! b9..15  footer "<END>\r"
//! ```
//!
//! Device-info packets reuse the coordinate words as raw integers.

#![deny(static_mut_refs)]

use crate::types::{FirmwareVersion, PointerUpdate, TouchKey, TouchRegion};
use serde::Serialize;

/// Frame delimiter.
pub const FOOTER: &[u8; 6] = b"<END>\r";
/// Payload bytes preceding the footer.
pub const PAYLOAD_LEN: usize = 9;
/// Full frame length on the wire.
pub const FRAME_LEN: usize = PAYLOAD_LEN + FOOTER.len();
/// Line speed of the serial controller.
pub const BAUD_RATE: u32 = 115_200;

/// Outbound 5-byte ASCII commands.
pub mod commands {
    /// Ask the controller to report its device info.
    pub const REQUEST_STATUS: &[u8; 5] = b"nwgs\r";
    pub const CALIBRATION_ON: &[u8; 5] = b"nwk1\r";
    pub const CALIBRATION_OFF: &[u8; 5] = b"nwk0\r";

    pub fn calibration(enable: bool) -> &'static [u8; 5] {
        if enable {
            CALIBRATION_ON
        } else {
            CALIBRATION_OFF
        }
    }
}

/// Packet type codes (payload byte 8).
pub mod packet_types {
    pub const CABLE_CONNECTED: u8 = 0x75;
    pub const DEVICE_INFO: u8 = 0x73;
    pub const CALIBRATION_STATUS: u8 = 0x6B;
    /// First of three inside-area touch codes (none, left, right).
    pub const TOUCH_INSIDE: u8 = 0x00;
    /// First of three outside-area touch codes (none, left, right).
    pub const TOUCH_OUTSIDE: u8 = 0x0A;
}

/// Undecoded payload: both coordinate words as raw bits plus the type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawPacket {
    pub x_bits: u32,
    pub y_bits: u32,
    pub type_code: u8,
}

impl RawPacket {
    pub fn from_payload(payload: &[u8; PAYLOAD_LEN]) -> Self {
        let [x0, x1, x2, x3, y0, y1, y2, y3, type_code] = *payload;
        Self {
            x_bits: u32::from_be_bytes([x0, x1, x2, x3]),
            y_bits: u32::from_be_bytes([y0, y1, y2, y3]),
            type_code,
        }
    }

    pub fn from_coordinates(x: f32, y: f32, type_code: u8) -> Self {
        Self {
            x_bits: x.to_bits(),
            y_bits: y.to_bits(),
            type_code,
        }
    }

    pub fn x(&self) -> f32 {
        f32::from_bits(self.x_bits)
    }

    pub fn y(&self) -> f32 {
        f32::from_bits(self.y_bits)
    }

    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        let (x, rest) = payload.split_at_mut(4);
        let (y, type_code) = rest.split_at_mut(4);
        x.copy_from_slice(&self.x_bits.to_be_bytes());
        y.copy_from_slice(&self.y_bits.to_be_bytes());
        type_code.fill(self.type_code);
        payload
    }

    /// Payload followed by the footer, as the controller sends it.
    pub fn to_frame(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        let (payload, footer) = frame.split_at_mut(PAYLOAD_LEN);
        payload.copy_from_slice(&self.to_payload());
        footer.copy_from_slice(FOOTER);
        frame
    }
}

/// A touch reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TouchEvent {
    pub x: f32,
    pub y: f32,
    pub region: TouchRegion,
    pub key: TouchKey,
}

impl TouchEvent {
    pub fn pointer_update(&self) -> PointerUpdate {
        PointerUpdate::from_coordinates(self.x, self.y, self.key)
    }
}

/// Decoded serial packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SerialEvent {
    /// The USB cable is attached; the serial path is inactive until it is removed.
    CableConnected,
    DeviceInfo {
        serial_number: u32,
        version: FirmwareVersion,
        /// Low 16 bits of the version word, meaning unknown.
        extra: u16,
    },
    CalibrationStatus { status: f32 },
    Touch(TouchEvent),
    Unknown { type_code: u8, x_bits: u32, y_bits: u32 },
}

impl SerialEvent {
    pub fn from_packet(packet: &RawPacket) -> Self {
        use packet_types::*;

        match packet.type_code {
            CABLE_CONNECTED => Self::CableConnected,
            DEVICE_INFO => Self::DeviceInfo {
                serial_number: packet.x_bits,
                version: FirmwareVersion::from_info_word(packet.y_bits),
                extra: (packet.y_bits & 0xFFFF) as u16,
            },
            CALIBRATION_STATUS => Self::CalibrationStatus {
                status: packet.y(),
            },
            code => match touch_kind(code) {
                Some((region, key)) => Self::Touch(TouchEvent {
                    x: packet.x(),
                    y: packet.y(),
                    region,
                    key,
                }),
                None => Self::Unknown {
                    type_code: code,
                    x_bits: packet.x_bits,
                    y_bits: packet.y_bits,
                },
            },
        }
    }
}

fn touch_kind(code: u8) -> Option<(TouchRegion, TouchKey)> {
    let (region, key_code) = if code >= packet_types::TOUCH_OUTSIDE {
        (TouchRegion::Outside, code - packet_types::TOUCH_OUTSIDE)
    } else {
        (TouchRegion::Inside, code - packet_types::TOUCH_INSIDE)
    };
    TouchKey::from_code(key_code).map(|key| (region, key))
}

//! Value types shared by the serial and USB protocol paths.

#![deny(static_mut_refs)]

use serde::Serialize;
use std::fmt;

/// Upper bound of both absolute pointer axes.
pub const AXIS_MAX: i32 = 32767;

/// Controller firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Decode the USB firmware field: major in the high byte, minor in the low byte.
    pub fn from_field(raw: u32) -> Self {
        let [.., major, minor] = raw.to_be_bytes();
        Self { major, minor }
    }

    /// Decode the serial device-info Y word: major in the top byte, minor in the next.
    pub fn from_info_word(word: u32) -> Self {
        let [major, minor, ..] = word.to_be_bytes();
        Self { major, minor }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Button carried by a touch packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchKey {
    None = 0,
    Left = 1,
    Right = 2,
}

impl TouchKey {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Whether a touch landed on the display's active area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchRegion {
    Inside,
    Outside,
}

impl TouchRegion {
    pub fn label(self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }
}

/// One absolute pointer update handed to a [`crate::PointerEmitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PointerUpdate {
    pub x: i32,
    pub y: i32,
    pub left: bool,
    pub right: bool,
}

impl PointerUpdate {
    /// Round float coordinates to the nearest integer, clamped to `[0, AXIS_MAX]`.
    ///
    /// NaN maps to 0.
    pub fn from_coordinates(x: f32, y: f32, key: TouchKey) -> Self {
        Self {
            x: axis_value(x),
            y: axis_value(y),
            left: key == TouchKey::Left,
            right: key == TouchKey::Right,
        }
    }
}

// `as` saturates on overflow and maps NaN to 0.
fn axis_value(coordinate: f32) -> i32 {
    (coordinate.round() as i32).clamp(0, AXIS_MAX)
}

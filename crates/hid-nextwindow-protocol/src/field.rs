//! Configuration fields of the USB vendor channel.
//!
//! Each field is addressed by a one-byte selector and carries an 8, 16 or
//! 32-bit big-endian value. Time fields are stored in units of 10 ms.

#![deny(static_mut_refs)]

use crate::{NextWindowError, NextWindowResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Selector codes (byte 2 of a `'C'` report).
pub mod selectors {
    pub const MODEL: u8 = 0x10;
    pub const FIRMWARE_VERSION: u8 = 0x11;
    pub const SERIAL_NUMBER: u8 = 0x12;
    pub const HW_CAPS: u8 = 0x20;
    /// Calibration mode toggle; echoed back but never cached.
    pub const CALIBRATION_MODE: u8 = 0x21;
    pub const RIGHTCLICK_DELAY: u8 = 0x30;
    pub const DOUBLECLICK_TIME: u8 = 0x31;
    pub const REPORT_MODE: u8 = 0x32;
    pub const DRAG_THRESHOLD: u8 = 0x33;
    pub const BUZZER_TIME: u8 = 0x34;
    pub const BUZZER_TONE: u8 = 0x35;
    pub const CALIBRATION_KEY: u8 = 0x40;
    pub const CALIBRATION_PRESSES: u8 = 0x41;
}

/// Wire width of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
}

impl FieldWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub fn max_value(self) -> u32 {
        match self {
            Self::U8 => u32::from(u8::MAX),
            Self::U16 => u32::from(u16::MAX),
            Self::U32 => u32::MAX,
        }
    }
}

/// Unit of the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldUnit {
    Raw,
    /// One raw step is 10 ms.
    TenMillis,
}

impl FieldUnit {
    /// User-facing value (ms for time fields) to raw device units, truncating.
    pub fn to_raw(self, value: u32) -> u32 {
        match self {
            Self::Raw => value,
            Self::TenMillis => value / 10,
        }
    }

    /// Raw device units to the user-facing value.
    pub fn from_raw(self, raw: u32) -> u32 {
        match self {
            Self::Raw => raw,
            Self::TenMillis => raw.saturating_mul(10),
        }
    }
}

/// A named device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Model,
    FirmwareVersion,
    SerialNumber,
    HwCaps,
    RightclickDelay,
    DoubleclickTime,
    ReportMode,
    DragThreshold,
    BuzzerTime,
    BuzzerTone,
    CalibrationKey,
    CalibrationPresses,
}

impl Field {
    pub const COUNT: usize = 12;

    /// Every field, in the order device info is reported.
    pub const ALL: [Field; Field::COUNT] = [
        Field::FirmwareVersion,
        Field::SerialNumber,
        Field::Model,
        Field::HwCaps,
        Field::RightclickDelay,
        Field::DoubleclickTime,
        Field::ReportMode,
        Field::DragThreshold,
        Field::BuzzerTime,
        Field::BuzzerTone,
        Field::CalibrationKey,
        Field::CalibrationPresses,
    ];

    pub fn selector(self) -> u8 {
        match self {
            Self::Model => selectors::MODEL,
            Self::FirmwareVersion => selectors::FIRMWARE_VERSION,
            Self::SerialNumber => selectors::SERIAL_NUMBER,
            Self::HwCaps => selectors::HW_CAPS,
            Self::RightclickDelay => selectors::RIGHTCLICK_DELAY,
            Self::DoubleclickTime => selectors::DOUBLECLICK_TIME,
            Self::ReportMode => selectors::REPORT_MODE,
            Self::DragThreshold => selectors::DRAG_THRESHOLD,
            Self::BuzzerTime => selectors::BUZZER_TIME,
            Self::BuzzerTone => selectors::BUZZER_TONE,
            Self::CalibrationKey => selectors::CALIBRATION_KEY,
            Self::CalibrationPresses => selectors::CALIBRATION_PRESSES,
        }
    }

    pub fn from_selector(selector: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.selector() == selector)
    }

    pub fn width(self) -> FieldWidth {
        match self {
            Self::Model | Self::FirmwareVersion | Self::DragThreshold => FieldWidth::U16,
            Self::SerialNumber => FieldWidth::U32,
            _ => FieldWidth::U8,
        }
    }

    pub fn unit(self) -> FieldUnit {
        match self {
            Self::RightclickDelay | Self::DoubleclickTime | Self::BuzzerTime => {
                FieldUnit::TenMillis
            }
            _ => FieldUnit::Raw,
        }
    }

    /// Identity and capability fields cannot be written.
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            Self::Model | Self::FirmwareVersion | Self::SerialNumber | Self::HwCaps
        )
    }

    /// Stable position used for the got-mask bit and cache slot.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::FirmwareVersion => "firmware-version",
            Self::SerialNumber => "serial-number",
            Self::HwCaps => "hw-caps",
            Self::RightclickDelay => "rightclick-delay",
            Self::DoubleclickTime => "doubleclick-time",
            Self::ReportMode => "report-mode",
            Self::DragThreshold => "drag-threshold",
            Self::BuzzerTime => "buzzer-time",
            Self::BuzzerTone => "buzzer-tone",
            Self::CalibrationKey => "calibration-key",
            Self::CalibrationPresses => "calibration-presses",
        }
    }

    /// Label used in the info listing.
    pub fn label(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::FirmwareVersion => "Version",
            Self::SerialNumber => "Serial",
            Self::HwCaps => "HW capabilities",
            Self::RightclickDelay => "Rightclick delay",
            Self::DoubleclickTime => "Doubleclick time",
            Self::ReportMode => "Report mode",
            Self::DragThreshold => "Drag threshold",
            Self::BuzzerTime => "Buzzer time",
            Self::BuzzerTone => "Buzzer tone",
            Self::CalibrationKey => "Calibration key",
            Self::CalibrationPresses => "Calibration presses",
        }
    }

    /// Lower-case phrase used in "Error reading ..." messages.
    pub fn description(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::FirmwareVersion => "firmware version",
            Self::SerialNumber => "serial number",
            Self::HwCaps => "HW capabilities",
            Self::RightclickDelay => "rightclick delay",
            Self::DoubleclickTime => "doubleclick time",
            Self::ReportMode => "report mode",
            Self::DragThreshold => "drag threshold",
            Self::BuzzerTime => "buzzer time",
            Self::BuzzerTone => "buzzer tone",
            Self::CalibrationKey => "calibration key",
            Self::CalibrationPresses => "calibration presses",
        }
    }

    /// Convert a user-facing value to the raw value written to the device.
    ///
    /// # Errors
    ///
    /// `ReadOnlyField` for identity fields, `ValueOutOfRange` when the
    /// converted value does not fit the field width.
    pub fn encode_user_value(self, value: u32) -> NextWindowResult<u32> {
        if !self.is_writable() {
            return Err(NextWindowError::ReadOnlyField(self));
        }
        let raw = self.unit().to_raw(value);
        let max_raw = self.width().max_value();
        if raw > max_raw {
            return Err(NextWindowError::ValueOutOfRange {
                field: self,
                value,
                max: self.unit().from_raw(max_raw),
            });
        }
        Ok(raw)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = NextWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let field = match normalized.as_str() {
            "firmware" | "version" => Some(Self::FirmwareVersion),
            "serial" => Some(Self::SerialNumber),
            "hwcaps" | "capabilities" => Some(Self::HwCaps),
            other => Self::ALL.into_iter().find(|f| f.name() == other),
        };
        field.ok_or_else(|| NextWindowError::UnknownField(s.to_string()))
    }
}

/// One bit per field, set when a response for that field has been observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GotMask(u16);

impl GotMask {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= Self::bit(field);
    }

    pub fn remove(&mut self, field: Field) {
        self.0 &= !Self::bit(field);
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & Self::bit(field) != 0
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn bit(field: Field) -> u16 {
        1 << field.index()
    }
}

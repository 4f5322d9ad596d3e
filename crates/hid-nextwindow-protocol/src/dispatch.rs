//! Routing of decoded events to text diagnostics and the pointer device.

#![deny(static_mut_refs)]

use crate::field::{Field, FieldUnit};
use crate::framer::FramerOutput;
use crate::report::Response;
use crate::serial::{SerialEvent, TouchEvent};
use crate::types::{FirmwareVersion, PointerUpdate};
use serde::Serialize;
use std::fmt;
use std::io;
use tracing::warn;

/// Sink for absolute pointer updates.
///
/// `move_to` may buffer; `sync` marks the end of one update.
pub trait PointerEmitter {
    fn move_to(&mut self, update: PointerUpdate) -> io::Result<()>;

    fn sync(&mut self) -> io::Result<()>;
}

impl<P: PointerEmitter + ?Sized> PointerEmitter for &mut P {
    fn move_to(&mut self, update: PointerUpdate) -> io::Result<()> {
        (**self).move_to(update)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

impl<P: PointerEmitter + ?Sized> PointerEmitter for Box<P> {
    fn move_to(&mut self, update: PointerUpdate) -> io::Result<()> {
        (**self).move_to(update)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPointer;

impl PointerEmitter for NullPointer {
    fn move_to(&mut self, _update: PointerUpdate) -> io::Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub mod mock {
    use super::*;

    /// One call observed by [`RecordingPointer`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PointerCall {
        Move(PointerUpdate),
        Sync,
    }

    /// Records pointer calls; can be told to fail.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingPointer {
        pub calls: Vec<PointerCall>,
        pub fail_moves: bool,
    }

    impl RecordingPointer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                calls: Vec::new(),
                fail_moves: true,
            }
        }

        pub fn moves(&self) -> Vec<PointerUpdate> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    PointerCall::Move(update) => Some(*update),
                    PointerCall::Sync => None,
                })
                .collect()
        }
    }

    impl PointerEmitter for RecordingPointer {
        fn move_to(&mut self, update: PointerUpdate) -> io::Result<()> {
            if self.fail_moves {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pointer gone"));
            }
            self.calls.push(PointerCall::Move(update));
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            self.calls.push(PointerCall::Sync);
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// One line of human-readable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub text: String,
}

impl Diagnostic {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Width of the label column in field listings.
const LABEL_COLUMN: usize = 22;

/// Formats events and relays touches. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Render a serial event and forward touches to `pointer`.
    ///
    /// Pointer failures are logged and do not stop processing.
    pub fn dispatch_serial<P>(&self, event: &SerialEvent, pointer: &mut P) -> Diagnostic
    where
        P: PointerEmitter + ?Sized,
    {
        if let SerialEvent::Touch(touch) = event {
            let result = pointer
                .move_to(touch.pointer_update())
                .and_then(|()| pointer.sync());
            if let Err(e) = result {
                warn!("Failed to forward touch to pointer device: {e}");
            }
        }
        self.render_serial(event)
    }

    pub fn render_serial(&self, event: &SerialEvent) -> Diagnostic {
        match *event {
            SerialEvent::CableConnected => {
                Diagnostic::warning("USB cable connected, please disconnect")
            }
            SerialEvent::DeviceInfo {
                serial_number,
                version,
                extra,
            } => Diagnostic::info(format!(
                "Model info, serial={serial_number}, version={version}, unknown=0x{extra:04x}"
            )),
            SerialEvent::CalibrationStatus { status } => {
                Diagnostic::info(format!("Calibration status: {status:.6}"))
            }
            SerialEvent::Touch(touch) => Diagnostic::info(render_touch(&touch)),
            SerialEvent::Unknown {
                type_code,
                x_bits,
                y_bits,
            } => Diagnostic::warning(format!(
                "Unknown packet 0x{type_code:02x}, x={x_bits}, y={y_bits}"
            )),
        }
    }

    /// Render framer output; packets are decoded and rendered like events.
    pub fn render_framer_output(&self, output: &FramerOutput) -> Diagnostic {
        match output {
            FramerOutput::Packet(packet) => self.render_serial(&SerialEvent::from_packet(packet)),
            FramerOutput::Overflow { .. } => Self::render_overflow(),
        }
    }

    pub fn render_overflow() -> Diagnostic {
        Diagnostic::warning("Overflow, resetting buffer")
    }

    /// Human-readable value of a field, in user units.
    pub fn render_field_value(field: Field, raw: u32) -> String {
        match field {
            Field::FirmwareVersion => FirmwareVersion::from_field(raw).to_string(),
            Field::HwCaps => format!("0x{raw:02x}"),
            _ => match field.unit() {
                FieldUnit::TenMillis => format!("{} ms", field.unit().from_raw(raw)),
                FieldUnit::Raw => raw.to_string(),
            },
        }
    }

    /// One line of a field listing, e.g. `Version:              2.05`.
    pub fn render_field(field: Field, raw: u32) -> Diagnostic {
        let label = format!("{}:", field.label());
        Diagnostic::info(format!(
            "{label:<LABEL_COLUMN$}{}",
            Self::render_field_value(field, raw)
        ))
    }

    pub fn render_field_error(field: Field) -> Diagnostic {
        Diagnostic::warning(format!("Error reading {}", field.description()))
    }

    /// Render an unsolicited USB response, if it says anything worth showing.
    pub fn render_response(&self, response: &Response) -> Option<Diagnostic> {
        match *response {
            Response::Field { field, raw } => Some(Self::render_field(field, raw)),
            Response::CalibrationEcho { .. } => None,
            Response::UnknownSelector { selector } => Some(Diagnostic::warning(format!(
                "unknown 'C' packet (0x{selector:02x})"
            ))),
            Response::UnknownGroup { tag } => Some(Diagnostic::warning(format!(
                "Unknown packet type (0x{tag:02x})"
            ))),
            Response::Truncated { len } => {
                Some(Diagnostic::warning(format!("Truncated report ({len} bytes)")))
            }
        }
    }
}

fn render_touch(touch: &TouchEvent) -> String {
    format!(
        "Action {} LCD, x={:.6}, y={:.6} {} ({})",
        touch.region.label(),
        touch.x,
        touch.y,
        touch.key.label(),
        touch.key.code()
    )
}

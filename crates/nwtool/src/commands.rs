//! Action dispatch for both transports.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use hid_nextwindow_protocol::{ChannelConfig, EventDispatcher, Field, UsbCommandChannel};
use nwtool_hid_common::{AnyDevice, BusFilter, ReportDevice};
use std::path::PathBuf;
use tracing::debug;

use crate::error::CliError;
use crate::output;
use crate::transport::hid;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Show device info
    Info,
    /// Set one configuration field (USB); time fields take milliseconds
    Set {
        /// Field name, e.g. rightclick-delay
        field: Field,
        /// New value in user units
        value: u32,
    },
    /// Toggle calibration mode
    Calibrate {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Forward touches to a virtual pointer (serial)
    Forward,
    /// Hard reset the controller (USB)
    Reset,
    /// Restore factory defaults (USB)
    FactoryDefaults,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Info => "info",
            Action::Set { .. } => "set",
            Action::Calibrate { .. } => "calibrate",
            Action::Forward => "forward",
            Action::Reset => "reset",
            Action::FactoryDefaults => "factory-defaults",
        }
    }

    pub fn supported_by(&self, transport: &Transport) -> bool {
        match transport {
            Transport::Serial(_) => matches!(
                self,
                Action::Info | Action::Calibrate { .. } | Action::Forward
            ),
            Transport::Usb { .. } => !matches!(self, Action::Forward),
        }
    }
}

/// Where the controller is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Serial(PathBuf),
    Usb {
        bus: Option<u16>,
        address: Option<u16>,
    },
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Serial(_) => "serial",
            Transport::Usb { .. } => "USB",
        }
    }
}

/// Reject bad combinations and arguments before touching any device.
pub fn validate(action: &Action, transport: &Transport) -> Result<(), CliError> {
    if !action.supported_by(transport) {
        return Err(CliError::UnsupportedAction {
            action: action.name(),
            transport: transport.name(),
        });
    }
    if let Action::Set { field, value } = action {
        field
            .encode_user_value(*value)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    }
    Ok(())
}

pub fn execute(action: &Action, transport: &Transport, config: ChannelConfig, json: bool) -> Result<()> {
    validate(action, transport)?;
    debug!("Running {} over {}", action.name(), transport.name());

    match transport {
        Transport::Serial(path) => execute_serial(action, path, json),
        Transport::Usb { bus, address } => {
            let device = match bus {
                Some(bus) => {
                    let mut filter = BusFilter::bus(*bus);
                    if let Some(address) = address {
                        filter = filter.with_address(*address);
                    }
                    hid::open(&filter)?
                }
                None => hid::open(&AnyDevice)?,
            };
            let mut channel = UsbCommandChannel::new(device, config);
            run_usb(action, &mut channel, json)
        }
    }
}

#[cfg(target_os = "linux")]
fn execute_serial(action: &Action, path: &std::path::Path, json: bool) -> Result<()> {
    use crate::pointer::UinputPointer;
    use crate::transport::serial::SerialLine;
    use hid_nextwindow_protocol::{NullPointer, SerialSession};

    let line = SerialLine::open(path)?;
    let print = |diagnostic: hid_nextwindow_protocol::Diagnostic| {
        output::print_diagnostic(&diagnostic, json);
    };

    match action {
        Action::Info => {
            let mut session = SerialSession::new(line, NullPointer);
            session.request_status(print)?;
            output::print_serial_status(&session.status(), json)?;
        }
        Action::Calibrate { state } => {
            SerialSession::new(line, NullPointer).calibrate(state.enabled(), print)?;
        }
        Action::Forward => {
            let pointer =
                UinputPointer::create().map_err(|e| CliError::from_open_error("/dev/uinput", e))?;
            SerialSession::new(line, pointer).forward(print)?;
        }
        Action::Set { .. } | Action::Reset | Action::FactoryDefaults => {
            return Err(CliError::UnsupportedAction {
                action: action.name(),
                transport: "serial",
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn execute_serial(action: &Action, _path: &std::path::Path, _json: bool) -> Result<()> {
    Err(CliError::UnsupportedAction {
        action: action.name(),
        transport: "serial on this platform",
    }
    .into())
}

/// Run a USB action on an open channel.
pub fn run_usb<D: ReportDevice>(
    action: &Action,
    channel: &mut UsbCommandChannel<D>,
    json: bool,
) -> Result<()> {
    match action {
        Action::Info => {
            let readings = channel.query_all()?;
            output::print_field_readings(&readings, json)?;
        }
        Action::Set { field, value } => {
            channel.set(*field, *value)?;
            let raw = field.encode_user_value(*value)?;
            output::print_success(
                &format!(
                    "Set {field} to {}",
                    EventDispatcher::render_field_value(*field, raw)
                ),
                json,
            )?;
        }
        Action::Calibrate { state } => {
            channel.calibrate(state.enabled())?;
            let verb = if state.enabled() { "started" } else { "stopped" };
            output::print_success(&format!("Calibration {verb}"), json)?;
        }
        Action::Reset => {
            channel.hard_reset()?;
            output::print_success("Controller reset", json)?;
        }
        Action::FactoryDefaults => {
            channel.restore_factory_defaults()?;
            output::print_success("Factory defaults restored", json)?;
        }
        Action::Forward => {
            return Err(CliError::UnsupportedAction {
                action: action.name(),
                transport: "USB",
            }
            .into());
        }
    }
    Ok(())
}

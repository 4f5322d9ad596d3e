//! nwtool - NextWindow touchscreen utility
//!
//! Reads and writes controller configuration over USB, and forwards touches
//! from serial-attached controllers to a virtual pointer.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;
#[cfg(target_os = "linux")]
mod pointer;
mod transport;

use anyhow::Result;
use clap::{Args, Parser};
use hid_nextwindow_protocol::ChannelConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Action, Transport};
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "nwtool")]
#[command(about = "NextWindow touchscreen configuration and touch forwarding")]
#[command(version)]
#[command(long_about = "
nwtool talks to NextWindow touchscreen controllers.

Over USB it reads and writes the controller's configuration fields, toggles
calibration mode and resets the controller. Over a serial line it requests
device info, toggles calibration and forwards touches to a virtual pointer.
Use --json for machine-readable output.
")]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read attempts per USB field query [default: $NWTOOL_POLL_ATTEMPTS or 10]
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..))]
    poll_attempts: Option<u8>,

    /// Per-attempt USB read timeout in milliseconds [default: $NWTOOL_POLL_TIMEOUT_MS or 1000]
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    poll_timeout_ms: Option<u32>,

    #[command(flatten)]
    transport: TransportArgs,

    /// Only use the device on this USB bus
    #[arg(long, requires = "usb")]
    bus: Option<u16>,

    /// Only use the device with this address on --bus
    #[arg(long, requires = "bus")]
    address: Option<u16>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct TransportArgs {
    /// Serial device of the controller, e.g. /dev/ttyS0
    #[arg(long, value_name = "DEV")]
    serial: Option<PathBuf>,

    /// Use the USB vendor interface
    #[arg(long)]
    usb: bool,
}

impl Cli {
    fn transport(&self) -> Transport {
        match &self.transport.serial {
            Some(path) => Transport::Serial(path.clone()),
            None => Transport::Usb {
                bus: self.bus,
                address: self.address,
            },
        }
    }

    /// Environment settings with the poll flags applied on top.
    fn channel_config(&self) -> ChannelConfig {
        self.override_config(ChannelConfig::from_env())
    }

    fn override_config(&self, mut config: ChannelConfig) -> ChannelConfig {
        if let Some(attempts) = self.poll_attempts {
            config = config.with_max_attempts(attempts);
        }
        if let Some(timeout_ms) = self.poll_timeout_ms {
            config = config.with_read_timeout_ms(timeout_ms);
        }
        config
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "nwtool={log_level},hid_nextwindow_protocol={log_level},nwtool_hid_common={log_level}"
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    commands::execute(&cli.action, &cli.transport(), cli.channel_config(), cli.json)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hid_nextwindow_protocol::Field;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_usb_info_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["nwtool", "--usb", "info"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.action, Action::Info);
        assert_eq!(
            cli.transport(),
            Transport::Usb {
                bus: None,
                address: None
            }
        );
        Ok(())
    }

    #[test]
    fn parse_serial_forward() -> TestResult {
        let cli = Cli::try_parse_from(["nwtool", "--serial", "/dev/ttyS0", "forward", "-vv"])?;
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.transport(), Transport::Serial(PathBuf::from("/dev/ttyS0")));
        assert_eq!(cli.action, Action::Forward);
        Ok(())
    }

    #[test]
    fn parse_set_field_and_value() -> TestResult {
        let cli = Cli::try_parse_from(["nwtool", "--usb", "set", "rightclick-delay", "50"])?;
        assert_eq!(
            cli.action,
            Action::Set {
                field: Field::RightclickDelay,
                value: 50
            }
        );
        Ok(())
    }

    #[test]
    fn parse_bus_and_address_filter() -> TestResult {
        let cli = Cli::try_parse_from([
            "nwtool", "--usb", "--bus", "3", "--address", "7", "calibrate", "on", "--json",
        ])?;
        assert!(cli.json);
        assert_eq!(
            cli.transport(),
            Transport::Usb {
                bus: Some(3),
                address: Some(7)
            }
        );
        Ok(())
    }

    #[test]
    fn poll_flags_override_config() -> TestResult {
        let cli = Cli::try_parse_from([
            "nwtool",
            "--usb",
            "--poll-attempts",
            "3",
            "--poll-timeout-ms",
            "250",
            "info",
        ])?;
        let config = cli.channel_config();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.read_timeout_ms, 250);
        Ok(())
    }

    #[test]
    fn invalid_env_values_fall_back_to_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["nwtool", "--usb", "info"])?;
        let from_env = ChannelConfig::from_lookup(|key| match key {
            "NWTOOL_POLL_ATTEMPTS" => Some("bogus".to_string()),
            "NWTOOL_POLL_TIMEOUT_MS" => Some("0".to_string()),
            _ => None,
        });

        assert_eq!(cli.override_config(from_env), ChannelConfig::default());
        Ok(())
    }

    #[test]
    fn poll_flags_win_over_env() -> TestResult {
        let cli = Cli::try_parse_from(["nwtool", "--usb", "--poll-attempts", "2", "info"])?;
        let from_env = ChannelConfig::from_lookup(|key| match key {
            "NWTOOL_POLL_ATTEMPTS" => Some("7".to_string()),
            "NWTOOL_POLL_TIMEOUT_MS" => Some("300".to_string()),
            _ => None,
        });

        let config = cli.override_config(from_env);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.read_timeout_ms, 300);
        Ok(())
    }

    #[test]
    fn transport_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["nwtool", "info"]).is_err());
        assert!(Cli::try_parse_from(["nwtool", "--usb", "--serial", "/dev/ttyS0", "info"]).is_err());
    }

    #[test]
    fn bus_filter_requires_usb() {
        assert!(Cli::try_parse_from(["nwtool", "--serial", "/dev/ttyS0", "--bus", "1", "info"]).is_err());
        assert!(Cli::try_parse_from(["nwtool", "--usb", "--address", "1", "info"]).is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(Cli::try_parse_from(["nwtool", "--usb", "set", "volume", "3"]).is_err());
        assert!(Cli::try_parse_from(["nwtool", "--usb", "calibrate", "maybe"]).is_err());
    }
}

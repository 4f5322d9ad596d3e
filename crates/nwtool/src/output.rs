//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use hid_nextwindow_protocol::{Diagnostic, EventDispatcher, FieldReading, SerialDeviceStatus};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    if let Err(e) = print_json(&error_json) {
        eprintln!("Failed to format error as JSON: {e}");
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::DeviceNotFound(_)) => "device_not_found",
        Some(CliError::PermissionDenied(_)) => "permission_denied",
        Some(CliError::UnsupportedAction { .. }) => "unsupported_action",
        Some(CliError::InvalidArgument(_)) => "invalid_argument",
        Some(CliError::Io(_)) => "io_error",
        Some(CliError::Json(_)) => "json_error",
        None => "error",
    }
}

/// Print one event line: info to stdout, warnings to stderr.
pub fn print_diagnostic(diagnostic: &Diagnostic, json: bool) {
    if json {
        match serde_json::to_string(diagnostic) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("Failed to format event as JSON: {e}"),
        }
    } else if diagnostic.is_warning() {
        eprintln!("{}", diagnostic.text.yellow());
    } else {
        println!("{diagnostic}");
    }
}

/// Field listing as text lines, with an error line for each missing field.
pub fn field_lines(readings: &[FieldReading]) -> Vec<Diagnostic> {
    readings
        .iter()
        .map(|reading| match reading.raw {
            Some(raw) => EventDispatcher::render_field(reading.field, raw),
            None => EventDispatcher::render_field_error(reading.field),
        })
        .collect()
}

/// Field listing as a JSON object keyed by field name; missing fields are null.
pub fn field_json(readings: &[FieldReading]) -> Value {
    let fields: Map<String, Value> = readings
        .iter()
        .map(|reading| {
            let value = reading.raw.map_or(Value::Null, |raw| {
                json!({
                    "raw": raw,
                    "display": EventDispatcher::render_field_value(reading.field, raw),
                })
            });
            (reading.field.name().to_string(), value)
        })
        .collect();
    json!({ "success": true, "fields": fields })
}

pub fn print_field_readings(readings: &[FieldReading], json: bool) -> Result<(), CliError> {
    if json {
        print_json(&field_json(readings))?;
    } else {
        for line in field_lines(readings) {
            print_diagnostic(&line, false);
        }
    }
    Ok(())
}

pub fn print_serial_status(status: &SerialDeviceStatus, json: bool) -> Result<(), CliError> {
    if json {
        print_json(&json!({ "success": true, "status": status }))?;
    }
    Ok(())
}

/// Confirmation of a completed command.
pub fn print_success(message: &str, json: bool) -> Result<(), CliError> {
    if json {
        print_json(&json!({ "success": true, "message": message }))?;
    } else {
        println!("{} {}", "✓".green(), message);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

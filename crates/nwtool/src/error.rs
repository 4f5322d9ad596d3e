//! Error types for nwtool

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No touchscreen detected: {0}")]
    DeviceNotFound(String),

    #[error("Permission denied: {0} (are you root?)")]
    PermissionDenied(String),

    #[error("'{action}' is not supported over {transport}")]
    UnsupportedAction {
        action: &'static str,
        transport: &'static str,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::DeviceNotFound(_) => 2,
            CliError::UnsupportedAction { .. } | CliError::InvalidArgument(_) => 4,
            CliError::PermissionDenied(_) => 6,
            CliError::Io(_) | CliError::Json(_) => 1,
        }
    }

    /// Classify an I/O failure while opening `what`.
    pub fn from_open_error(what: &str, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => CliError::DeviceNotFound(what.to_string()),
            std::io::ErrorKind::PermissionDenied => CliError::PermissionDenied(what.to_string()),
            _ => CliError::Io(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::DeviceNotFound("x".into()).exit_code(), 2);
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 4);
        assert_eq!(
            CliError::UnsupportedAction {
                action: "set",
                transport: "serial"
            }
            .exit_code(),
            4
        );
        assert_eq!(CliError::PermissionDenied("x".into()).exit_code(), 6);
        assert_eq!(CliError::Io(io::Error::other("x")).exit_code(), 1);
    }

    #[test]
    fn json_failures_convert_and_exit_with_one() -> Result<(), &'static str> {
        let source = serde_json::from_str::<serde_json::Value>("[1,")
            .err()
            .ok_or("truncated JSON parsed")?;
        let err = CliError::from(source);
        assert!(matches!(err, CliError::Json(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("JSON error"));
        Ok(())
    }

    #[test]
    fn open_errors_are_classified() {
        let err = CliError::from_open_error("/dev/ttyS0", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CliError::DeviceNotFound(_)));

        let err = CliError::from_open_error(
            "/dev/ttyS0",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, CliError::PermissionDenied(_)));
        assert_eq!(err.to_string(), "Permission denied: /dev/ttyS0 (are you root?)");
    }
}

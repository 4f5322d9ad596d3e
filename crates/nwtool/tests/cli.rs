//! Command-line behaviour that needs no hardware.

use assert_cmd::Command;
use predicates::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn nwtool() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("nwtool")?;
    cmd.env_remove("NWTOOL_POLL_ATTEMPTS")
        .env_remove("NWTOOL_POLL_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn help_lists_actions() -> TestResult {
    nwtool()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("factory-defaults"))
        .stdout(predicate::str::contains("--serial"));
    Ok(())
}

#[test]
fn read_only_field_is_rejected_before_io() -> TestResult {
    nwtool()?
        .args(["--usb", "set", "serial-number", "5"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("read-only"));
    Ok(())
}

#[test]
fn out_of_range_value_is_rejected() -> TestResult {
    nwtool()?
        .args(["--usb", "set", "buzzer-tone", "256"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("out of range"));
    Ok(())
}

#[test]
fn serial_reset_is_unsupported() -> TestResult {
    nwtool()?
        .args(["--serial", "/nonexistent/tty", "reset"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not supported over serial"));
    Ok(())
}

#[test]
fn usb_forward_reports_json_error() -> TestResult {
    nwtool()?
        .args(["--json", "--usb", "forward"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("\"unsupported_action\""));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn missing_serial_device_is_not_found() -> TestResult {
    nwtool()?
        .args(["--serial", "/nonexistent/tty", "info"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn missing_transport_is_a_usage_error() -> TestResult {
    nwtool()?.arg("info").assert().failure();
    Ok(())
}

#[test]
fn invalid_poll_env_is_not_a_usage_error() -> TestResult {
    // Bad environment values are ignored, so validation still decides the exit code.
    nwtool()?
        .env("NWTOOL_POLL_ATTEMPTS", "bogus")
        .env("NWTOOL_POLL_TIMEOUT_MS", "0")
        .args(["--usb", "set", "serial-number", "5"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("read-only"));
    Ok(())
}

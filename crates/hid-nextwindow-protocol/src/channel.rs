//! Request/response channel over the USB vendor interface.
//!
//! Every inbound `'C'` report updates the cache for whichever field it
//! carries, so a response that arrives late for an earlier request is not
//! lost. `get` returns as soon as the requested field has been seen since
//! the request went out.

#![deny(static_mut_refs)]

use crate::field::{Field, GotMask};
use crate::report::{self, Response};
use crate::{NextWindowError, NextWindowResult};
use nwtool_hid_common::ReportDevice;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Read attempts per `get` before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u8 = 10;
/// Per-attempt read timeout.
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 1000;

pub const ENV_POLL_ATTEMPTS: &str = "NWTOOL_POLL_ATTEMPTS";
pub const ENV_POLL_TIMEOUT_MS: &str = "NWTOOL_POLL_TIMEOUT_MS";

/// Polling limits for [`UsbCommandChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelConfig {
    pub max_attempts: u8,
    pub read_timeout_ms: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl ChannelConfig {
    /// Defaults overridden by `NWTOOL_POLL_ATTEMPTS` and `NWTOOL_POLL_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// Unparseable or zero values are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(attempts) = parse_positive::<u8>(&lookup, ENV_POLL_ATTEMPTS) {
            config.max_attempts = attempts;
        }
        if let Some(timeout) = parse_positive::<u32>(&lookup, ENV_POLL_TIMEOUT_MS) {
            config.read_timeout_ms = timeout;
        }
        config
    }

    pub fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_read_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.read_timeout_ms = timeout_ms;
        self
    }
}

fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let value = lookup(key)?;
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Some(parsed),
        _ => {
            warn!("Ignoring {key}={value:?}: expected a positive integer");
            None
        }
    }
}

/// Last observed raw value of every field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCache {
    values: [u32; Field::COUNT],
    got: GotMask,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, field: Field, raw: u32) {
        if let Some(slot) = self.values.get_mut(field.index()) {
            *slot = raw;
        }
        self.got.insert(field);
    }

    /// Raw value, if the field has been observed since its bit was last cleared.
    pub fn get(&self, field: Field) -> Option<u32> {
        if !self.got.contains(field) {
            return None;
        }
        self.values.get(field.index()).copied()
    }

    pub fn clear(&mut self, field: Field) {
        self.got.remove(field);
    }

    pub fn got_mask(&self) -> GotMask {
        self.got
    }
}

/// Outcome of reading one field during a full query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldReading {
    pub field: Field,
    /// `None` when the device never answered within the attempt budget.
    pub raw: Option<u32>,
}

/// Field get/set channel on top of a [`ReportDevice`].
pub struct UsbCommandChannel<D: ReportDevice> {
    device: D,
    config: ChannelConfig,
    cache: FieldCache,
}

impl<D: ReportDevice> UsbCommandChannel<D> {
    pub fn new(device: D, config: ChannelConfig) -> Self {
        Self {
            device,
            config,
            cache: FieldCache::new(),
        }
    }

    pub fn config(&self) -> ChannelConfig {
        self.config
    }

    /// Request `field` and poll until the device reports it.
    ///
    /// # Errors
    ///
    /// `AcquisitionTimeout` when the attempt budget runs out, `Transport`
    /// on any read or write failure other than a timeout.
    pub fn get(&mut self, field: Field) -> NextWindowResult<u32> {
        self.cache.clear(field);
        self.send(&report::read_request(field))?;

        for attempt in 1..=self.config.max_attempts {
            match self.device.read_report(self.config.read_timeout_ms) {
                Ok(data) => {
                    self.absorb(&data);
                }
                Err(e) if e.is_timeout() => {
                    debug!(
                        "No report for {field} (attempt {attempt}/{})",
                        self.config.max_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(raw) = self.cache.get(field) {
                return Ok(raw);
            }
        }

        Err(NextWindowError::AcquisitionTimeout {
            field,
            attempts: self.config.max_attempts,
        })
    }

    /// Write a user-facing value (milliseconds for time fields).
    ///
    /// # Errors
    ///
    /// Validation errors from [`Field::encode_user_value`], or `Transport`.
    pub fn set(&mut self, field: Field, value: u32) -> NextWindowResult<()> {
        let raw = field.encode_user_value(value)?;
        self.set_raw(field, raw)
    }

    /// Write a raw device value without unit conversion.
    pub fn set_raw(&mut self, field: Field, raw: u32) -> NextWindowResult<()> {
        if !field.is_writable() {
            return Err(NextWindowError::ReadOnlyField(field));
        }
        let max = field.width().max_value();
        if raw > max {
            return Err(NextWindowError::ValueOutOfRange {
                field,
                value: raw,
                max,
            });
        }
        info!("Setting {field} to raw value {raw}");
        self.send(&report::write_request(field, raw))
    }

    pub fn calibrate(&mut self, enable: bool) -> NextWindowResult<()> {
        info!("Calibration mode {}", if enable { "on" } else { "off" });
        self.send(&report::calibrate_request(enable))
    }

    /// Reboot the controller. No response is expected.
    pub fn hard_reset(&mut self) -> NextWindowResult<()> {
        info!("Hard reset");
        self.send(&report::hard_reset_request())
    }

    /// Restore factory defaults. No response is expected.
    pub fn restore_factory_defaults(&mut self) -> NextWindowResult<()> {
        info!("Restoring factory defaults");
        self.send(&report::factory_defaults_request())
    }

    /// Read every field in display order.
    ///
    /// Fields that time out are reported with `raw: None`; transport
    /// failures abort the query.
    pub fn query_all(&mut self) -> NextWindowResult<Vec<FieldReading>> {
        let mut readings = Vec::with_capacity(Field::COUNT);
        for field in Field::ALL {
            let raw = match self.get(field) {
                Ok(raw) => Some(raw),
                Err(e) if e.is_acquisition_timeout() => {
                    warn!("{e}");
                    None
                }
                Err(e) => return Err(e),
            };
            readings.push(FieldReading { field, raw });
        }
        Ok(readings)
    }

    /// Cached raw value of `field`, if observed.
    pub fn cached(&self, field: Field) -> Option<u32> {
        self.cache.get(field)
    }

    pub fn got_mask(&self) -> GotMask {
        self.cache.got_mask()
    }

    /// Parse one inbound report and update the cache.
    pub fn absorb(&mut self, data: &[u8]) -> Response {
        let response = Response::parse(data);
        match response {
            Response::Field { field, raw } => {
                debug!("Received {field} = {raw}");
                self.cache.store(field, raw);
            }
            Response::CalibrationEcho { raw } => {
                debug!("Calibration mode acknowledged ({raw})");
            }
            Response::UnknownSelector { selector } => {
                warn!("Unknown 'C' packet (0x{selector:02x})");
            }
            Response::UnknownGroup { tag } => {
                warn!("Unknown packet type (0x{tag:02x})");
            }
            Response::Truncated { len } => {
                warn!("Truncated report ({len} bytes)");
            }
        }
        response
    }

    fn send(&mut self, report: &report::Report) -> NextWindowResult<()> {
        debug!("Sending report {}", hex_prefix(report));
        self.device.write_report(report)?;
        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

fn hex_prefix(report: &[u8]) -> String {
    report
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NEXTWINDOW_VENDOR_ID, product_ids};
    use nwtool_hid_common::mock::MockReportDevice;

    fn channel(attempts: u8) -> (MockReportDevice, UsbCommandChannel<MockReportDevice>) {
        let mock = MockReportDevice::new(
            NEXTWINDOW_VENDOR_ID,
            product_ids::TOUCHSCREEN,
            "0001:0004:01",
        );
        let config = ChannelConfig::default().with_max_attempts(attempts);
        (mock.clone(), UsbCommandChannel::new(mock, config))
    }

    #[test]
    fn get_returns_matching_response() -> NextWindowResult<()> {
        let (mock, mut channel) = channel(10);
        mock.queue_read(vec![b'C', 3, 0x10, 0x12, 0x34]);

        assert_eq!(channel.get(Field::Model)?, 0x1234);
        assert_eq!(mock.get_write_history().len(), 1);
        assert_eq!(mock.reads_attempted(), 1);
        Ok(())
    }

    #[test]
    fn unrelated_response_updates_cache_then_times_out() {
        let (mock, mut channel) = channel(3);
        mock.queue_read(vec![b'C', 2, 0x35, 7]);

        let result = channel.get(Field::Model);
        assert!(matches!(
            result,
            Err(NextWindowError::AcquisitionTimeout {
                field: Field::Model,
                attempts: 3
            })
        ));
        assert_eq!(channel.cached(Field::BuzzerTone), Some(7));
        assert_eq!(mock.reads_attempted(), 3);
    }

    #[test]
    fn read_failure_is_a_transport_error() {
        let (mock, mut channel) = channel(10);
        mock.queue_failure("pipe error");

        assert!(matches!(
            channel.get(Field::HwCaps),
            Err(NextWindowError::Transport(_))
        ));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ChannelConfig::from_lookup(|key| match key {
            ENV_POLL_ATTEMPTS => Some("3".to_string()),
            ENV_POLL_TIMEOUT_MS => Some("bogus".to_string()),
            _ => None,
        });
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);

        let config = ChannelConfig::from_lookup(|_| Some("0".to_string()));
        assert_eq!(config, ChannelConfig::default());
    }

    #[test]
    fn set_raw_rejects_read_only_fields() {
        let (mock, mut channel) = channel(1);
        assert!(matches!(
            channel.set_raw(Field::SerialNumber, 1),
            Err(NextWindowError::ReadOnlyField(Field::SerialNumber))
        ));
        assert!(mock.get_write_history().is_empty());
    }
}

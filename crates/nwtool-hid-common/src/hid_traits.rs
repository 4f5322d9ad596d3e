//! HID device traits

use crate::HidCommonResult;

/// A device exchanging fixed-size reports over a vendor channel.
///
/// Calls block. `read_report` returns `HidCommonError::Timeout` when nothing
/// arrived within `timeout_ms`; every other error is a transport failure.
pub trait ReportDevice {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize>;

    fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>>;

    fn get_device_info(&self) -> &crate::HidDeviceInfo;
}

impl<D: ReportDevice + ?Sized> ReportDevice for Box<D> {
    fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
        (**self).write_report(data)
    }

    fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>> {
        (**self).read_report(timeout_ms)
    }

    fn get_device_info(&self) -> &crate::HidDeviceInfo {
        (**self).get_device_info()
    }
}

pub mod mock {
    use super::*;
    use crate::HidCommonError;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};
    use std::sync::{Arc, Mutex};

    /// Scripted inbound item for [`MockReportDevice`].
    #[derive(Debug, Clone)]
    pub enum MockRead {
        Report(Vec<u8>),
        Timeout,
        Fail(String),
    }

    /// In-memory report device.
    ///
    /// Reads are served from a script; once the script is exhausted every
    /// read times out. Clones share the same script and write history.
    #[derive(Clone)]
    pub struct MockReportDevice {
        info: crate::HidDeviceInfo,
        read_queue: Arc<Mutex<VecDeque<MockRead>>>,
        write_history: Arc<Mutex<Vec<Vec<u8>>>>,
        reads_attempted: Arc<Mutex<usize>>,
        connected: Arc<Mutex<bool>>,
    }

    impl MockReportDevice {
        pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
            Self {
                info: crate::HidDeviceInfo::new(vendor_id, product_id, path.into()),
                read_queue: Arc::new(Mutex::new(VecDeque::new())),
                write_history: Arc::new(Mutex::new(Vec::new())),
                reads_attempted: Arc::new(Mutex::new(0)),
                connected: Arc::new(Mutex::new(true)),
            }
        }

        pub fn queue_read(&self, data: Vec<u8>) {
            self.queue(MockRead::Report(data));
        }

        pub fn queue_timeout(&self) {
            self.queue(MockRead::Timeout);
        }

        pub fn queue_failure(&self, message: impl Into<String>) {
            self.queue(MockRead::Fail(message.into()));
        }

        fn queue(&self, item: MockRead) {
            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.push_back(item);
        }

        pub fn get_write_history(&self) -> Vec<Vec<u8>> {
            let history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.clone()
        }

        pub fn reads_attempted(&self) -> usize {
            *self.reads_attempted.lock().unwrap_or_else(|e| e.into_inner())
        }

        pub fn disconnect(&self) {
            let mut connected = self.connected.lock().unwrap_or_else(|e| e.into_inner());
            *connected = false;
        }

        pub fn reconnect(&self) {
            let mut connected = self.connected.lock().unwrap_or_else(|e| e.into_inner());
            *connected = true;
        }

        fn is_connected(&self) -> bool {
            *self.connected.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    impl ReportDevice for MockReportDevice {
        fn write_report(&mut self, data: &[u8]) -> HidCommonResult<usize> {
            if !self.is_connected() {
                return Err(HidCommonError::Disconnected);
            }

            let mut history = self.write_history.lock().unwrap_or_else(|e| e.into_inner());
            history.push(data.to_vec());
            Ok(data.len())
        }

        fn read_report(&mut self, timeout_ms: u32) -> HidCommonResult<Vec<u8>> {
            if !self.is_connected() {
                return Err(HidCommonError::Disconnected);
            }

            {
                let mut attempts = self.reads_attempted.lock().unwrap_or_else(|e| e.into_inner());
                *attempts += 1;
            }

            let mut queue = self.read_queue.lock().unwrap_or_else(|e| e.into_inner());
            match queue.pop_front() {
                Some(MockRead::Report(data)) => Ok(data),
                Some(MockRead::Fail(message)) => Err(HidCommonError::ReadError(message)),
                Some(MockRead::Timeout) | None => Err(HidCommonError::Timeout { timeout_ms }),
            }
        }

        fn get_device_info(&self) -> &crate::HidDeviceInfo {
            &self.info
        }
    }

    /// In-memory byte line standing in for a serial port.
    ///
    /// Each queued chunk is returned by exactly one `read` call (truncated to
    /// the caller's buffer, remainder kept). An empty script reads as EOF.
    #[derive(Clone, Default)]
    pub struct MockSerialLine {
        chunks: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl MockSerialLine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_chunk(&self, data: impl Into<Vec<u8>>) {
            let mut chunks = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
            chunks.push_back(Ok(data.into()));
        }

        pub fn queue_error(&self, kind: io::ErrorKind) {
            let mut chunks = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
            chunks.push_back(Err(io::Error::from(kind)));
        }

        pub fn written(&self) -> Vec<u8> {
            self.written.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl Read for MockSerialLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut chunks = self.chunks.lock().unwrap_or_else(|e| e.into_inner());
            match chunks.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut data)) => {
                    let n = data.len().min(buf.len());
                    let rest = data.split_off(n);
                    if let Some(dst) = buf.get_mut(..n) {
                        dst.copy_from_slice(&data);
                    }
                    if !rest.is_empty() {
                        chunks.push_front(Ok(rest));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for MockSerialLine {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
            written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

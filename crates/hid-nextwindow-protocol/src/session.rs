//! One serial connection: framer state, last reported status and the pointer sink.

#![deny(static_mut_refs)]

use crate::NextWindowResult;
use crate::dispatch::{Diagnostic, EventDispatcher, PointerEmitter};
use crate::framer::{FramerOutput, SerialFramer};
use crate::serial::{SerialEvent, commands};
use crate::types::FirmwareVersion;
use serde::Serialize;
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// Bytes requested per read.
pub const READ_CHUNK: usize = 256;

/// What the controller has told us about itself on this connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SerialDeviceStatus {
    pub serial_number: Option<u32>,
    pub version: Option<FirmwareVersion>,
    pub calibration: Option<f32>,
}

impl SerialDeviceStatus {
    fn apply(&mut self, event: &SerialEvent) {
        match *event {
            SerialEvent::DeviceInfo {
                serial_number,
                version,
                ..
            } => {
                self.serial_number = Some(serial_number);
                self.version = Some(version);
            }
            SerialEvent::CalibrationStatus { status } => self.calibration = Some(status),
            _ => {}
        }
    }
}

/// Serial controller session over any byte line.
pub struct SerialSession<L, P> {
    line: L,
    pointer: P,
    framer: SerialFramer,
    dispatcher: EventDispatcher,
    status: SerialDeviceStatus,
}

impl<L, P> SerialSession<L, P>
where
    L: Read + Write,
    P: PointerEmitter,
{
    pub fn new(line: L, pointer: P) -> Self {
        Self {
            line,
            pointer,
            framer: SerialFramer::new(),
            dispatcher: EventDispatcher::new(),
            status: SerialDeviceStatus::default(),
        }
    }

    /// Ask for device info and process one read.
    pub fn request_status<F>(&mut self, on_diag: F) -> NextWindowResult<usize>
    where
        F: FnMut(Diagnostic),
    {
        info!("Requesting device status");
        self.send(commands::REQUEST_STATUS)?;
        self.process_once(on_diag)
    }

    /// Toggle calibration mode and process one read.
    pub fn calibrate<F>(&mut self, enable: bool, on_diag: F) -> NextWindowResult<usize>
    where
        F: FnMut(Diagnostic),
    {
        info!("Calibration mode {}", if enable { "on" } else { "off" });
        self.send(commands::calibration(enable))?;
        self.process_once(on_diag)
    }

    /// Read once and handle every complete frame. Returns the bytes read;
    /// 0 means the line reached end of file.
    pub fn process_once<F>(&mut self, mut on_diag: F) -> NextWindowResult<usize>
    where
        F: FnMut(Diagnostic),
    {
        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match self.line.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let data = chunk.get(..n).unwrap_or_default();
        let dispatcher = &self.dispatcher;
        let status = &mut self.status;
        let pointer = &mut self.pointer;
        self.framer.feed(data, |output| {
            handle_output(dispatcher, &mut *status, &mut *pointer, &mut on_diag, output);
        });
        Ok(n)
    }

    /// Process reads until end of file or an error.
    pub fn forward<F>(&mut self, mut on_diag: F) -> NextWindowResult<()>
    where
        F: FnMut(Diagnostic),
    {
        info!("Forwarding touch events");
        while self.process_once(&mut on_diag)? > 0 {}
        debug!(
            "Line closed after {} packets, {} overflows",
            self.framer.packets_extracted(),
            self.framer.overflows()
        );
        Ok(())
    }

    pub fn status(&self) -> SerialDeviceStatus {
        self.status
    }

    pub fn framer(&self) -> &SerialFramer {
        &self.framer
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn into_inner(self) -> (L, P) {
        (self.line, self.pointer)
    }

    fn send(&mut self, command: &[u8]) -> NextWindowResult<()> {
        debug!("Sending {:?}", String::from_utf8_lossy(command));
        self.line.write_all(command)?;
        self.line.flush()?;
        Ok(())
    }
}

fn handle_output<P, F>(
    dispatcher: &EventDispatcher,
    status: &mut SerialDeviceStatus,
    pointer: &mut P,
    on_diag: &mut F,
    output: FramerOutput,
) where
    P: PointerEmitter,
    F: FnMut(Diagnostic),
{
    let diagnostic = match output {
        FramerOutput::Packet(packet) => {
            let event = SerialEvent::from_packet(&packet);
            status.apply(&event);
            dispatcher.dispatch_serial(&event, pointer)
        }
        FramerOutput::Overflow { .. } => EventDispatcher::render_overflow(),
    };
    on_diag(diagnostic);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::mock::RecordingPointer;
    use crate::serial::{RawPacket, packet_types};
    use nwtool_hid_common::mock::MockSerialLine;

    #[test]
    fn request_status_writes_command_and_records_info() -> NextWindowResult<()> {
        let line = MockSerialLine::new();
        let info = RawPacket {
            x_bits: 123_456,
            y_bits: 0x0205_0000,
            type_code: packet_types::DEVICE_INFO,
        };
        line.queue_chunk(info.to_frame().to_vec());

        let mut session = SerialSession::new(line.clone(), RecordingPointer::new());
        let mut lines = Vec::new();
        session.request_status(|d| lines.push(d.text))?;

        assert_eq!(line.written(), b"nwgs\r");
        assert_eq!(session.status().serial_number, Some(123_456));
        assert_eq!(session.status().version, Some(FirmwareVersion::new(2, 5)));
        assert_eq!(
            lines,
            vec!["Model info, serial=123456, version=2.05, unknown=0x0000".to_string()]
        );
        Ok(())
    }

    #[test]
    fn interrupted_reads_are_retried() -> NextWindowResult<()> {
        let line = MockSerialLine::new();
        line.queue_error(io::ErrorKind::Interrupted);
        let status = RawPacket::from_coordinates(0.0, 1.5, packet_types::CALIBRATION_STATUS);
        line.queue_chunk(status.to_frame().to_vec());

        let mut session = SerialSession::new(line, RecordingPointer::new());
        let n = session.process_once(|_| {})?;
        assert_eq!(n, 15);
        assert_eq!(session.status().calibration, Some(1.5));
        Ok(())
    }

    #[test]
    fn read_errors_propagate() {
        let line = MockSerialLine::new();
        line.queue_error(io::ErrorKind::BrokenPipe);

        let mut session = SerialSession::new(line, RecordingPointer::new());
        assert!(matches!(
            session.process_once(|_| {}),
            Err(crate::NextWindowError::Io(_))
        ));
    }

    #[test]
    fn forward_stops_at_eof() -> NextWindowResult<()> {
        let line = MockSerialLine::new();
        line.queue_chunk(RawPacket::from_coordinates(10.0, 20.0, 0x02).to_frame().to_vec());

        let mut session = SerialSession::new(line, RecordingPointer::new());
        session.forward(|_| {})?;
        assert_eq!(session.pointer().moves().len(), 1);
        assert_eq!(session.framer().packets_extracted(), 1);
        Ok(())
    }
}

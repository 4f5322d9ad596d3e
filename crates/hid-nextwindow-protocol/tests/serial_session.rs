use hid_nextwindow_protocol::dispatch::mock::{PointerCall, RecordingPointer};
use hid_nextwindow_protocol::serial::packet_types;
use hid_nextwindow_protocol::{
    Diagnostic, FirmwareVersion, PointerUpdate, RawPacket, SerialSession, Severity,
};
use nwtool_hid_common::mock::MockSerialLine;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn collect(session: &mut SerialSession<MockSerialLine, RecordingPointer>) -> Result<Vec<Diagnostic>, Box<dyn std::error::Error>> {
    let mut diagnostics = Vec::new();
    session.forward(|d| diagnostics.push(d))?;
    Ok(diagnostics)
}

#[test]
fn left_touch_moves_pointer() -> TestResult {
    let line = MockSerialLine::new();
    line.queue_chunk(RawPacket::from_coordinates(100.0, 200.0, 0x01).to_frame().to_vec());
    let mut session = SerialSession::new(line, RecordingPointer::new());

    let diagnostics = collect(&mut session)?;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        session.pointer().calls,
        vec![
            PointerCall::Move(PointerUpdate {
                x: 100,
                y: 200,
                left: true,
                right: false
            }),
            PointerCall::Sync,
        ]
    );
    Ok(())
}

#[test]
fn frames_split_across_reads_are_reassembled() -> TestResult {
    let line = MockSerialLine::new();
    let frame = RawPacket::from_coordinates(300.0, 400.0, 0x0C).to_frame();
    let (head, tail) = frame.split_at(7);
    line.queue_chunk(head.to_vec());
    line.queue_chunk(tail.to_vec());
    let mut session = SerialSession::new(line, RecordingPointer::new());

    collect(&mut session)?;
    let moves = session.pointer().moves();
    assert_eq!(moves.len(), 1);
    assert!(moves.iter().all(|m| m.right && !m.left));
    Ok(())
}

#[test]
fn device_info_is_recorded() -> TestResult {
    let line = MockSerialLine::new();
    let info = RawPacket {
        x_bits: 123_456,
        y_bits: 0x0205_0000,
        type_code: packet_types::DEVICE_INFO,
    };
    line.queue_chunk(info.to_frame().to_vec());
    let mut session = SerialSession::new(line.clone(), RecordingPointer::new());

    session.request_status(|_| {})?;
    let status = session.status();
    assert_eq!(status.serial_number, Some(123_456));
    assert_eq!(status.version, Some(FirmwareVersion::new(2, 5)));
    assert!(session.pointer().calls.is_empty());
    Ok(())
}

#[test]
fn calibrate_writes_toggle_command() -> TestResult {
    let line = MockSerialLine::new();
    let mut session = SerialSession::new(line.clone(), RecordingPointer::new());

    session.calibrate(true, |_| {})?;
    session.calibrate(false, |_| {})?;
    assert_eq!(line.written(), b"nwk1\rnwk0\r");
    Ok(())
}

#[test]
fn overflow_is_reported_and_stream_recovers() -> TestResult {
    let line = MockSerialLine::new();
    line.queue_chunk(vec![0x11; 256]);
    line.queue_chunk(RawPacket::from_coordinates(1.0, 2.0, 0x00).to_frame().to_vec());
    let mut session = SerialSession::new(line, RecordingPointer::new());

    let diagnostics = collect(&mut session)?;
    let severities: Vec<Severity> = diagnostics.iter().map(|d| d.severity).collect();
    assert_eq!(severities, vec![Severity::Warning, Severity::Info]);
    assert_eq!(session.framer().overflows(), 1);
    assert_eq!(session.pointer().moves().len(), 1);
    Ok(())
}

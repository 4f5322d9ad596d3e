//! Streaming frame extractor for the serial variant.
//!
//! Bytes are appended to a fixed 256-byte buffer while a single-pattern
//! matcher tracks how much of the footer has been seen. A completed footer
//! yields the first nine buffered bytes as the payload and empties the
//! buffer. If the buffer fills without a footer, all of it is dropped
//! (lossy resynchronisation) and scanning resumes with the next byte.

#![deny(static_mut_refs)]

use crate::serial::{FOOTER, PAYLOAD_LEN, RawPacket};
use tracing::{debug, warn};

/// Framer buffer size in bytes.
pub const FRAMER_CAPACITY: usize = 256;

/// Something the framer produced while consuming input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerOutput {
    Packet(RawPacket),
    /// The buffer filled without a footer; `discarded` bytes were dropped.
    Overflow { discarded: usize },
}

/// Per-connection framing state.
#[derive(Debug, Clone)]
pub struct SerialFramer {
    buffer: [u8; FRAMER_CAPACITY],
    len: usize,
    match_len: usize,
    packets: u64,
    overflows: u64,
}

impl SerialFramer {
    pub fn new() -> Self {
        Self {
            buffer: [0u8; FRAMER_CAPACITY],
            len: 0,
            match_len: 0,
            packets: 0,
            overflows: 0,
        }
    }

    /// Consume `data`, handing each output to `sink` as soon as it is found.
    pub fn feed<F>(&mut self, data: &[u8], mut sink: F)
    where
        F: FnMut(FramerOutput),
    {
        for &byte in data {
            if let Some(output) = self.push_byte(byte) {
                sink(output);
            }
        }
    }

    /// Consume `data` and collect every output in order.
    pub fn feed_collect(&mut self, data: &[u8]) -> Vec<FramerOutput> {
        let mut outputs = Vec::new();
        self.feed(data, |output| outputs.push(output));
        outputs
    }

    /// Consume a single byte.
    pub fn push_byte(&mut self, byte: u8) -> Option<FramerOutput> {
        // len < FRAMER_CAPACITY on entry: a full buffer is always flushed below.
        if let Some(slot) = self.buffer.get_mut(self.len) {
            *slot = byte;
            self.len += 1;
        }

        self.match_len = if FOOTER.get(self.match_len) == Some(&byte) {
            self.match_len + 1
        } else {
            0
        };

        if self.match_len == FOOTER.len() {
            let packet = self.take_packet();
            return Some(FramerOutput::Packet(packet));
        }

        if self.len == FRAMER_CAPACITY {
            let discarded = self.len;
            self.clear();
            self.overflows += 1;
            warn!("Overflow, resetting buffer ({discarded} bytes discarded)");
            return Some(FramerOutput::Overflow { discarded });
        }

        None
    }

    fn take_packet(&mut self) -> RawPacket {
        let body_len = self.len - FOOTER.len();
        if body_len != PAYLOAD_LEN {
            debug!(
                "Footer after {body_len} payload bytes (expected {PAYLOAD_LEN}); decoding leading bytes"
            );
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        let take = body_len.min(PAYLOAD_LEN);
        if let (Some(dst), Some(src)) = (payload.get_mut(..take), self.buffer.get(..take)) {
            dst.copy_from_slice(src);
        }

        self.clear();
        self.packets += 1;
        RawPacket::from_payload(&payload)
    }

    fn clear(&mut self) {
        self.len = 0;
        self.match_len = 0;
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.len
    }

    /// Footer bytes matched at the end of the buffer.
    pub fn partial_footer(&self) -> usize {
        self.match_len
    }

    /// Packets extracted since creation.
    pub fn packets_extracted(&self) -> u64 {
        self.packets
    }

    /// Overflow flushes since creation.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Drop buffered bytes and any partial footer match.
    pub fn reset(&mut self) {
        self.clear();
    }
}

impl Default for SerialFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::FRAME_LEN;

    fn frame(x: f32, y: f32, type_code: u8) -> [u8; FRAME_LEN] {
        RawPacket::from_coordinates(x, y, type_code).to_frame()
    }

    #[test]
    fn single_frame_is_extracted() {
        let mut framer = SerialFramer::new();
        let outputs = framer.feed_collect(&frame(100.0, 200.0, 0x01));

        assert_eq!(
            outputs,
            vec![FramerOutput::Packet(RawPacket::from_coordinates(
                100.0, 200.0, 0x01
            ))]
        );
        assert_eq!(framer.buffered(), 0);
        assert_eq!(framer.partial_footer(), 0);
        assert_eq!(framer.packets_extracted(), 1);
    }

    #[test]
    fn frame_split_across_feeds() {
        let bytes = frame(5.0, 6.0, 0x0B);
        let (head, tail) = bytes.split_at(11);
        let mut framer = SerialFramer::new();

        assert!(framer.feed_collect(head).is_empty());
        assert_eq!(framer.partial_footer(), 2);
        assert_eq!(framer.feed_collect(tail).len(), 1);
    }

    #[test]
    fn back_to_back_frames_in_one_feed() {
        let mut bytes = frame(1.0, 2.0, 0x00).to_vec();
        bytes.extend_from_slice(&frame(3.0, 4.0, 0x02));
        let mut framer = SerialFramer::new();

        let outputs = framer.feed_collect(&bytes);
        assert_eq!(
            outputs,
            vec![
                FramerOutput::Packet(RawPacket::from_coordinates(1.0, 2.0, 0x00)),
                FramerOutput::Packet(RawPacket::from_coordinates(3.0, 4.0, 0x02)),
            ]
        );
    }

    #[test]
    fn broken_partial_footer_then_full_footer() {
        let payload = RawPacket::from_coordinates(7.0, 8.0, 0x01).to_payload();
        let mut bytes = payload.to_vec();
        bytes.extend_from_slice(b"<EN");
        bytes.extend_from_slice(b"X<END>\r");
        let mut framer = SerialFramer::new();

        let outputs = framer.feed_collect(&bytes);
        assert_eq!(
            outputs,
            vec![FramerOutput::Packet(RawPacket::from_payload(&payload))]
        );
    }

    #[test]
    fn mismatch_on_footer_start_byte_resets_match() {
        // The '<' that breaks "<EN<" is not reused as the start of a new match.
        let mut framer = SerialFramer::new();
        let mut bytes = RawPacket::from_coordinates(0.0, 0.0, 0x01).to_payload().to_vec();
        bytes.extend_from_slice(b"<EN<END>\r");

        assert!(framer.feed_collect(&bytes).is_empty());
        assert_eq!(framer.partial_footer(), 0);
        assert_eq!(framer.buffered(), bytes.len());
    }

    #[test]
    fn footer_start_type_byte_does_not_prime_match() {
        let mut framer = SerialFramer::new();
        let mut bytes = RawPacket::from_coordinates(0.0, 0.0, b'<').to_payload().to_vec();
        bytes.extend_from_slice(FOOTER);

        assert!(framer.feed_collect(&bytes).is_empty());
        assert_eq!(framer.packets_extracted(), 0);
    }

    #[test]
    fn full_buffer_without_footer_overflows_once() {
        let mut framer = SerialFramer::new();
        let outputs = framer.feed_collect(&[0x55; FRAMER_CAPACITY]);

        assert_eq!(
            outputs,
            vec![FramerOutput::Overflow {
                discarded: FRAMER_CAPACITY
            }]
        );
        assert_eq!(framer.buffered(), 0);
        assert_eq!(framer.overflows(), 1);
    }

    #[test]
    fn overflow_discards_partial_footer() {
        let mut bytes = vec![0x55; FRAMER_CAPACITY - 3];
        bytes.extend_from_slice(b"<EN");
        bytes.extend_from_slice(b"D>\r");
        let mut framer = SerialFramer::new();

        let outputs = framer.feed_collect(&bytes);
        assert_eq!(
            outputs,
            vec![FramerOutput::Overflow {
                discarded: FRAMER_CAPACITY
            }]
        );
        assert_eq!(framer.buffered(), 3);
        assert_eq!(framer.partial_footer(), 0);
    }

    #[test]
    fn footer_completing_on_last_slot_is_a_frame() {
        let mut bytes = vec![0x11; FRAMER_CAPACITY - FOOTER.len()];
        bytes.extend_from_slice(FOOTER);
        let mut framer = SerialFramer::new();

        let outputs = framer.feed_collect(&bytes);
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs.first(), Some(FramerOutput::Packet(_))));
        assert_eq!(framer.overflows(), 0);
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let mut framer = SerialFramer::new();
        let mut bytes = vec![0x3F, 0x80];
        bytes.extend_from_slice(FOOTER);

        let outputs = framer.feed_collect(&bytes);
        assert_eq!(
            outputs,
            vec![FramerOutput::Packet(RawPacket {
                x_bits: 0x3F80_0000,
                y_bits: 0,
                type_code: 0
            })]
        );
    }

    #[test]
    fn reset_drops_pending_bytes() {
        let mut framer = SerialFramer::new();
        framer.feed_collect(b"abc<EN");
        framer.reset();

        assert_eq!(framer.buffered(), 0);
        assert!(framer.feed_collect(b"D>\r").is_empty());
    }
}

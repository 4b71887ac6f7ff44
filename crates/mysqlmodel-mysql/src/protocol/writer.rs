//! Payload builder and packet framing.

#![allow(clippy::cast_possible_truncation)]

use crate::protocol::{Command, MAX_PACKET_SIZE, PacketHeader};

/// A writer for MySQL protocol data.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u24_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-encoded integer, using the narrowest width.
    pub fn write_lenenc_int(&mut self, value: u64) {
        match value {
            0..=250 => self.write_u8(value as u8),
            251..=0xFFFF => {
                self.write_u8(0xFC);
                self.write_u16_le(value as u16);
            }
            0x1_0000..=0xFF_FFFF => {
                self.write_u8(0xFD);
                self.write_u24_le(value as u32);
            }
            _ => {
                self.write_u8(0xFE);
                self.write_u64_le(value);
            }
        }
    }

    pub fn write_lenenc_bytes(&mut self, data: &[u8]) {
        self.write_lenenc_int(data.len() as u64);
        self.buffer.extend_from_slice(data);
    }

    pub fn write_lenenc_string(&mut self, s: &str) {
        self.write_lenenc_bytes(s.as_bytes());
    }

    pub fn write_null_string(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn write_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }

    /// Frame the buffered payload starting at `sequence_id`.
    pub fn build_packet(&self, sequence_id: u8) -> Vec<u8> {
        frame(&self.buffer, sequence_id)
    }
}

/// Frame `payload` into one or more packets.
///
/// Payloads of `MAX_PACKET_SIZE` or more are split into full-size chunks
/// with consecutive sequence ids. A payload that ends exactly on a chunk
/// boundary is terminated by an empty packet.
pub fn frame(payload: &[u8], mut sequence_id: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + PacketHeader::SIZE);
    let mut last_len = 0;

    for chunk in payload.chunks(MAX_PACKET_SIZE) {
        let header = PacketHeader {
            payload_length: chunk.len() as u32,
            sequence_id,
        };
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(chunk);
        sequence_id = sequence_id.wrapping_add(1);
        last_len = chunk.len();
    }

    if payload.is_empty() || last_len == MAX_PACKET_SIZE {
        let header = PacketHeader {
            payload_length: 0,
            sequence_id,
        };
        out.extend_from_slice(&header.to_bytes());
    }
    out
}

/// A command byte followed by its body.
pub fn command_payload(command: Command, body: &[u8]) -> Vec<u8> {
    let mut writer = PacketWriter::with_capacity(1 + body.len());
    writer.write_u8(command as u8);
    writer.write_bytes(body);
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_integers() {
        let mut writer = PacketWriter::new();
        writer.write_u8(0x42);
        writer.write_u16_le(0x1234);
        writer.write_u24_le(0x0012_3456);
        writer.write_u32_le(0x1234_5678);
        assert_eq!(
            writer.as_bytes(),
            &[0x42, 0x34, 0x12, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn lenenc_int_widths() {
        let encode = |v: u64| {
            let mut writer = PacketWriter::new();
            writer.write_lenenc_int(v);
            writer.into_bytes()
        };
        assert_eq!(encode(0x42), [0x42]);
        assert_eq!(encode(250), [250]);
        assert_eq!(encode(251), [0xFC, 251, 0]);
        assert_eq!(encode(0x1234), [0xFC, 0x34, 0x12]);
        assert_eq!(encode(0x0012_3456), [0xFD, 0x56, 0x34, 0x12]);
        assert_eq!(
            encode(0x0807_0605_0403_0201),
            [0xFE, 1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn strings() {
        let mut writer = PacketWriter::new();
        writer.write_null_string("root");
        writer.write_lenenc_string("db");
        assert_eq!(writer.as_bytes(), b"root\0\x02db");
    }

    #[test]
    fn single_packet_framing() {
        let mut writer = PacketWriter::new();
        writer.write_bytes(b"hello");
        let packet = writer.build_packet(1);
        assert_eq!(&packet[..4], &[0x05, 0x00, 0x00, 0x01]);
        assert_eq!(&packet[4..], b"hello");
    }

    #[test]
    fn empty_payload_is_one_empty_packet() {
        assert_eq!(frame(&[], 3), [0, 0, 0, 3]);
    }

    #[test]
    fn framed_command() {
        let packet = frame(&command_payload(Command::Query, b"ROLLBACK"), 0);
        assert_eq!(&packet[..4], &[0x09, 0x00, 0x00, 0x00]);
        assert_eq!(packet[4], 0x03);
        assert_eq!(&packet[5..], b"ROLLBACK");
    }
}

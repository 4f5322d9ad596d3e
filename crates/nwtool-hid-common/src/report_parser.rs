//! Big-endian report parsing and building

use crate::{HidCommonError, HidCommonResult};

pub struct ReportParser<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buffer: data,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_u8(&mut self) -> HidCommonResult<u8> {
        let value = self
            .buffer
            .get(self.position)
            .copied()
            .ok_or_else(|| HidCommonError::InvalidReport("Unexpected end of data".to_string()))?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16_be(&mut self) -> HidCommonResult<u16> {
        let [a, b] = self.read_array::<2>()?;
        Ok(u16::from_be_bytes([a, b]))
    }

    pub fn read_u32_be(&mut self) -> HidCommonResult<u32> {
        Ok(u32::from_be_bytes(self.read_array::<4>()?))
    }

    pub fn read_f32_be(&mut self) -> HidCommonResult<f32> {
        Ok(f32::from_bits(self.read_u32_be()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> HidCommonResult<[u8; N]> {
        let end = self.position.saturating_add(N);
        let bytes = self
            .buffer
            .get(self.position..end)
            .ok_or_else(|| HidCommonError::InvalidReport("Unexpected end of data".to_string()))?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.position = end;
        Ok(out)
    }

    pub fn peek_u8(&self) -> HidCommonResult<u8> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or_else(|| HidCommonError::InvalidReport("Unexpected end of data".to_string()))
    }

    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.buffer.len());
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn slice(&self) -> &'a [u8] {
        self.buffer
    }
}

/// Fixed-size report writer; unwritten bytes stay zero.
pub struct ReportBuilder<const N: usize> {
    buffer: [u8; N],
    len: usize,
}

impl<const N: usize> ReportBuilder<N> {
    pub fn new() -> Self {
        Self {
            buffer: [0u8; N],
            len: 0,
        }
    }

    /// Append one byte; bytes past the report size are dropped.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        if let Some(slot) = self.buffer.get_mut(self.len) {
            *slot = value;
            self.len += 1;
        }
        self
    }

    pub fn write_u16_be(&mut self, value: u16) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32_be(&mut self, value: u32) -> &mut Self {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        for &byte in data {
            self.write_u8(byte);
        }
        self
    }

    pub fn into_inner(self) -> [u8; N] {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far (not the padded report size).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for ReportBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

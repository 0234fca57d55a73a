//! Sequential little-endian reader and writer.
//!
//! Messages themselves are random access through [`Blob`](crate::codec::Blob);
//! these cursors handle the sequential parts of the format, such as the
//! segment table at the front of a framed stream.

use crate::error::DecodeError;
use crate::limits::BYTES_PER_WORD;

// =============================================================================
// DECODING
// =============================================================================

/// Cursor over a byte slice with bounds checking.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4, context)?);
        Ok(u32::from_le_bytes(buf))
    }

    /// Skips to the next word boundary.
    pub fn align_to_word(&mut self, context: &'static str) -> Result<(), DecodeError> {
        let pad = (BYTES_PER_WORD - self.pos % BYTES_PER_WORD) % BYTES_PER_WORD;
        self.read_bytes(pad, context)?;
        Ok(())
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Append-only byte writer.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Creates a new writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a new writer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Pads with zeros to the next word boundary.
    pub fn pad_to_word(&mut self) {
        let len = self.buf.len().next_multiple_of(BYTES_PER_WORD);
        self.buf.resize(len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_roundtrip() {
        let mut writer = Writer::new();
        for v in [0u32, 1, 0xdead_beef, u32::MAX] {
            writer.write_u32(v);
        }

        let mut reader = Reader::new(writer.as_bytes());
        for v in [0u32, 1, 0xdead_beef, u32::MAX] {
            assert_eq!(reader.read_u32("test").unwrap(), v);
        }
        assert_eq!(reader.remaining_len(), 0);
    }

    #[test]
    fn test_padding() {
        let mut writer = Writer::new();
        writer.write_u32(7);
        writer.pad_to_word();
        assert_eq!(writer.len(), 8);
        writer.pad_to_word();
        assert_eq!(writer.len(), 8);

        let mut reader = Reader::new(writer.as_bytes());
        reader.read_u32("test").unwrap();
        reader.align_to_word("test").unwrap();
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_unexpected_eof() {
        let data = [0u8; 3];
        let mut reader = Reader::new(&data);
        let result = reader.read_u32("segment count");
        assert_eq!(result, Err(DecodeError::UnexpectedEof { context: "segment count" }));
    }
}

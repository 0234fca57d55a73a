//! Minimal single-segment message writer.
//!
//! Enough to lay out structs, lists, text and data by hand: allocate words,
//! fill in scalars and point at what was allocated. Offsets are absolute byte
//! offsets into the segment. Word 0 is reserved for the root pointer.

use crate::codec::message::frame_segment;
use crate::codec::pointer::{ElementSize, ListPointer, StructPointer};
use crate::error::EncodeError;
use crate::limits::{BITS_PER_WORD, BYTES_PER_WORD, MAX_LIST_ELEMENTS};

/// Location of an allocated struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructSlot {
    /// Absolute byte offset of the data section.
    pub offset: usize,
    pub data_words: u16,
    pub ptr_words: u16,
}

impl StructSlot {
    /// Absolute byte offset of pointer `index` in the pointer section.
    pub fn pointer(&self, index: u16) -> usize {
        self.offset + (usize::from(self.data_words) + usize::from(index)) * BYTES_PER_WORD
    }
}

/// Builds a single segment in memory.
///
/// Setters write into space that was previously allocated. Writes past the
/// end of the segment fail with [`EncodeError::OutOfBounds`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// Creates a segment holding only a null root pointer.
    pub fn new() -> Self {
        Self {
            buf: vec![0; BYTES_PER_WORD],
        }
    }

    /// Appends `words` zeroed words and returns their byte offset.
    pub fn alloc(&mut self, words: usize) -> usize {
        let offset = self.buf.len();
        self.buf.resize(offset + words * BYTES_PER_WORD, 0);
        offset
    }

    /// Returns the `len` bytes at `offset` for writing.
    fn window(&mut self, offset: usize, len: usize) -> Result<&mut [u8], EncodeError> {
        let size = self.buf.len();
        offset
            .checked_add(len)
            .and_then(|end| self.buf.get_mut(offset..end))
            .ok_or(EncodeError::OutOfBounds { offset, len, size })
    }

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), EncodeError> {
        self.window(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn set_u8(&mut self, offset: usize, value: u8) -> Result<(), EncodeError> {
        self.set_bytes(offset, &[value])
    }

    pub fn set_u16(&mut self, offset: usize, value: u16) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_u64(&mut self, offset: usize, value: u64) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_i8(&mut self, offset: usize, value: i8) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_i16(&mut self, offset: usize, value: i16) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_i32(&mut self, offset: usize, value: i32) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_i64(&mut self, offset: usize, value: i64) -> Result<(), EncodeError> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    pub fn set_f32(&mut self, offset: usize, value: f32) -> Result<(), EncodeError> {
        self.set_u32(offset, value.to_bits())
    }

    pub fn set_f64(&mut self, offset: usize, value: f64) -> Result<(), EncodeError> {
        self.set_u64(offset, value.to_bits())
    }

    /// Sets or clears bit `bit` of the byte at `byte_offset`.
    pub fn set_bit(&mut self, byte_offset: usize, bit: u8, value: bool) -> Result<(), EncodeError> {
        let mask = 1u8 << (bit & 7);
        let byte = &mut self.window(byte_offset, 1)?[0];
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        Ok(())
    }

    /// Word offset from the end of the pointer at `ptr_offset` to `target`.
    fn word_offset(ptr_offset: usize, target: usize) -> i32 {
        ((target as i64 - (ptr_offset + BYTES_PER_WORD) as i64) / BYTES_PER_WORD as i64) as i32
    }

    /// Writes a struct pointer at `ptr_offset` to an existing struct.
    pub fn set_struct_ptr(&mut self, ptr_offset: usize, slot: StructSlot) -> Result<(), EncodeError> {
        let ptr = StructPointer {
            offset: Self::word_offset(ptr_offset, slot.offset),
            data_words: slot.data_words,
            ptr_words: slot.ptr_words,
        };
        self.set_u64(ptr_offset, ptr.encode())
    }

    /// Writes a list pointer at `ptr_offset` to words starting at `target`.
    pub fn set_list_ptr(
        &mut self,
        ptr_offset: usize,
        target: usize,
        element_size: ElementSize,
        count: u32,
    ) -> Result<(), EncodeError> {
        if count > MAX_LIST_ELEMENTS {
            return Err(EncodeError::LengthExceedsLimit {
                field: "list elements",
                len: count as usize,
                max: MAX_LIST_ELEMENTS as usize,
            });
        }
        let ptr = ListPointer {
            offset: Self::word_offset(ptr_offset, target),
            element_size,
            count,
        };
        self.set_u64(ptr_offset, ptr.encode())
    }

    /// Allocates a struct without pointing at it.
    pub fn alloc_struct(&mut self, data_words: u16, ptr_words: u16) -> StructSlot {
        let offset = self.alloc(usize::from(data_words) + usize::from(ptr_words));
        StructSlot {
            offset,
            data_words,
            ptr_words,
        }
    }

    /// Allocates a struct and points the pointer at `ptr_offset` at it.
    pub fn init_struct(
        &mut self,
        ptr_offset: usize,
        data_words: u16,
        ptr_words: u16,
    ) -> Result<StructSlot, EncodeError> {
        self.window(ptr_offset, BYTES_PER_WORD)?;
        let slot = self.alloc_struct(data_words, ptr_words);
        self.set_struct_ptr(ptr_offset, slot)?;
        Ok(slot)
    }

    /// Allocates the root struct.
    pub fn init_root(&mut self, data_words: u16, ptr_words: u16) -> Result<StructSlot, EncodeError> {
        self.init_struct(0, data_words, ptr_words)
    }

    /// Allocates a non-composite list and returns the offset of its first
    /// element.
    pub fn init_list(
        &mut self,
        ptr_offset: usize,
        element_size: ElementSize,
        count: u32,
    ) -> Result<usize, EncodeError> {
        self.window(ptr_offset, BYTES_PER_WORD)?;
        let bits = u64::from(count)
            * (element_size.data_bits() + element_size.pointer_count() * BITS_PER_WORD);
        let words = bits.div_ceil(BITS_PER_WORD) as usize;
        let target = self.alloc(words);
        self.set_list_ptr(ptr_offset, target, element_size, count)?;
        Ok(target)
    }

    /// Allocates a composite list and returns the slot of each element.
    pub fn init_struct_list(
        &mut self,
        ptr_offset: usize,
        count: u32,
        data_words: u16,
        ptr_words: u16,
    ) -> Result<Vec<StructSlot>, EncodeError> {
        let per_element = usize::from(data_words) + usize::from(ptr_words);
        let words = per_element * count as usize;
        let word_count = u32::try_from(words).map_err(|_| EncodeError::LengthExceedsLimit {
            field: "list words",
            len: words,
            max: MAX_LIST_ELEMENTS as usize,
        })?;
        self.window(ptr_offset, BYTES_PER_WORD)?;
        let tag_offset = self.alloc(1 + words);
        let tag = StructPointer {
            offset: count as i32,
            data_words,
            ptr_words,
        };
        self.set_u64(tag_offset, tag.encode())?;
        self.set_list_ptr(ptr_offset, tag_offset, ElementSize::InlineComposite, word_count)?;

        Ok((0..count as usize)
            .map(|i| StructSlot {
                offset: tag_offset + (1 + i * per_element) * BYTES_PER_WORD,
                data_words,
                ptr_words,
            })
            .collect())
    }

    /// Writes NUL-terminated text and points `ptr_offset` at it.
    pub fn set_text(&mut self, ptr_offset: usize, text: &str) -> Result<(), EncodeError> {
        let target = self.init_list(ptr_offset, ElementSize::Byte, byte_count(text.len() + 1)?)?;
        self.set_bytes(target, text.as_bytes())
    }

    /// Writes a data blob and points `ptr_offset` at it.
    pub fn set_data(&mut self, ptr_offset: usize, data: &[u8]) -> Result<(), EncodeError> {
        let target = self.init_list(ptr_offset, ElementSize::Byte, byte_count(data.len())?)?;
        self.set_bytes(target, data)
    }

    /// Returns the segment bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Returns the segment framed for a stream.
    pub fn into_stream_bytes(self) -> Result<Vec<u8>, EncodeError> {
        frame_segment(&self.buf)
    }
}

fn byte_count(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::LengthExceedsLimit {
        field: "byte list",
        len,
        max: MAX_LIST_ELEMENTS as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::blob::Blob;
    use crate::codec::list::List;
    use crate::codec::message::Message;

    #[test]
    fn test_point_layout() {
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(2, 0).unwrap();
        builder.set_i64(root.offset, 1).unwrap();
        builder.set_i64(root.offset + 8, 2).unwrap();

        assert_eq!(
            builder.as_bytes(),
            &[
                0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, //
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
                0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ][..]
        );
    }

    #[test]
    fn test_text_and_data() {
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 2).unwrap();
        builder.set_text(root.pointer(0), "hi there").unwrap();
        builder.set_data(root.pointer(1), &[1, 2, 3]).unwrap();

        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let root: Blob<'_> = message.root_struct().unwrap().unwrap();
        assert_eq!(root.read_text(0).unwrap(), Some("hi there"));
        assert_eq!(root.read_data(8).unwrap(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_struct_list() {
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        let items = builder.init_struct_list(root.pointer(0), 3, 1, 0).unwrap();
        for (i, item) in items.iter().enumerate() {
            builder.set_u32(item.offset, (i as u32 + 1) * 10).unwrap();
        }

        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let root: Blob<'_> = message.root_struct().unwrap().unwrap();
        let list: List<'_, Blob<'_>> = root.read_list(0).unwrap().unwrap();
        let values: Vec<u32> = list
            .iter()
            .map(|item| item.and_then(|b| b.read_u32(0)))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_writes_past_end_fail() {
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 1).unwrap();
        let size = builder.as_bytes().len();
        assert_eq!(size, 24);

        assert_eq!(
            builder.set_u64(size - 4, 1),
            Err(EncodeError::OutOfBounds { offset: 20, len: 8, size: 24 })
        );
        assert!(builder.set_bit(size, 0, true).is_err());
        assert!(builder.set_bytes(usize::MAX, &[1]).is_err());
        assert!(builder.set_text(root.pointer(1), "x").is_err());
        assert!(builder.init_struct(size, 1, 0).is_err());
        // failed calls allocate nothing
        assert_eq!(builder.as_bytes().len(), size);
        assert!(builder.set_text(root.pointer(0), "x").is_ok());
    }

    #[test]
    fn test_bits() {
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_bit(root.offset + 1, 3, true).unwrap();
        builder.set_bit(root.offset + 1, 4, true).unwrap();
        builder.set_bit(root.offset + 1, 4, false).unwrap();
        assert_eq!(builder.as_bytes()[root.offset + 1], 0b1000);
    }
}

//! Pointer words.
//!
//! A pointer is one little-endian 64-bit word. The low two bits select the
//! kind; the remaining bits are laid out per kind:
//!
//! ```text
//! struct:     [ptr_words:16][data_words:16][offset:30 signed][00]
//! list:       [count:29][size:3]           [offset:30 signed][01]
//! far:        [segment:32]                 [pad:29][double:1][10]
//! capability: [index:32]                   [0:30]            [11]
//! ```
//!
//! Offsets count words from the end of the pointer word itself. An all-zero
//! word is the null pointer.

use std::fmt;

use crate::limits::{MAX_LIST_ELEMENTS, MAX_POINTER_OFFSET, MIN_POINTER_OFFSET};

/// The two tag bits of a pointer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Struct,
    List,
    Far,
    Capability,
}

impl PointerKind {
    /// Extracts the kind from the low two bits of a word.
    #[inline]
    pub fn from_word(word: u64) -> Self {
        match word & 0b11 {
            0 => PointerKind::Struct,
            1 => PointerKind::List,
            2 => PointerKind::Far,
            _ => PointerKind::Capability,
        }
    }

    /// Returns the two-bit tag.
    pub fn tag(self) -> u64 {
        match self {
            PointerKind::Struct => 0,
            PointerKind::List => 1,
            PointerKind::Far => 2,
            PointerKind::Capability => 3,
        }
    }
}

impl fmt::Display for PointerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PointerKind::Struct => "struct",
            PointerKind::List => "list",
            PointerKind::Far => "far",
            PointerKind::Capability => "capability",
        })
    }
}

/// Element size tag of a list pointer (bits 32..34).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementSize {
    Void,
    Bit,
    Byte,
    TwoBytes,
    FourBytes,
    EightBytes,
    Pointer,
    InlineComposite,
}

impl ElementSize {
    /// Decodes the 3-bit tag. Higher bits are ignored.
    pub fn from_tag(tag: u8) -> Self {
        match tag & 0b111 {
            0 => ElementSize::Void,
            1 => ElementSize::Bit,
            2 => ElementSize::Byte,
            3 => ElementSize::TwoBytes,
            4 => ElementSize::FourBytes,
            5 => ElementSize::EightBytes,
            6 => ElementSize::Pointer,
            _ => ElementSize::InlineComposite,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            ElementSize::Void => 0,
            ElementSize::Bit => 1,
            ElementSize::Byte => 2,
            ElementSize::TwoBytes => 3,
            ElementSize::FourBytes => 4,
            ElementSize::EightBytes => 5,
            ElementSize::Pointer => 6,
            ElementSize::InlineComposite => 7,
        }
    }

    /// Data bits per element. Zero for pointer and composite lists.
    pub fn data_bits(self) -> u64 {
        match self {
            ElementSize::Void | ElementSize::Pointer | ElementSize::InlineComposite => 0,
            ElementSize::Bit => 1,
            ElementSize::Byte => 8,
            ElementSize::TwoBytes => 16,
            ElementSize::FourBytes => 32,
            ElementSize::EightBytes => 64,
        }
    }

    /// Pointers per element. Composite lists carry theirs in the tag word.
    pub fn pointer_count(self) -> u64 {
        match self {
            ElementSize::Pointer => 1,
            _ => 0,
        }
    }
}

/// Sign-extends the 30-bit offset stored in bits 2..31.
#[inline]
fn signed_offset(word: u64) -> i32 {
    (word as u32 as i32) >> 2
}

/// Places a signed 30-bit word offset into bits 2..31.
#[inline]
fn offset_bits(offset: i32) -> u64 {
    u64::from((offset << 2) as u32)
}

/// Decoded struct pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructPointer {
    /// Words from the end of the pointer to the start of the data section.
    pub offset: i32,
    pub data_words: u16,
    pub ptr_words: u16,
}

impl StructPointer {
    /// Decodes the fields of a word. The tag bits are not checked.
    #[inline]
    pub fn decode(word: u64) -> Self {
        Self {
            offset: signed_offset(word),
            data_words: (word >> 32) as u16,
            ptr_words: (word >> 48) as u16,
        }
    }

    /// Encodes a struct pointer word.
    pub fn encode(&self) -> u64 {
        debug_assert!((MIN_POINTER_OFFSET..=MAX_POINTER_OFFSET).contains(&self.offset));
        offset_bits(self.offset)
            | (u64::from(self.data_words) << 32)
            | (u64::from(self.ptr_words) << 48)
    }

    /// Size of the pointed-to struct in words.
    pub fn total_words(&self) -> u64 {
        u64::from(self.data_words) + u64::from(self.ptr_words)
    }
}

/// Decoded list pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPointer {
    /// Words from the end of the pointer to the first element (or the tag
    /// word of a composite list).
    pub offset: i32,
    pub element_size: ElementSize,
    /// Element count, or the total word count for composite lists.
    pub count: u32,
}

impl ListPointer {
    #[inline]
    pub fn decode(word: u64) -> Self {
        Self {
            offset: signed_offset(word),
            element_size: ElementSize::from_tag((word >> 32) as u8),
            count: (word >> 35) as u32,
        }
    }

    pub fn encode(&self) -> u64 {
        debug_assert!((MIN_POINTER_OFFSET..=MAX_POINTER_OFFSET).contains(&self.offset));
        debug_assert!(self.count <= MAX_LIST_ELEMENTS);
        offset_bits(self.offset)
            | PointerKind::List.tag()
            | (u64::from(self.element_size.tag()) << 32)
            | (u64::from(self.count) << 35)
    }
}

/// Decoded far pointer. Recognized, never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarPointer {
    pub double_far: bool,
    /// Word offset of the landing pad within the target segment.
    pub landing_pad: u32,
    pub segment: u32,
}

impl FarPointer {
    pub fn decode(word: u64) -> Self {
        Self {
            double_far: word & 0b100 != 0,
            landing_pad: (word as u32) >> 3,
            segment: (word >> 32) as u32,
        }
    }
}

/// Decoded capability pointer. Recognized, never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityPointer {
    pub index: u32,
}

/// A decoded pointer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Null,
    Struct(StructPointer),
    List(ListPointer),
    Far(FarPointer),
    Capability(CapabilityPointer),
}

impl Pointer {
    /// Decodes a raw pointer word.
    pub fn decode(word: u64) -> Self {
        if word == 0 {
            return Pointer::Null;
        }
        match PointerKind::from_word(word) {
            PointerKind::Struct => Pointer::Struct(StructPointer::decode(word)),
            PointerKind::List => Pointer::List(ListPointer::decode(word)),
            PointerKind::Far => Pointer::Far(FarPointer::decode(word)),
            PointerKind::Capability => Pointer::Capability(CapabilityPointer {
                index: (word >> 32) as u32,
            }),
        }
    }

    /// Returns the pointer kind, or `None` for null.
    pub fn kind(&self) -> Option<PointerKind> {
        match self {
            Pointer::Null => None,
            Pointer::Struct(_) => Some(PointerKind::Struct),
            Pointer::List(_) => Some(PointerKind::List),
            Pointer::Far(_) => Some(PointerKind::Far),
            Pointer::Capability(_) => Some(PointerKind::Capability),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Pointer::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_pointer_fields() {
        let word = u64::from_le_bytes([0x90, 0x01, 0x00, 0x00, 0x02, 0x00, 0x04, 0x00]);
        assert_eq!(PointerKind::from_word(word), PointerKind::Struct);
        let ptr = StructPointer::decode(word);
        assert_eq!(ptr.offset, 100);
        assert_eq!(ptr.data_words, 2);
        assert_eq!(ptr.ptr_words, 4);
        assert_eq!(ptr.encode(), word);
    }

    #[test]
    fn test_list_pointer_fields() {
        let word = u64::from_le_bytes([0x01, 0x01, 0x00, 0x00, b'G', 0x06, 0x00, 0x00]);
        assert_eq!(PointerKind::from_word(word), PointerKind::List);
        let ptr = ListPointer::decode(word);
        assert_eq!(ptr.offset, 64);
        assert_eq!(ptr.element_size, ElementSize::InlineComposite);
        assert_eq!(ptr.count, 200);
        assert_eq!(ptr.encode(), word);
    }

    #[test]
    fn test_negative_offset() {
        let ptr = StructPointer { offset: -3, data_words: 1, ptr_words: 0 };
        let decoded = StructPointer::decode(ptr.encode());
        assert_eq!(decoded, ptr);
    }

    #[test]
    fn test_null_word() {
        assert_eq!(Pointer::decode(0), Pointer::Null);
        assert!(Pointer::decode(0).kind().is_none());
    }

    #[test]
    fn test_far_and_capability() {
        // landing pad 5, single far, segment 2
        let far = (5u64 << 3) | 0b010 | (2u64 << 32);
        assert_eq!(
            Pointer::decode(far),
            Pointer::Far(FarPointer { double_far: false, landing_pad: 5, segment: 2 })
        );

        let cap = 0b11 | (7u64 << 32);
        assert_eq!(Pointer::decode(cap), Pointer::Capability(CapabilityPointer { index: 7 }));
    }

    #[test]
    fn test_element_size_tags() {
        for tag in 0u8..8 {
            assert_eq!(ElementSize::from_tag(tag).tag(), tag);
        }
        assert_eq!(ElementSize::Pointer.pointer_count(), 1);
        assert_eq!(ElementSize::TwoBytes.data_bits(), 16);
    }
}

//! Lazy list views.
//!
//! A list is never materialized: [`RawList`] records where the elements start
//! and how far apart they are, and each element is decoded only when it is
//! asked for. Elements are independent, so they may be read in any order.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::blob::{Blob, StructSize};
use crate::codec::pointer::{ElementSize, PointerKind, StructPointer};
use crate::error::DecodeError;
use crate::limits::{BITS_PER_WORD, BYTES_PER_WORD};

/// Untyped list: element layout resolved from the list pointer (and the tag
/// word for composite lists).
#[derive(Debug, Clone, Copy)]
pub struct RawList<'a> {
    /// Rooted at the first element.
    blob: Blob<'a>,
    element_size: ElementSize,
    len: u32,
    step_bits: u64,
    data_words: u16,
    ptr_words: u16,
}

impl<'a> RawList<'a> {
    /// Resolves a list whose first word is at the base of `start`.
    pub(crate) fn resolve(
        start: Blob<'a>,
        element_size: ElementSize,
        count: u32,
    ) -> Result<Self, DecodeError> {
        if element_size == ElementSize::InlineComposite {
            return Self::resolve_composite(start, count);
        }

        let step_bits = element_size.data_bits() + element_size.pointer_count() * BITS_PER_WORD;
        let total_bytes = (u64::from(count) * step_bits).div_ceil(8);
        start.slice(0, total_bytes as usize)?;

        Ok(Self {
            blob: start,
            element_size,
            len: count,
            step_bits,
            data_words: (element_size.data_bits() / BITS_PER_WORD) as u16,
            ptr_words: element_size.pointer_count() as u16,
        })
    }

    /// Composite lists: `word_count` excludes the tag word, whose offset field
    /// holds the element count and whose sizes give the per-element stride.
    fn resolve_composite(start: Blob<'a>, word_count: u32) -> Result<Self, DecodeError> {
        let total_bytes = (word_count as usize + 1) * BYTES_PER_WORD;
        start.slice(0, total_bytes)?;

        let tag = start.read_u64(0)?;
        if PointerKind::from_word(tag) != PointerKind::Struct {
            return Err(DecodeError::MalformedCompositeList {
                context: "tag word is not a struct tag",
            });
        }
        let tag = StructPointer::decode(tag);
        if tag.offset < 0 {
            return Err(DecodeError::MalformedCompositeList {
                context: "negative element count",
            });
        }
        let len = tag.offset as u32;
        let words_per_element = tag.total_words();
        if u64::from(len) * words_per_element > u64::from(word_count) {
            return Err(DecodeError::MalformedCompositeList {
                context: "elements exceed list word count",
            });
        }

        Ok(Self {
            blob: start.shifted(BYTES_PER_WORD as i64)?,
            element_size: ElementSize::InlineComposite,
            len,
            step_bits: words_per_element * BITS_PER_WORD,
            data_words: tag.data_words,
            ptr_words: tag.ptr_words,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element_size(&self) -> ElementSize {
        self.element_size
    }

    /// Distance between consecutive elements in bits.
    pub fn step_bits(&self) -> u64 {
        self.step_bits
    }

    /// Data words per element (composite lists).
    pub fn data_words(&self) -> u16 {
        self.data_words
    }

    /// Pointer words per element (composite lists).
    pub fn ptr_words(&self) -> u16 {
        self.ptr_words
    }

    /// Blob rooted at the first element.
    pub fn blob(&self) -> Blob<'a> {
        self.blob
    }

    fn check_index(&self, index: u32) -> Result<(), DecodeError> {
        if index >= self.len {
            return Err(DecodeError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    /// Byte offset of element `index`, relative to [`RawList::blob`].
    pub fn element_offset(&self, index: u32) -> Result<usize, DecodeError> {
        self.check_index(index)?;
        Ok((u64::from(index) * self.step_bits / 8) as usize)
    }

    /// Reads element `index` of a bit list.
    pub fn read_bool(&self, index: u32) -> Result<bool, DecodeError> {
        self.check_index(index)?;
        let bit = u64::from(index) * self.step_bits;
        self.blob.read_bit((bit / 8) as usize, (bit % 8) as u8)
    }

    /// Blob rooted at struct element `index`. Composite elements carry the
    /// section sizes of the tag word.
    pub fn struct_element(&self, index: u32) -> Result<Blob<'a>, DecodeError> {
        let offset = self.element_offset(index)?;
        let element = self.blob.child(offset as i64)?;
        if self.element_size == ElementSize::InlineComposite {
            return Ok(element.with_struct_size(StructSize::new(self.data_words, self.ptr_words)));
        }
        Ok(element)
    }
}

/// Types that can be read as elements of a [`List`].
///
/// Pointer elements are `Option`s: a null element is `None`.
pub trait ListElement<'a>: Sized {
    /// Element size this type is encoded with.
    const ELEMENT_SIZE: ElementSize;

    /// Returns true if a list with elements of `size` can be read as `Self`.
    fn accepts(size: ElementSize) -> bool {
        size == Self::ELEMENT_SIZE
    }

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError>;
}

macro_rules! scalar_element {
    ($($ty:ty => $size:ident, $read:ident;)*) => {
        $(
            impl<'a> ListElement<'a> for $ty {
                const ELEMENT_SIZE: ElementSize = ElementSize::$size;

                #[inline]
                fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
                    list.blob().$read(list.element_offset(index)?)
                }
            }
        )*
    };
}

scalar_element! {
    u8 => Byte, read_u8;
    i8 => Byte, read_i8;
    u16 => TwoBytes, read_u16;
    i16 => TwoBytes, read_i16;
    u32 => FourBytes, read_u32;
    i32 => FourBytes, read_i32;
    f32 => FourBytes, read_f32;
    u64 => EightBytes, read_u64;
    i64 => EightBytes, read_i64;
    f64 => EightBytes, read_f64;
}

impl<'a> ListElement<'a> for () {
    const ELEMENT_SIZE: ElementSize = ElementSize::Void;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.check_index(index)
    }
}

impl<'a> ListElement<'a> for bool {
    const ELEMENT_SIZE: ElementSize = ElementSize::Bit;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.read_bool(index)
    }
}

impl<'a> ListElement<'a> for Option<&'a str> {
    const ELEMENT_SIZE: ElementSize = ElementSize::Pointer;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.blob().read_text(list.element_offset(index)?)
    }
}

impl<'a> ListElement<'a> for Option<&'a [u8]> {
    const ELEMENT_SIZE: ElementSize = ElementSize::Pointer;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.blob().read_data(list.element_offset(index)?)
    }
}

impl<'a, T: ListElement<'a>> ListElement<'a> for Option<List<'a, T>> {
    const ELEMENT_SIZE: ElementSize = ElementSize::Pointer;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.blob().read_list(list.element_offset(index)?)
    }
}

impl<'a> ListElement<'a> for Blob<'a> {
    const ELEMENT_SIZE: ElementSize = ElementSize::InlineComposite;

    fn read_element(list: &RawList<'a>, index: u32) -> Result<Self, DecodeError> {
        list.struct_element(index)
    }
}

/// Typed lazy list.
pub struct List<'a, T> {
    raw: RawList<'a>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for List<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for List<'_, T> {}

impl<T> fmt::Debug for List<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("raw", &self.raw).finish()
    }
}

impl<'a, T: ListElement<'a>> List<'a, T> {
    /// Wraps a raw list, checking that its element size fits `T`.
    pub fn new(raw: RawList<'a>) -> Result<Self, DecodeError> {
        if !T::accepts(raw.element_size()) {
            return Err(DecodeError::ElementSizeMismatch {
                context: "list",
                expected: T::ELEMENT_SIZE,
                found: raw.element_size(),
            });
        }
        Ok(Self {
            raw,
            marker: PhantomData,
        })
    }

    pub fn len(&self) -> u32 {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &RawList<'a> {
        &self.raw
    }

    /// Decodes element `index`.
    pub fn get(&self, index: u32) -> Result<T, DecodeError> {
        T::read_element(&self.raw, index)
    }

    /// Iterates over the elements, decoding each on demand.
    pub fn iter(&self) -> ListIter<'a, T> {
        ListIter {
            list: *self,
            front: 0,
            back: self.len(),
        }
    }
}

impl<'a, T: ListElement<'a>> IntoIterator for List<'a, T> {
    type Item = Result<T, DecodeError>;
    type IntoIter = ListIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: ListElement<'a>> IntoIterator for &List<'a, T> {
    type Item = Result<T, DecodeError>;
    type IntoIter = ListIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`List`].
pub struct ListIter<'a, T> {
    list: List<'a, T>,
    front: u32,
    back: u32,
}

impl<'a, T: ListElement<'a>> Iterator for ListIter<'a, T> {
    type Item = Result<T, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.list.get(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.back - self.front) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a, T: ListElement<'a>> DoubleEndedIterator for ListIter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.list.get(self.back))
    }
}

impl<'a, T: ListElement<'a>> ExactSizeIterator for ListIter<'a, T> {}

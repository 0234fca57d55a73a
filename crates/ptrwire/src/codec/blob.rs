//! Zero-copy view into a message segment.
//!
//! A [`Blob`] is a borrowed byte buffer plus a base offset. All reads take an
//! offset relative to the base, use little-endian byte order and are bounds
//! checked against the whole buffer. Dereferencing a pointer produces a new
//! `Blob` over the same buffer; nothing is ever copied or written.

use std::fmt;

use tracing::warn;

use crate::codec::list::{List, ListElement, RawList};
use crate::codec::pointer::{ElementSize, ListPointer, PointerKind, StructPointer};
use crate::error::DecodeError;
use crate::limits::{BYTES_PER_WORD, DEFAULT_NESTING_LIMIT};

/// Options applied while reading a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of pointer dereferences from the root.
    pub nesting_limit: u32,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            nesting_limit: DEFAULT_NESTING_LIMIT,
        }
    }
}

impl ReadOptions {
    /// Creates default read options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting limit.
    pub fn with_nesting_limit(mut self, limit: u32) -> Self {
        self.nesting_limit = limit;
        self
    }
}

/// Types constructible from a `Blob` rooted at a struct's data section.
pub trait FromBlob<'a>: Sized {
    fn from_blob(blob: Blob<'a>) -> Self;
}

impl<'a> FromBlob<'a> for Blob<'a> {
    fn from_blob(blob: Blob<'a>) -> Self {
        blob
    }
}

/// Section sizes of a struct as carried by its pointer (or by the tag word
/// of a composite list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructSize {
    pub data_words: u16,
    pub ptr_words: u16,
}

impl StructSize {
    pub const fn new(data_words: u16, ptr_words: u16) -> Self {
        Self {
            data_words,
            ptr_words,
        }
    }

    /// Size of the data section in bytes.
    pub const fn data_bytes(&self) -> usize {
        self.data_words as usize * BYTES_PER_WORD
    }

    /// Size of both sections in bytes.
    pub const fn total_bytes(&self) -> usize {
        (self.data_words as usize + self.ptr_words as usize) * BYTES_PER_WORD
    }
}

/// Read-only view of a message buffer rooted at `base`.
///
/// A blob reached through a struct pointer remembers the section sizes that
/// pointer declared. Field reads use them: data bytes past the data section
/// read as zero and pointer slots past the pointer section read as null, so a
/// struct written with an older or newer layout decodes consistently.
#[derive(Clone, Copy)]
pub struct Blob<'a> {
    buf: &'a [u8],
    base: usize,
    depth: u32,
    size: Option<StructSize>,
    options: ReadOptions,
}

impl fmt::Debug for Blob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.buf.len())
            .field("base", &self.base)
            .field("depth", &self.depth)
            .field("size", &self.size)
            .finish()
    }
}

impl<'a> Blob<'a> {
    /// Creates a blob over `buf` rooted at `base`.
    pub fn new(buf: &'a [u8], base: usize) -> Self {
        Self::with_options(buf, base, ReadOptions::default())
    }

    pub fn with_options(buf: &'a [u8], base: usize, options: ReadOptions) -> Self {
        Self {
            buf,
            base,
            depth: 0,
            size: None,
            options,
        }
    }

    /// Returns this blob with known struct section sizes.
    pub fn with_struct_size(mut self, size: StructSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Section sizes declared by the pointer this blob was reached through,
    /// or `None` when the blob was not reached through a struct pointer.
    pub fn struct_size(&self) -> Option<StructSize> {
        self.size
    }

    /// Returns the backing buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Returns the absolute offset this blob is rooted at.
    pub fn base(&self) -> usize {
        self.base
    }

    /// Returns how many dereferences led from the root to this blob.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    fn out_of_bounds(&self, offset: i64, len: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            offset,
            len,
            size: self.buf.len(),
        }
    }

    /// Resolves a signed relative range to an absolute start offset.
    fn locate(&self, rel: i64, len: usize) -> Result<usize, DecodeError> {
        let start = (self.base as i64).checked_add(rel).unwrap_or(i64::MIN);
        if start < 0 {
            return Err(self.out_of_bounds(start, len));
        }
        let start = start as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.buf.len() => Ok(start),
            _ => Err(self.out_of_bounds(start as i64, len)),
        }
    }

    /// Returns `len` bytes at `offset`.
    #[inline]
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let start = self
            .base
            .checked_add(offset)
            .ok_or_else(|| self.out_of_bounds(i64::MAX, len))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| self.out_of_bounds(start as i64, len))?;
        self.buf
            .get(start..end)
            .ok_or_else(|| self.out_of_bounds(start as i64, len))
    }

    #[inline]
    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    /// Blob at `rel` bytes from this one, same depth.
    pub(crate) fn shifted(&self, rel: i64) -> Result<Blob<'a>, DecodeError> {
        let base = self.locate(rel, 0)?;
        Ok(Blob { base, ..*self })
    }

    /// Blob at `rel` bytes from this one, one dereference deeper. The struct
    /// size is cleared; callers that reach a struct set it.
    pub(crate) fn child(&self, rel: i64) -> Result<Blob<'a>, DecodeError> {
        let depth = self.depth + 1;
        if depth > self.options.nesting_limit {
            return Err(DecodeError::NestingLimitExceeded {
                limit: self.options.nesting_limit,
            });
        }
        let base = self.locate(rel, 0)?;
        Ok(Blob {
            base,
            depth,
            size: None,
            ..*self
        })
    }

    // =========================================================================
    // SCALARS
    // =========================================================================

    #[inline]
    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_u64(&self, offset: usize) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_i8(&self, offset: usize) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_i16(&self, offset: usize) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_i32(&self, offset: usize) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_i64(&self, offset: usize) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.read_array(offset)?))
    }

    #[inline]
    pub fn read_f32(&self, offset: usize) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32(offset)?))
    }

    #[inline]
    pub fn read_f64(&self, offset: usize) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_u64(offset)?))
    }

    /// Reads a `width`-byte little-endian unsigned value, zero extended.
    ///
    /// Widths above 8 read only the first 8 bytes.
    pub fn read_bits(&self, offset: usize, width: usize) -> Result<u64, DecodeError> {
        let bytes = self.slice(offset, width.min(8))?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Reads bit `bit` (0 = least significant) of the byte at `byte_offset`.
    #[inline]
    pub fn read_bit(&self, byte_offset: usize, bit: u8) -> Result<bool, DecodeError> {
        Ok((self.read_u8(byte_offset)? >> (bit & 7)) & 1 == 1)
    }

    // =========================================================================
    // STRUCT SECTIONS
    // =========================================================================

    /// Returns true if `len` bytes at `offset` lie inside the data section.
    /// Blobs without a known struct size accept every offset.
    #[inline]
    pub fn in_data_section(&self, offset: usize, len: usize) -> bool {
        match self.size {
            Some(size) => offset
                .checked_add(len)
                .is_some_and(|end| end <= size.data_bytes()),
            None => true,
        }
    }

    /// Reads a `width`-byte data field. Fields past the data section read
    /// as zero.
    pub fn read_field_bits(&self, offset: usize, width: usize) -> Result<u64, DecodeError> {
        if !self.in_data_section(offset, width.min(8)) {
            return Ok(0);
        }
        self.read_bits(offset, width)
    }

    /// Reads a u16 data field, zero past the data section.
    #[inline]
    pub fn read_field_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        Ok(self.read_field_bits(offset, 2)? as u16)
    }

    /// Reads a bit data field, false past the data section.
    pub fn read_field_bit(&self, byte_offset: usize, bit: u8) -> Result<bool, DecodeError> {
        if !self.in_data_section(byte_offset, 1) {
            return Ok(false);
        }
        self.read_bit(byte_offset, bit)
    }

    /// Byte offset of pointer `index` of this struct.
    ///
    /// With a known struct size the pointer section starts after the data
    /// section the pointer declared, and indices past it yield `None`.
    /// Otherwise `data_words` (the schema's data section size) is used.
    pub fn pointer_slot(&self, index: u16, data_words: u16) -> Option<usize> {
        match self.size {
            Some(size) if index >= size.ptr_words => None,
            Some(size) => Some(size.data_bytes() + usize::from(index) * BYTES_PER_WORD),
            None => Some((usize::from(data_words) + usize::from(index)) * BYTES_PER_WORD),
        }
    }

    // =========================================================================
    // POINTERS
    // =========================================================================

    /// Reads the raw pointer word at `offset`.
    #[inline]
    pub fn read_ptr(&self, offset: usize) -> Result<u64, DecodeError> {
        self.read_u64(offset)
    }

    /// Returns true if the pointer word at `offset` is null.
    pub fn is_null_ptr(&self, offset: usize) -> Result<bool, DecodeError> {
        Ok(self.read_ptr(offset)? == 0)
    }

    /// Reads a pointer word and checks its kind.
    fn expect_kind(&self, offset: usize, expected: PointerKind) -> Result<u64, DecodeError> {
        let word = self.read_ptr(offset)?;
        let found = PointerKind::from_word(word);
        match found {
            _ if found == expected => Ok(word),
            PointerKind::Far | PointerKind::Capability => {
                warn!(kind = %found, offset = self.base + offset, "refusing to follow pointer");
                Err(DecodeError::UnsupportedPointer { kind: found })
            }
            _ => Err(DecodeError::MalformedPointer { expected, found }),
        }
    }

    /// Unpacks the struct pointer at `offset` into
    /// `(word_offset, data_words, ptr_words)`.
    pub fn unpack_ptr_struct(&self, offset: usize) -> Result<(i32, u16, u16), DecodeError> {
        let ptr = StructPointer::decode(self.expect_kind(offset, PointerKind::Struct)?);
        Ok((ptr.offset, ptr.data_words, ptr.ptr_words))
    }

    /// Returns the offset of the struct the pointer at `offset` refers to,
    /// relative to this blob, or `None` for a null pointer.
    pub fn deref_ptr_struct(&self, offset: usize) -> Result<Option<i64>, DecodeError> {
        if self.is_null_ptr(offset)? {
            return Ok(None);
        }
        let (word_offset, _, _) = self.unpack_ptr_struct(offset)?;
        Ok(Some(target(offset, word_offset)))
    }

    /// Unpacks the list pointer at `offset` into
    /// `(word_offset, element_size, element_count)`.
    pub fn unpack_ptr_list(&self, offset: usize) -> Result<(i32, ElementSize, u32), DecodeError> {
        let ptr = ListPointer::decode(self.expect_kind(offset, PointerKind::List)?);
        Ok((ptr.offset, ptr.element_size, ptr.count))
    }

    /// Returns the offset of the first list word (the tag word for composite
    /// lists), or `None` for a null pointer.
    pub fn deref_ptr_list(&self, offset: usize) -> Result<Option<i64>, DecodeError> {
        if self.is_null_ptr(offset)? {
            return Ok(None);
        }
        let (word_offset, _, _) = self.unpack_ptr_list(offset)?;
        Ok(Some(target(offset, word_offset)))
    }

    // =========================================================================
    // DEREFERENCING
    // =========================================================================

    /// Follows the struct pointer at `offset` and builds `T` from the target.
    pub fn read_struct<T: FromBlob<'a>>(&self, offset: usize) -> Result<Option<T>, DecodeError> {
        self.read_struct_with(offset, T::from_blob)
    }

    /// Follows the struct pointer at `offset` and passes the target blob to
    /// `ctor`. Null pointers yield `None` without calling `ctor`.
    pub fn read_struct_with<T, F>(&self, offset: usize, ctor: F) -> Result<Option<T>, DecodeError>
    where
        F: FnOnce(Blob<'a>) -> T,
    {
        if self.is_null_ptr(offset)? {
            return Ok(None);
        }
        let (word_offset, data_words, ptr_words) = self.unpack_ptr_struct(offset)?;
        let rel = target(offset, word_offset);
        let size = StructSize::new(data_words, ptr_words);
        self.locate(rel, size.total_bytes())?;
        Ok(Some(ctor(self.child(rel)?.with_struct_size(size))))
    }

    /// Follows the list pointer at `offset` without committing to an
    /// element type.
    pub fn read_raw_list(&self, offset: usize) -> Result<Option<RawList<'a>>, DecodeError> {
        if self.is_null_ptr(offset)? {
            return Ok(None);
        }
        let (word_offset, size, count) = self.unpack_ptr_list(offset)?;
        let start = self.child(target(offset, word_offset))?;
        RawList::resolve(start, size, count).map(Some)
    }

    /// Follows the list pointer at `offset` as a lazy list of `T`.
    pub fn read_list<T: ListElement<'a>>(
        &self,
        offset: usize,
    ) -> Result<Option<List<'a, T>>, DecodeError> {
        match self.read_raw_list(offset)? {
            Some(raw) => List::new(raw).map(Some),
            None => Ok(None),
        }
    }

    /// Follows the list pointer at `offset` as text.
    ///
    /// The text ends at the first NUL byte, or at the end of the list when
    /// no NUL is present.
    pub fn read_text(&self, offset: usize) -> Result<Option<&'a str>, DecodeError> {
        let Some(bytes) = self.read_byte_list(offset, "text")? else {
            return Ok(None);
        };
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        std::str::from_utf8(&bytes[..end])
            .map(Some)
            .map_err(|_| DecodeError::InvalidUtf8 { context: "text" })
    }

    /// Follows the list pointer at `offset` as an opaque byte blob.
    pub fn read_data(&self, offset: usize) -> Result<Option<&'a [u8]>, DecodeError> {
        self.read_byte_list(offset, "data")
    }

    fn read_byte_list(
        &self,
        offset: usize,
        context: &'static str,
    ) -> Result<Option<&'a [u8]>, DecodeError> {
        let Some(list) = self.read_raw_list(offset)? else {
            return Ok(None);
        };
        if list.element_size() != ElementSize::Byte {
            return Err(DecodeError::ElementSizeMismatch {
                context,
                expected: ElementSize::Byte,
                found: list.element_size(),
            });
        }
        list.blob().slice(0, list.len() as usize).map(Some)
    }
}

/// Byte offset of a pointer target: the word after the pointer plus the
/// signed word offset.
#[inline]
fn target(ptr_offset: usize, word_offset: i32) -> i64 {
    ptr_offset as i64 + BYTES_PER_WORD as i64 + i64::from(word_offset) * BYTES_PER_WORD as i64
}

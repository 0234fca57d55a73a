//! Typed field descriptors.
//!
//! Each descriptor captures where a field lives in a struct and how to decode
//! it. They are plain `Copy` values, so a hand-written struct wrapper can hold
//! them as constants and read fields with no per-call setup:
//!
//! ```
//! use ptrwire::codec::{Blob, FromBlob, PrimitiveField};
//!
//! struct Point<'a>(Blob<'a>);
//!
//! impl<'a> FromBlob<'a> for Point<'a> {
//!     fn from_blob(blob: Blob<'a>) -> Self {
//!         Point(blob)
//!     }
//! }
//!
//! const X: PrimitiveField<i64> = PrimitiveField::slot(0);
//! const Y: PrimitiveField<i64> = PrimitiveField::slot(1);
//!
//! let buf = [
//!     0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, // ptr to {x, y}
//!     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // x == 1
//!     0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // y == 2
//! ];
//! let p: Point<'_> = Blob::new(&buf, 0).read_struct(0).unwrap().unwrap();
//! assert_eq!(X.read(&p.0).unwrap(), 1);
//! assert_eq!(Y.read(&p.0).unwrap(), 2);
//! ```

use std::marker::PhantomData;

use crate::codec::blob::{Blob, FromBlob};
use crate::codec::list::{List, ListElement, RawList};
use crate::codec::pointer::Pointer;
use crate::error::DecodeError;
use crate::limits::BYTES_PER_WORD;

/// Fixed-width scalars stored in a struct's data section.
pub trait Primitive: Copy {
    /// Width in bytes.
    const WIDTH: usize;

    /// Reinterprets the low `WIDTH` bytes of `bits`.
    fn from_bits(bits: u64) -> Self;

    /// Returns the stored bit pattern, zero extended.
    fn to_bits(self) -> u64;
}

macro_rules! int_primitive {
    ($($ty:ty => $unsigned:ty;)*) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_bits(bits: u64) -> Self {
                    bits as $unsigned as $ty
                }

                #[inline]
                fn to_bits(self) -> u64 {
                    u64::from(self as $unsigned)
                }
            }
        )*
    };
}

int_primitive! {
    u8 => u8;
    u16 => u16;
    u32 => u32;
    u64 => u64;
    i8 => u8;
    i16 => u16;
    i32 => u32;
    i64 => u64;
}

impl Primitive for f32 {
    const WIDTH: usize = 4;

    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }

    fn to_bits(self) -> u64 {
        u64::from(f32::to_bits(self))
    }
}

impl Primitive for f64 {
    const WIDTH: usize = 8;

    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }
}

/// Location and expected value of a union discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionTag {
    /// Byte offset of the u16 discriminant in the data section.
    pub offset: usize,
    pub value: u16,
}

impl UnionTag {
    pub const fn new(offset: usize, value: u16) -> Self {
        Self { offset, value }
    }

    /// Returns true if this member is the active one.
    pub fn is_active(&self, blob: &Blob<'_>) -> Result<bool, DecodeError> {
        Ok(blob.read_field_u16(self.offset)? == self.value)
    }

    /// Fails with `UnionNotActive` unless this member is active.
    pub fn check(&self, blob: &Blob<'_>) -> Result<(), DecodeError> {
        let found = blob.read_field_u16(self.offset)?;
        if found != self.value {
            return Err(DecodeError::UnionNotActive {
                expected: self.value,
                found,
            });
        }
        Ok(())
    }
}

/// Integer or float field. The stored bits are XORed with the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveField<T> {
    offset: usize,
    default_bits: u64,
    tag: Option<UnionTag>,
    marker: PhantomData<fn() -> T>,
}

impl<T: Primitive> PrimitiveField<T> {
    /// Field at a byte offset with a zero default.
    pub const fn new(offset: usize) -> Self {
        Self {
            offset,
            default_bits: 0,
            tag: None,
            marker: PhantomData,
        }
    }

    /// Field at slot `index`, counted in units of the field's own width.
    pub const fn slot(index: usize) -> Self {
        Self::new(index * T::WIDTH)
    }

    pub fn with_default(mut self, default: T) -> Self {
        self.default_bits = default.to_bits();
        self
    }

    /// Field with a raw default bit pattern.
    pub const fn with_default_bits(mut self, bits: u64) -> Self {
        self.default_bits = bits;
        self
    }

    /// Makes the field a union member checked on every read.
    pub const fn in_union(mut self, tag: UnionTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn read(&self, blob: &Blob<'_>) -> Result<T, DecodeError> {
        if let Some(tag) = self.tag {
            tag.check(blob)?;
        }
        let stored = blob.read_field_bits(self.offset, T::WIDTH)?;
        Ok(T::from_bits(stored ^ self.default_bits))
    }
}

/// Single-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolField {
    pub byte: usize,
    pub bit: u8,
    pub default: bool,
}

impl BoolField {
    /// Field at bit offset `index` of the data section.
    pub const fn slot(index: usize) -> Self {
        Self {
            byte: index / 8,
            bit: (index % 8) as u8,
            default: false,
        }
    }

    pub const fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    pub fn read(&self, blob: &Blob<'_>) -> Result<bool, DecodeError> {
        Ok(blob.read_field_bit(self.byte, self.bit)? ^ self.default)
    }
}

/// Pointer `index` of a struct whose schema declares `data_words` data words.
///
/// The byte offset is resolved per blob: the struct pointer's own data
/// section size wins over the schema's, and an index past the pointer
/// section it declares reads as null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSlot {
    pub data_words: u16,
    pub index: u16,
}

impl PointerSlot {
    pub const fn new(data_words: u16, index: u16) -> Self {
        Self { data_words, index }
    }

    /// Byte offset assuming the schema's section sizes.
    pub const fn schema_offset(&self) -> usize {
        (self.data_words as usize + self.index as usize) * BYTES_PER_WORD
    }

    /// Byte offset of the pointer word in `blob`, or `None` when the struct
    /// has no such pointer on the wire.
    pub fn locate(&self, blob: &Blob<'_>) -> Option<usize> {
        blob.pointer_slot(self.index, self.data_words)
    }

    /// Returns true if the pointer exists and is non-null, without
    /// following it.
    pub fn is_set(&self, blob: &Blob<'_>) -> Result<bool, DecodeError> {
        match self.locate(blob) {
            Some(offset) => Ok(!blob.is_null_ptr(offset)?),
            None => Ok(false),
        }
    }

    /// Runs `read` on the pointer's offset; a missing pointer is `None`.
    pub(crate) fn follow<'a, T>(
        &self,
        blob: &Blob<'a>,
        read: impl FnOnce(&Blob<'a>, usize) -> Result<Option<T>, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        match self.locate(blob) {
            Some(offset) => read(blob, offset),
            None => Ok(None),
        }
    }
}

macro_rules! pointer_field_common {
    () => {
        /// Field at pointer `index` of a struct with `data_words` data words.
        pub const fn new(data_words: u16, index: u16) -> Self {
            Self::at(PointerSlot::new(data_words, index))
        }

        pub const fn slot(&self) -> PointerSlot {
            self.slot
        }

        /// Returns true if the pointer is non-null, without following it.
        pub fn has(&self, blob: &Blob<'_>) -> Result<bool, DecodeError> {
            self.slot.is_set(blob)
        }
    };
}

/// Text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextField {
    slot: PointerSlot,
}

impl TextField {
    pub const fn at(slot: PointerSlot) -> Self {
        Self { slot }
    }

    pointer_field_common!();

    pub fn read<'a>(&self, blob: &Blob<'a>) -> Result<Option<&'a str>, DecodeError> {
        self.slot.follow(blob, Blob::read_text)
    }
}

/// Data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataField {
    slot: PointerSlot,
}

impl DataField {
    pub const fn at(slot: PointerSlot) -> Self {
        Self { slot }
    }

    pointer_field_common!();

    pub fn read<'a>(&self, blob: &Blob<'a>) -> Result<Option<&'a [u8]>, DecodeError> {
        self.slot.follow(blob, Blob::read_data)
    }
}

/// Nested struct field decoded as `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructField<T> {
    slot: PointerSlot,
    marker: PhantomData<fn() -> T>,
}

impl<T> StructField<T> {
    pub const fn at(slot: PointerSlot) -> Self {
        Self {
            slot,
            marker: PhantomData,
        }
    }

    pointer_field_common!();

    pub fn read<'a>(&self, blob: &Blob<'a>) -> Result<Option<T>, DecodeError>
    where
        T: FromBlob<'a>,
    {
        self.slot.follow(blob, |b, offset| b.read_struct(offset))
    }
}

/// List field with elements of type `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListField<T> {
    slot: PointerSlot,
    marker: PhantomData<fn() -> T>,
}

impl<T> ListField<T> {
    pub const fn at(slot: PointerSlot) -> Self {
        Self {
            slot,
            marker: PhantomData,
        }
    }

    pointer_field_common!();

    pub fn read<'a>(&self, blob: &Blob<'a>) -> Result<Option<List<'a, T>>, DecodeError>
    where
        T: ListElement<'a>,
    {
        self.slot.follow(blob, |b, offset| b.read_list(offset))
    }
}

/// Enum field: a u16 ordinal mapped to `E`. Never absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumField<E> {
    offset: usize,
    marker: PhantomData<fn() -> E>,
}

impl<E: From<u16>> EnumField<E> {
    pub const fn new(offset: usize) -> Self {
        Self {
            offset,
            marker: PhantomData,
        }
    }

    /// Field at u16 slot `index`.
    pub const fn slot(index: usize) -> Self {
        Self::new(index * 2)
    }

    pub fn read(&self, blob: &Blob<'_>) -> Result<E, DecodeError> {
        blob.read_field_u16(self.offset).map(E::from)
    }
}

/// Void field. Reading never touches the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoidField;

impl VoidField {
    pub fn read(&self, _blob: &Blob<'_>) -> Result<(), DecodeError> {
        Ok(())
    }
}

/// Untyped pointer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyPointerField {
    slot: PointerSlot,
}

impl AnyPointerField {
    pub const fn at(slot: PointerSlot) -> Self {
        Self { slot }
    }

    pointer_field_common!();

    pub fn read<'a>(&self, blob: &Blob<'a>) -> AnyPointer<'a> {
        AnyPointer::at(*blob, self.slot.locate(blob))
    }
}

/// A pointer whose target type is decided by the caller.
///
/// A pointer the struct does not carry on the wire behaves as null.
#[derive(Debug, Clone, Copy)]
pub struct AnyPointer<'a> {
    blob: Blob<'a>,
    offset: Option<usize>,
}

impl<'a> AnyPointer<'a> {
    /// Pointer word at `offset` of `blob`.
    pub fn new(blob: Blob<'a>, offset: usize) -> Self {
        Self::at(blob, Some(offset))
    }

    pub(crate) fn at(blob: Blob<'a>, offset: Option<usize>) -> Self {
        Self { blob, offset }
    }

    /// Blob holding the pointer word.
    pub fn blob(&self) -> Blob<'a> {
        self.blob
    }

    /// Offset of the pointer word relative to [`AnyPointer::blob`], or
    /// `None` for a pointer outside the struct's pointer section.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    fn follow<T>(
        &self,
        read: impl FnOnce(&Blob<'a>, usize) -> Result<Option<T>, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        match self.offset {
            Some(offset) => read(&self.blob, offset),
            None => Ok(None),
        }
    }

    pub fn is_null(&self) -> Result<bool, DecodeError> {
        match self.offset {
            Some(offset) => self.blob.is_null_ptr(offset),
            None => Ok(true),
        }
    }

    /// Decodes the pointer word without following it.
    pub fn pointer(&self) -> Result<Pointer, DecodeError> {
        match self.offset {
            Some(offset) => Ok(Pointer::decode(self.blob.read_ptr(offset)?)),
            None => Ok(Pointer::Null),
        }
    }

    pub fn read_struct<T: FromBlob<'a>>(&self) -> Result<Option<T>, DecodeError> {
        self.follow(|b, offset| b.read_struct(offset))
    }

    pub fn read_list<T: ListElement<'a>>(&self) -> Result<Option<List<'a, T>>, DecodeError> {
        self.follow(|b, offset| b.read_list(offset))
    }

    pub fn read_raw_list(&self) -> Result<Option<RawList<'a>>, DecodeError> {
        self.follow(Blob::read_raw_list)
    }

    pub fn read_text(&self) -> Result<Option<&'a str>, DecodeError> {
        self.follow(Blob::read_text)
    }

    pub fn read_data(&self) -> Result<Option<&'a [u8]>, DecodeError> {
        self.follow(Blob::read_data)
    }
}

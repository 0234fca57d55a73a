//! Wire-level decoding.
//!
//! [`Blob`] is the zero-copy view everything else is built on; [`pointer`]
//! decodes pointer words, [`list`] provides lazy lists, [`field`] the typed
//! field descriptors and [`message`] the segment framing.

pub mod blob;
pub mod builder;
pub mod field;
pub mod list;
pub mod message;
pub mod pointer;
pub mod primitives;

pub use blob::{Blob, FromBlob, ReadOptions, StructSize};
pub use builder::{MessageBuilder, StructSlot};
pub use field::{
    AnyPointer, AnyPointerField, BoolField, DataField, EnumField, ListField, PointerSlot,
    Primitive, PrimitiveField, StructField, TextField, UnionTag, VoidField,
};
pub use list::{List, ListElement, ListIter, RawList};
pub use message::{frame_segment, Message};
pub use pointer::{
    CapabilityPointer, ElementSize, FarPointer, ListPointer, Pointer, PointerKind, StructPointer,
};
pub use primitives::{Reader, Writer};

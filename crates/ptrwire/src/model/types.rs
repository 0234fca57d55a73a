//! Field types and default literals.

use crate::codec::pointer::ElementSize;
use crate::model::NodeId;

/// Fixed-width numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl PrimitiveKind {
    /// Width in bytes.
    pub fn byte_width(self) -> usize {
        match self {
            PrimitiveKind::Int8 | PrimitiveKind::Uint8 => 1,
            PrimitiveKind::Int16 | PrimitiveKind::Uint16 => 2,
            PrimitiveKind::Int32 | PrimitiveKind::Uint32 | PrimitiveKind::Float32 => 4,
            PrimitiveKind::Int64 | PrimitiveKind::Uint64 | PrimitiveKind::Float64 => 8,
        }
    }

    /// List element size for a list of this type.
    pub fn element_size(self) -> ElementSize {
        match self.byte_width() {
            1 => ElementSize::Byte,
            2 => ElementSize::TwoBytes,
            4 => ElementSize::FourBytes,
            _ => ElementSize::EightBytes,
        }
    }
}

/// Declared type of a slot or list element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Bool,
    Primitive(PrimitiveKind),
    Text,
    Data,
    List(Box<Type>),
    Enum(NodeId),
    Struct(NodeId),
    AnyPointer,
}

impl Type {
    pub const INT8: Type = Type::Primitive(PrimitiveKind::Int8);
    pub const INT16: Type = Type::Primitive(PrimitiveKind::Int16);
    pub const INT32: Type = Type::Primitive(PrimitiveKind::Int32);
    pub const INT64: Type = Type::Primitive(PrimitiveKind::Int64);
    pub const UINT8: Type = Type::Primitive(PrimitiveKind::Uint8);
    pub const UINT16: Type = Type::Primitive(PrimitiveKind::Uint16);
    pub const UINT32: Type = Type::Primitive(PrimitiveKind::Uint32);
    pub const UINT64: Type = Type::Primitive(PrimitiveKind::Uint64);
    pub const FLOAT32: Type = Type::Primitive(PrimitiveKind::Float32);
    pub const FLOAT64: Type = Type::Primitive(PrimitiveKind::Float64);

    /// Convenience constructor for `List(Box::new(element))`.
    pub fn list(element: Type) -> Self {
        Type::List(Box::new(element))
    }

    /// Returns true for types stored in the pointer section.
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            Type::Text | Type::Data | Type::List(_) | Type::Struct(_) | Type::AnyPointer
        )
    }

    /// Size of one slot in bits. Slot offsets are multiples of this.
    pub fn slot_bits(&self) -> u64 {
        match self {
            Type::Void => 0,
            Type::Bool => 1,
            Type::Primitive(kind) => kind.byte_width() as u64 * 8,
            Type::Enum(_) => 16,
            Type::Text | Type::Data | Type::List(_) | Type::Struct(_) | Type::AnyPointer => 64,
        }
    }
}

/// A default value as declared in the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Void,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Enum(u16),
    Text(String),
    Data(Vec<u8>),
    /// Null pointer default for struct, list and anyPointer slots.
    Null,
}

impl Literal {
    /// Stored bit pattern of a numeric literal of kind `kind`, zero
    /// extended. `None` if the literal is of a different type.
    pub fn primitive_bits(&self, kind: PrimitiveKind) -> Option<u64> {
        let bits = match (self, kind) {
            (Literal::Int8(v), PrimitiveKind::Int8) => u64::from(*v as u8),
            (Literal::Int16(v), PrimitiveKind::Int16) => u64::from(*v as u16),
            (Literal::Int32(v), PrimitiveKind::Int32) => u64::from(*v as u32),
            (Literal::Int64(v), PrimitiveKind::Int64) => *v as u64,
            (Literal::Uint8(v), PrimitiveKind::Uint8) => u64::from(*v),
            (Literal::Uint16(v), PrimitiveKind::Uint16) => u64::from(*v),
            (Literal::Uint32(v), PrimitiveKind::Uint32) => u64::from(*v),
            (Literal::Uint64(v), PrimitiveKind::Uint64) => *v,
            (Literal::Float32(v), PrimitiveKind::Float32) => u64::from(v.to_bits()),
            (Literal::Float64(v), PrimitiveKind::Float64) => v.to_bits(),
            _ => return None,
        };
        Some(bits)
    }
}

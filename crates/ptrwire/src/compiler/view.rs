//! Dynamic views over compiled layouts.

use std::fmt;

use crate::codec::blob::Blob;
use crate::codec::field::AnyPointer;
use crate::codec::list::RawList;
use crate::codec::pointer::ElementSize;
use crate::compiler::accessor::ElementCodec;
use crate::compiler::{CompiledSchema, CompiledStruct};
use crate::error::DecodeError;
use crate::model::{NodeId, PrimitiveKind};

/// A decoded field or list element.
///
/// `'a` is the message buffer, `'s` the compiled schema.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a, 's> {
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
    Text(&'a str),
    Data(&'a [u8]),
    Enum(EnumValue<'s>),
    Struct(StructView<'a, 's>),
    List(ListView<'a, 's>),
    AnyPointer(AnyPointer<'a>),
}

impl<'a, 's> Value<'a, 's> {
    /// Reinterprets the low bits of `bits` as a value of `kind`.
    pub fn from_bits(kind: PrimitiveKind, bits: u64) -> Self {
        match kind {
            PrimitiveKind::Int8 => Value::Int8(bits as u8 as i8),
            PrimitiveKind::Int16 => Value::Int16(bits as u16 as i16),
            PrimitiveKind::Int32 => Value::Int32(bits as u32 as i32),
            PrimitiveKind::Int64 => Value::Int64(bits as i64),
            PrimitiveKind::Uint8 => Value::Uint8(bits as u8),
            PrimitiveKind::Uint16 => Value::Uint16(bits as u16),
            PrimitiveKind::Uint32 => Value::Uint32(bits as u32),
            PrimitiveKind::Uint64 => Value::Uint64(bits),
            PrimitiveKind::Float32 => Value::Float32(f32::from_bits(bits as u32)),
            PrimitiveKind::Float64 => Value::Float64(f64::from_bits(bits)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Any signed or unsigned integer that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            Value::Uint8(v) => Some(v.into()),
            Value::Uint16(v) => Some(v.into()),
            Value::Uint32(v) => Some(v.into()),
            Value::Uint64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Uint64(v) => Some(v),
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&'a [u8]> {
        match self {
            Value::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<EnumValue<'s>> {
        match self {
            Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<StructView<'a, 's>> {
        match self {
            Value::Struct(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<ListView<'a, 's>> {
        match self {
            Value::List(v) => Some(*v),
            _ => None,
        }
    }
}

/// An enum ordinal with its enumerant name, if the schema declares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue<'s> {
    pub type_id: NodeId,
    pub ordinal: u16,
    /// `None` for ordinals the schema does not know.
    pub enumerant: Option<&'s str>,
}

/// A struct read through its compiled layout.
#[derive(Clone, Copy)]
pub struct StructView<'a, 's> {
    blob: Blob<'a>,
    schema: &'s CompiledSchema,
    layout: &'s CompiledStruct,
}

impl fmt::Debug for StructView<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructView")
            .field("type", &self.layout.name)
            .field("blob", &self.blob)
            .finish()
    }
}

impl<'a, 's> StructView<'a, 's> {
    pub(crate) fn new(
        blob: Blob<'a>,
        schema: &'s CompiledSchema,
        layout: &'s CompiledStruct,
    ) -> Self {
        Self {
            blob,
            schema,
            layout,
        }
    }

    pub fn blob(&self) -> Blob<'a> {
        self.blob
    }

    pub fn layout(&self) -> &'s CompiledStruct {
        self.layout
    }

    /// Display name of the struct type.
    pub fn name(&self) -> &'s str {
        &self.layout.name
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &'s str> + 's {
        self.layout.fields.iter().map(|f| f.name.as_str())
    }

    /// Reads a field by name.
    ///
    /// Pointer fields yield `None` when null; nullable groups yield `None`
    /// when their null flag is set. Reading an inactive union member fails.
    pub fn get(&self, name: &str) -> Result<Option<Value<'a, 's>>, DecodeError> {
        let index = self.index_of(name)?;
        self.field_at(index)
    }

    /// Reads the field at position `index` of the layout.
    pub fn field_at(&self, index: usize) -> Result<Option<Value<'a, 's>>, DecodeError> {
        let field = self
            .layout
            .fields
            .get(index)
            .ok_or_else(|| DecodeError::NoSuchField {
                name: format!("#{index}"),
            })?;
        field.accessor.read(self.blob, self.schema)
    }

    /// Returns true if a pointer field is set. Only text, data, struct and
    /// list fields have a presence check.
    pub fn has(&self, name: &str) -> Result<bool, DecodeError> {
        let field = &self.layout.fields[self.index_of(name)?];
        let Some(slot) = field.presence else {
            return Err(DecodeError::NoPresenceCheck {
                name: name.to_string(),
            });
        };
        slot.is_set(&self.blob)
    }

    /// Name of the active union member, if the struct has a union and the
    /// discriminant names a known member.
    pub fn which(&self) -> Result<Option<&'s str>, DecodeError> {
        let Some(offset) = self.layout.discriminant else {
            return Ok(None);
        };
        let value = self.blob.read_field_u16(offset)?;
        Ok(self
            .layout
            .fields
            .iter()
            .find(|f| f.discriminant == Some(value))
            .map(|f| f.name.as_str()))
    }

    /// Returns true if `name` is the active union member.
    pub fn is_variant(&self, name: &str) -> Result<bool, DecodeError> {
        let field = &self.layout.fields[self.index_of(name)?];
        match field.accessor.union_tag() {
            Some(tag) => tag.is_active(&self.blob),
            None => Ok(false),
        }
    }

    fn index_of(&self, name: &str) -> Result<usize, DecodeError> {
        self.layout
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| DecodeError::NoSuchField {
                name: name.to_string(),
            })
    }
}

/// A list read through its compiled element codec.
#[derive(Clone, Copy)]
pub struct ListView<'a, 's> {
    raw: RawList<'a>,
    element: &'s ElementCodec,
    schema: &'s CompiledSchema,
}

impl fmt::Debug for ListView<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListView")
            .field("element", self.element)
            .field("len", &self.raw.len())
            .finish()
    }
}

impl<'a, 's> ListView<'a, 's> {
    /// Fails if the list's element size does not match `element`.
    pub(crate) fn new(
        raw: RawList<'a>,
        element: &'s ElementCodec,
        schema: &'s CompiledSchema,
    ) -> Result<Self, DecodeError> {
        let expected = element.element_size();
        let found = raw.element_size();
        if found != expected {
            return Err(DecodeError::ElementSizeMismatch {
                context: "list field",
                expected,
                found,
            });
        }
        Ok(Self {
            raw,
            element,
            schema,
        })
    }

    pub fn len(&self) -> u32 {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn element_size(&self) -> ElementSize {
        self.raw.element_size()
    }

    pub fn raw(&self) -> &RawList<'a> {
        &self.raw
    }

    /// Reads element `index`. Null pointer elements yield `None`.
    pub fn get(&self, index: u32) -> Result<Option<Value<'a, 's>>, DecodeError> {
        self.element.read(&self.raw, index, self.schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Option<Value<'a, 's>>, DecodeError>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}

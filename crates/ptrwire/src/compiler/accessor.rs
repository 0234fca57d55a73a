//! Compiled accessors.
//!
//! An [`Accessor`] is the generated read procedure for one field: every
//! offset, default and discriminant is resolved at compile time, so reading
//! is a single match plus the blob reads it names.

use crate::codec::blob::Blob;
use crate::codec::field::{AnyPointer, BoolField, PointerSlot, UnionTag};
use crate::codec::list::RawList;
use crate::codec::pointer::ElementSize;
use crate::compiler::view::{ListView, StructView, Value};
use crate::compiler::CompiledSchema;
use crate::error::DecodeError;
use crate::model::{NodeId, PrimitiveKind};

/// Read procedure for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// Always yields `Value::Void`; reads nothing.
    Void,
    Bool(BoolField),
    /// Numeric field. Carries its own union check.
    Primitive {
        kind: PrimitiveKind,
        offset: usize,
        default_bits: u64,
        tag: Option<UnionTag>,
    },
    Enum {
        offset: usize,
        target: NodeId,
    },
    Text {
        slot: PointerSlot,
    },
    Data {
        slot: PointerSlot,
    },
    Struct {
        slot: PointerSlot,
        target: usize,
    },
    List {
        slot: PointerSlot,
        element: ElementCodec,
    },
    AnyPointer {
        slot: PointerSlot,
    },
    /// View of a group over the same blob.
    Group {
        target: usize,
    },
    /// Group exposed as optional: `None` when its `isNull` member is set,
    /// else the value of its `value` member.
    NullableGroup {
        target: usize,
        is_null: usize,
        value: usize,
    },
    /// Checks the discriminant before running `inner`.
    Union {
        tag: UnionTag,
        inner: Box<Accessor>,
    },
}

impl Accessor {
    /// Pointer slot of text, data, struct and list fields.
    pub fn pointer_slot(&self) -> Option<PointerSlot> {
        match self {
            Accessor::Text { slot }
            | Accessor::Data { slot }
            | Accessor::Struct { slot, .. }
            | Accessor::List { slot, .. } => Some(*slot),
            Accessor::Union { inner, .. } => inner.pointer_slot(),
            _ => None,
        }
    }

    /// Returns the union tag checked by this accessor, if any.
    pub fn union_tag(&self) -> Option<UnionTag> {
        match self {
            Accessor::Primitive { tag, .. } => *tag,
            Accessor::Union { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub(crate) fn read<'a, 's>(
        &'s self,
        blob: Blob<'a>,
        schema: &'s CompiledSchema,
    ) -> Result<Option<Value<'a, 's>>, DecodeError> {
        match self {
            Accessor::Void => Ok(Some(Value::Void)),
            Accessor::Bool(field) => Ok(Some(Value::Bool(field.read(&blob)?))),
            Accessor::Primitive {
                kind,
                offset,
                default_bits,
                tag,
            } => {
                if let Some(tag) = tag {
                    tag.check(&blob)?;
                }
                let stored = blob.read_field_bits(*offset, kind.byte_width())?;
                Ok(Some(Value::from_bits(*kind, stored ^ default_bits)))
            }
            Accessor::Enum { offset, target } => {
                let ordinal = blob.read_field_u16(*offset)?;
                Ok(Some(Value::Enum(schema.enum_value(*target, ordinal))))
            }
            Accessor::Text { slot } => Ok(slot.follow(&blob, Blob::read_text)?.map(Value::Text)),
            Accessor::Data { slot } => Ok(slot.follow(&blob, Blob::read_data)?.map(Value::Data)),
            Accessor::Struct { slot, target } => {
                let layout = schema.layout_at(*target);
                let view = slot.follow(&blob, |b, offset| {
                    b.read_struct_with(offset, |s| StructView::new(s, schema, layout))
                })?;
                Ok(view.map(Value::Struct))
            }
            Accessor::List { slot, element } => match slot.follow(&blob, Blob::read_raw_list)? {
                Some(raw) => Ok(Some(Value::List(ListView::new(raw, element, schema)?))),
                None => Ok(None),
            },
            Accessor::AnyPointer { slot } => Ok(Some(Value::AnyPointer(AnyPointer::at(
                blob,
                slot.locate(&blob),
            )))),
            Accessor::Group { target } => Ok(Some(Value::Struct(StructView::new(
                blob,
                schema,
                schema.layout_at(*target),
            )))),
            Accessor::NullableGroup {
                target,
                is_null,
                value,
            } => {
                let group = StructView::new(blob, schema, schema.layout_at(*target));
                if let Some(Value::Bool(true)) = group.field_at(*is_null)? {
                    return Ok(None);
                }
                group.field_at(*value)
            }
            Accessor::Union { tag, inner } => {
                tag.check(&blob)?;
                inner.read(blob, schema)
            }
        }
    }
}

/// How to decode one element of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementCodec {
    Void,
    Bool,
    Primitive(PrimitiveKind),
    Enum(NodeId),
    Text,
    Data,
    /// Index of the element struct's layout.
    Struct(usize),
    List(Box<ElementCodec>),
    AnyPointer,
}

impl ElementCodec {
    /// Element size lists of this element are encoded with.
    pub fn element_size(&self) -> ElementSize {
        match self {
            ElementCodec::Void => ElementSize::Void,
            ElementCodec::Bool => ElementSize::Bit,
            ElementCodec::Primitive(kind) => kind.element_size(),
            ElementCodec::Enum(_) => ElementSize::TwoBytes,
            ElementCodec::Text
            | ElementCodec::Data
            | ElementCodec::List(_)
            | ElementCodec::AnyPointer => ElementSize::Pointer,
            ElementCodec::Struct(_) => ElementSize::InlineComposite,
        }
    }

    pub(crate) fn read<'a, 's>(
        &'s self,
        list: &RawList<'a>,
        index: u32,
        schema: &'s CompiledSchema,
    ) -> Result<Option<Value<'a, 's>>, DecodeError> {
        let blob = list.blob();
        match self {
            ElementCodec::Void => {
                list.element_offset(index)?;
                Ok(Some(Value::Void))
            }
            ElementCodec::Bool => Ok(Some(Value::Bool(list.read_bool(index)?))),
            ElementCodec::Primitive(kind) => {
                let bits = blob.read_bits(list.element_offset(index)?, kind.byte_width())?;
                Ok(Some(Value::from_bits(*kind, bits)))
            }
            ElementCodec::Enum(target) => {
                let ordinal = blob.read_u16(list.element_offset(index)?)?;
                Ok(Some(Value::Enum(schema.enum_value(*target, ordinal))))
            }
            ElementCodec::Text => Ok(blob.read_text(list.element_offset(index)?)?.map(Value::Text)),
            ElementCodec::Data => Ok(blob.read_data(list.element_offset(index)?)?.map(Value::Data)),
            ElementCodec::Struct(target) => {
                let element = list.struct_element(index)?;
                Ok(Some(Value::Struct(StructView::new(
                    element,
                    schema,
                    schema.layout_at(*target),
                ))))
            }
            ElementCodec::List(inner) => match blob.read_raw_list(list.element_offset(index)?)? {
                Some(raw) => Ok(Some(Value::List(ListView::new(raw, inner, schema)?))),
                None => Ok(None),
            },
            ElementCodec::AnyPointer => Ok(Some(Value::AnyPointer(AnyPointer::new(
                blob,
                list.element_offset(index)?,
            )))),
        }
    }
}

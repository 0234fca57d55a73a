//! Field accessor compiler.
//!
//! Turns schema nodes into [`CompiledStruct`] layouts: one [`Accessor`] per
//! field with every offset, default and discriminant resolved up front. All
//! schema errors surface here; reading through a compiled layout can only
//! fail on the message itself.
//!
//! ```
//! use ptrwire::codec::{Message, MessageBuilder};
//! use ptrwire::compiler::{compile, CompileOptions};
//! use ptrwire::model::{Schema, StructBuilder, Type};
//!
//! let schema = Schema::from_nodes([StructBuilder::new(1, "Point")
//!     .data_words(2)
//!     .slot("x", 0, Type::INT64)
//!     .slot("y", 1, Type::INT64)
//!     .build()])
//! .unwrap();
//! let compiled = compile(&schema, [1], CompileOptions::default()).unwrap();
//!
//! let mut builder = MessageBuilder::new();
//! let root = builder.init_root(2, 0).unwrap();
//! builder.set_i64(root.offset, 1).unwrap();
//! builder.set_i64(root.offset + 8, 2).unwrap();
//! let bytes = builder.into_bytes();
//!
//! let message = Message::from_segment(&bytes).unwrap();
//! let point = compiled.read_root(1, &message).unwrap().unwrap();
//! assert_eq!(point.get("x").unwrap().unwrap().as_i64(), Some(1));
//! assert_eq!(point.get("y").unwrap().unwrap().as_i64(), Some(2));
//! ```

pub mod accessor;
pub mod view;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::codec::blob::Blob;
use crate::codec::field::{BoolField, PointerSlot, UnionTag};
use crate::codec::message::Message;
use crate::error::{CompileError, DecodeError};
use crate::limits::BYTES_PER_WORD;
use crate::model::{Field, FieldKind, Group, Literal, NodeId, Schema, Slot, StructNode, Type};

pub use accessor::{Accessor, ElementCodec};
pub use view::{EnumValue, ListView, StructView, Value};

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for [`compile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Reject slots and discriminants that lie outside the section sizes
    /// declared by their struct.
    pub check_sections: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            check_sections: true,
        }
    }
}

impl CompileOptions {
    /// Creates default compile options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that skip section size checks, for schemas whose nodes do not
    /// carry accurate section sizes.
    pub fn lenient() -> Self {
        Self {
            check_sections: false,
        }
    }
}

// =============================================================================
// COMPILED LAYOUTS
// =============================================================================

/// Compiled accessors of one struct or group.
#[derive(Debug, Clone)]
pub struct CompiledStruct {
    id: NodeId,
    name: String,
    /// Byte offset of the union discriminant.
    discriminant: Option<usize>,
    fields: Vec<CompiledField>,
    by_name: FxHashMap<String, usize>,
}

impl CompiledStruct {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset of the union discriminant, if the struct has a union.
    pub fn discriminant_offset(&self) -> Option<usize> {
        self.discriminant
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }
}

/// One compiled field.
#[derive(Debug, Clone)]
pub struct CompiledField {
    name: String,
    discriminant: Option<u16>,
    accessor: Accessor,
    /// Pointer checked by `has`, for pointer-typed fields.
    presence: Option<PointerSlot>,
}

impl CompiledField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Union member value, if the field is part of a union.
    pub fn discriminant(&self) -> Option<u16> {
        self.discriminant
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// Returns true if the field supports a presence check.
    pub fn has_presence(&self) -> bool {
        self.presence.is_some()
    }
}

/// Enumerant names of an enum, by ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledEnum {
    pub id: NodeId,
    pub name: String,
    pub enumerants: Vec<String>,
}

/// Output of [`compile`]: every struct, group and enum reachable from the
/// roots.
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    structs: Vec<CompiledStruct>,
    index: FxHashMap<NodeId, usize>,
    enums: FxHashMap<NodeId, CompiledEnum>,
}

impl CompiledSchema {
    /// Number of compiled structs and groups.
    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    pub fn structs(&self) -> impl Iterator<Item = &CompiledStruct> {
        self.structs.iter()
    }

    /// Compiled layout of struct `id`.
    pub fn layout(&self, id: NodeId) -> Option<&CompiledStruct> {
        self.index.get(&id).map(|&i| &self.structs[i])
    }

    pub fn enum_type(&self, id: NodeId) -> Option<&CompiledEnum> {
        self.enums.get(&id)
    }

    pub(crate) fn layout_at(&self, index: usize) -> &CompiledStruct {
        &self.structs[index]
    }

    /// Views `blob` (rooted at a struct's data section) as struct `id`.
    pub fn view<'a>(&self, id: NodeId, blob: Blob<'a>) -> Result<StructView<'a, '_>, DecodeError> {
        let layout = self.layout(id).ok_or(DecodeError::NoSuchStruct { id })?;
        Ok(StructView::new(blob, self, layout))
    }

    /// Dereferences the root pointer of `message` as struct `id`.
    pub fn read_root<'a>(
        &self,
        id: NodeId,
        message: &Message<'a>,
    ) -> Result<Option<StructView<'a, '_>>, DecodeError> {
        let layout = self.layout(id).ok_or(DecodeError::NoSuchStruct { id })?;
        message
            .root()
            .read_struct_with(0, |blob| StructView::new(blob, self, layout))
    }

    /// Resolves an enum ordinal. Unknown ordinals keep `enumerant: None`.
    pub fn enum_value(&self, id: NodeId, ordinal: u16) -> EnumValue<'_> {
        let enumerant = self
            .enums
            .get(&id)
            .and_then(|e| e.enumerants.get(usize::from(ordinal)))
            .map(String::as_str);
        EnumValue {
            type_id: id,
            ordinal,
            enumerant,
        }
    }
}

// =============================================================================
// COMPILATION
// =============================================================================

/// Compiles `roots` and every node they reach.
pub fn compile(
    schema: &Schema,
    roots: impl IntoIterator<Item = NodeId>,
    options: CompileOptions,
) -> Result<CompiledSchema, CompileError> {
    let mut compiler = Compiler::new(schema, options);
    for id in roots {
        compiler.enqueue(id, None)?;
    }
    compiler.run()
}

/// Section sizes fields are laid out against. Groups use their parent's.
#[derive(Debug, Clone, Copy)]
struct Sections {
    data_words: u16,
    pointers: u16,
}

impl Sections {
    fn data_bytes(self) -> usize {
        usize::from(self.data_words) * BYTES_PER_WORD
    }
}

struct Compiler<'s> {
    schema: &'s Schema,
    options: CompileOptions,
    slots: Vec<Option<CompiledStruct>>,
    index: FxHashMap<NodeId, usize>,
    pending: Vec<(usize, NodeId, Sections)>,
    enums: FxHashMap<NodeId, CompiledEnum>,
}

impl<'s> Compiler<'s> {
    fn new(schema: &'s Schema, options: CompileOptions) -> Self {
        Self {
            schema,
            options,
            slots: Vec::new(),
            index: FxHashMap::default(),
            pending: Vec::new(),
            enums: FxHashMap::default(),
        }
    }

    /// Assigns struct `id` a layout index, scheduling it for compilation on
    /// first sight.
    fn enqueue(&mut self, id: NodeId, inherited: Option<Sections>) -> Result<usize, CompileError> {
        if let Some(&index) = self.index.get(&id) {
            return Ok(index);
        }
        let (_, node) = self.schema.struct_node(id)?;
        let sections = inherited.unwrap_or(Sections {
            data_words: node.data_word_count,
            pointers: node.pointer_count,
        });
        let index = self.slots.len();
        self.slots.push(None);
        self.index.insert(id, index);
        self.pending.push((index, id, sections));
        Ok(index)
    }

    fn register_enum(&mut self, id: NodeId) -> Result<(), CompileError> {
        if self.enums.contains_key(&id) {
            return Ok(());
        }
        let (node, en) = self.schema.enum_node(id)?;
        self.enums.insert(
            id,
            CompiledEnum {
                id,
                name: node.display_name.clone(),
                enumerants: en.enumerants.clone(),
            },
        );
        Ok(())
    }

    fn run(mut self) -> Result<CompiledSchema, CompileError> {
        while let Some((index, id, sections)) = self.pending.pop() {
            let compiled = self.compile_struct(id, sections)?;
            self.slots[index] = Some(compiled);
        }

        let structs: Vec<CompiledStruct> = self.slots.into_iter().flatten().collect();
        debug!(
            structs = structs.len(),
            enums = self.enums.len(),
            "compiled schema"
        );
        Ok(CompiledSchema {
            structs,
            index: self.index,
            enums: self.enums,
        })
    }

    fn compile_struct(
        &mut self,
        id: NodeId,
        sections: Sections,
    ) -> Result<CompiledStruct, CompileError> {
        let schema = self.schema;
        let (node, st) = schema.struct_node(id)?;
        let discriminant = st.discriminant_byte_offset();

        if let Some(offset) = discriminant {
            if self.options.check_sections && offset + 2 > sections.data_bytes() {
                return Err(CompileError::SlotOutsideSection {
                    field: format!("{}.<discriminant>", node.display_name),
                    section: "data",
                });
            }
        }

        let mut fields = Vec::with_capacity(st.fields.len());
        let mut by_name = FxHashMap::default();
        for field in &st.fields {
            let accessor = self.compile_field(field, st, sections)?;
            trace!(
                owner = %node.display_name,
                field = %field.name,
                accessor = ?accessor,
                "compiled field"
            );
            by_name.insert(field.name.clone(), fields.len());
            fields.push(CompiledField {
                name: field.name.clone(),
                discriminant: field.discriminant,
                presence: accessor.pointer_slot(),
                accessor,
            });
        }

        debug!(
            id = id,
            name = %node.display_name,
            fields = fields.len(),
            group = st.is_group,
            "compiled struct"
        );
        Ok(CompiledStruct {
            id,
            name: node.display_name.clone(),
            discriminant,
            fields,
            by_name,
        })
    }

    fn compile_field(
        &mut self,
        field: &Field,
        owner: &StructNode,
        sections: Sections,
    ) -> Result<Accessor, CompileError> {
        let tag = match (field.discriminant, owner.discriminant_byte_offset()) {
            (Some(value), Some(offset)) => Some(UnionTag::new(offset, value)),
            (Some(_), None) => {
                return Err(CompileError::DiscriminantWithoutUnion {
                    field: field.name.clone(),
                });
            }
            (None, _) => None,
        };

        let accessor = match &field.kind {
            FieldKind::Slot(slot) => self.compile_slot(&field.name, slot, sections, tag)?,
            FieldKind::Group(group) => self.compile_group(&field.name, group, sections)?,
        };

        // Primitive accessors check the tag themselves.
        Ok(match (tag, accessor) {
            (Some(_), accessor @ Accessor::Primitive { .. }) | (None, accessor) => accessor,
            (Some(tag), accessor) => Accessor::Union {
                tag,
                inner: Box::new(accessor),
            },
        })
    }

    fn compile_slot(
        &mut self,
        name: &str,
        slot: &Slot,
        sections: Sections,
        tag: Option<UnionTag>,
    ) -> Result<Accessor, CompileError> {
        if slot.had_explicit_default && !matches!(slot.ty, Type::Bool | Type::Primitive(_)) {
            return Err(CompileError::UnsupportedDefault {
                field: name.to_string(),
            });
        }

        let offset = slot.offset as usize;
        let bits = slot.ty.slot_bits();
        if bits > 0 && !slot.ty.is_pointer() {
            let end = (u64::from(slot.offset) + 1) * bits;
            self.check_data(name, end.div_ceil(8) as usize, sections)?;
        }

        let accessor = match &slot.ty {
            Type::Void => Accessor::Void,
            Type::Bool => {
                let default = match &slot.default {
                    None => false,
                    Some(Literal::Bool(v)) => *v,
                    Some(_) => {
                        return Err(CompileError::DefaultTypeMismatch {
                            field: name.to_string(),
                        });
                    }
                };
                Accessor::Bool(BoolField::slot(offset).with_default(default))
            }
            Type::Primitive(kind) => {
                let width = kind.byte_width();
                let default_bits = match &slot.default {
                    None => 0,
                    Some(literal) => literal.primitive_bits(*kind).ok_or_else(|| {
                        CompileError::DefaultTypeMismatch {
                            field: name.to_string(),
                        }
                    })?,
                };
                Accessor::Primitive {
                    kind: *kind,
                    offset: offset * width,
                    default_bits,
                    tag,
                }
            }
            Type::Enum(target) => {
                self.register_enum(*target)?;
                Accessor::Enum {
                    offset: offset * 2,
                    target: *target,
                }
            }
            Type::Text => Accessor::Text {
                slot: self.pointer_slot(name, slot.offset, sections)?,
            },
            Type::Data => Accessor::Data {
                slot: self.pointer_slot(name, slot.offset, sections)?,
            },
            Type::Struct(target) => {
                let slot = self.pointer_slot(name, slot.offset, sections)?;
                let target = self.enqueue(*target, None)?;
                Accessor::Struct { slot, target }
            }
            Type::List(element) => {
                let slot = self.pointer_slot(name, slot.offset, sections)?;
                let element = self.element_codec(element)?;
                Accessor::List { slot, element }
            }
            Type::AnyPointer => Accessor::AnyPointer {
                slot: self.pointer_slot(name, slot.offset, sections)?,
            },
        };
        Ok(accessor)
    }

    fn compile_group(
        &mut self,
        name: &str,
        group: &Group,
        sections: Sections,
    ) -> Result<Accessor, CompileError> {
        let target = self.enqueue(group.type_id, Some(sections))?;
        if !group.nullable {
            return Ok(Accessor::Group { target });
        }

        let invalid = |reason| CompileError::InvalidNullableGroup {
            field: name.to_string(),
            reason,
        };
        let (_, node) = self.schema.struct_node(group.type_id)?;
        let position = |member: &str| node.fields.iter().position(|f| f.name == member);

        let is_null = position("isNull").ok_or_else(|| invalid("missing isNull member"))?;
        match &node.fields[is_null].kind {
            FieldKind::Slot(Slot { ty: Type::Bool, .. }) => {}
            _ => return Err(invalid("isNull is not a bool slot")),
        }
        let value = position("value").ok_or_else(|| invalid("missing value member"))?;

        Ok(Accessor::NullableGroup {
            target,
            is_null,
            value,
        })
    }

    fn element_codec(&mut self, ty: &Type) -> Result<ElementCodec, CompileError> {
        let codec = match ty {
            Type::Void => ElementCodec::Void,
            Type::Bool => ElementCodec::Bool,
            Type::Primitive(kind) => ElementCodec::Primitive(*kind),
            Type::Enum(target) => {
                self.register_enum(*target)?;
                ElementCodec::Enum(*target)
            }
            Type::Text => ElementCodec::Text,
            Type::Data => ElementCodec::Data,
            Type::Struct(target) => ElementCodec::Struct(self.enqueue(*target, None)?),
            Type::List(inner) => ElementCodec::List(Box::new(self.element_codec(inner)?)),
            Type::AnyPointer => ElementCodec::AnyPointer,
        };
        Ok(codec)
    }

    /// Checks that a data slot ending at byte `end` fits the data section.
    fn check_data(&self, name: &str, end: usize, sections: Sections) -> Result<(), CompileError> {
        if self.options.check_sections && end > sections.data_bytes() {
            return Err(CompileError::SlotOutsideSection {
                field: name.to_string(),
                section: "data",
            });
        }
        Ok(())
    }

    /// Pointer slot `index`. The byte offset is resolved at read time from
    /// the struct pointer's sizes; the schema's data size is the fallback.
    fn pointer_slot(
        &self,
        name: &str,
        index: u32,
        sections: Sections,
    ) -> Result<PointerSlot, CompileError> {
        let out_of_range = index >= u32::from(sections.pointers);
        if (out_of_range && self.options.check_sections) || index > u32::from(u16::MAX) {
            return Err(CompileError::SlotOutsideSection {
                field: name.to_string(),
                section: "pointer",
            });
        }
        Ok(PointerSlot::new(sections.data_words, index as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::builder::MessageBuilder;
    use crate::codec::pointer::ElementSize;
    use crate::model::{enum_node, StructBuilder};

    const POINT: NodeId = 0x10;
    const RECT: NodeId = 0x11;

    fn point() -> crate::model::Node {
        StructBuilder::new(POINT, "Point")
            .data_words(2)
            .slot("x", 0, Type::INT64)
            .slot("y", 1, Type::INT64)
            .build()
    }

    fn rectangle() -> crate::model::Node {
        StructBuilder::new(RECT, "Rectangle")
            .pointers(2)
            .slot("topLeft", 0, Type::Struct(POINT))
            .slot("bottomRight", 1, Type::Struct(POINT))
            .build()
    }

    fn compile_nodes(
        nodes: impl IntoIterator<Item = crate::model::Node>,
        root: NodeId,
    ) -> Result<CompiledSchema, CompileError> {
        let schema = Schema::from_nodes(nodes)?;
        compile(&schema, [root], CompileOptions::default())
    }

    #[test]
    fn test_point() {
        let compiled = compile_nodes([point()], POINT).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(2, 0).unwrap();
        builder.set_i64(root.offset, 1).unwrap();
        builder.set_i64(root.offset + 8, 2).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();

        let view = compiled.read_root(POINT, &message).unwrap().unwrap();
        assert_eq!(view.name(), "Point");
        assert_eq!(view.get("x").unwrap().unwrap().as_i64(), Some(1));
        assert_eq!(view.get("y").unwrap().unwrap().as_i64(), Some(2));
        assert_eq!(view.field_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert!(matches!(view.get("z"), Err(DecodeError::NoSuchField { .. })));
    }

    #[test]
    fn test_rectangle() {
        let compiled = compile_nodes([point(), rectangle()], RECT).unwrap();
        assert_eq!(compiled.len(), 2);

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 2).unwrap();
        let top_left = builder.init_struct(root.pointer(0), 2, 0).unwrap();
        builder.set_i64(top_left.offset, -3).unwrap();
        builder.set_i64(top_left.offset + 8, 4).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();

        let rect = compiled.read_root(RECT, &message).unwrap().unwrap();
        let tl = rect.get("topLeft").unwrap().unwrap().as_struct().unwrap();
        assert_eq!(tl.name(), "Point");
        assert_eq!(tl.get("x").unwrap().unwrap().as_i64(), Some(-3));
        assert_eq!(tl.get("y").unwrap().unwrap().as_i64(), Some(4));

        // null pointer is absence, not an error
        assert!(rect.get("bottomRight").unwrap().is_none());
        assert!(rect.has("topLeft").unwrap());
        assert!(!rect.has("bottomRight").unwrap());
    }

    #[test]
    fn test_union_guard() {
        let shape = StructBuilder::new(1, "Shape")
            .data_words(2)
            .pointers(1)
            .union(2, 4)
            .field(Field::slot("circle", 0, Type::FLOAT64).in_union(0))
            .field(Field::slot("label", 0, Type::Text).in_union(1))
            .build();
        let compiled = compile_nodes([shape], 1).unwrap();
        assert_eq!(compiled.layout(1).unwrap().discriminant_offset(), Some(8));

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(2, 1).unwrap();
        builder.set_u16(root.offset + 8, 1).unwrap();
        builder.set_text(root.pointer(0), "sq").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        assert_eq!(
            view.get("circle").unwrap_err(),
            DecodeError::UnionNotActive { expected: 0, found: 1 }
        );
        assert_eq!(view.get("label").unwrap().unwrap().as_text(), Some("sq"));
        assert_eq!(view.which().unwrap(), Some("label"));
        assert!(view.is_variant("label").unwrap());
        assert!(!view.is_variant("circle").unwrap());
        assert!(matches!(
            compiled.layout(1).unwrap().field("label").unwrap().accessor(),
            Accessor::Union { .. }
        ));
    }

    #[test]
    fn test_defaults() {
        let node = StructBuilder::new(1, "Defaults")
            .data_words(1)
            .field(Field::slot("count", 0, Type::INT32).with_default(Literal::Int32(42)))
            .field(Field::slot("flag", 32, Type::Bool).with_default(Literal::Bool(true)))
            .field(Field::slot("small", 5, Type::INT8).with_default(Literal::Int8(-3)))
            .build();
        let compiled = compile_nodes([node], 1).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_i8(root.offset + 5, 5 ^ -3).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        assert!(matches!(view.get("count").unwrap(), Some(Value::Int32(42))));
        assert_eq!(view.get("flag").unwrap().unwrap().as_bool(), Some(true));
        assert!(matches!(view.get("small").unwrap(), Some(Value::Int8(5))));
        assert!(matches!(view.has("count"), Err(DecodeError::NoPresenceCheck { .. })));
    }

    #[test]
    fn test_unsupported_default() {
        let node = StructBuilder::new(1, "Bad")
            .pointers(1)
            .field(Field::slot("name", 0, Type::Text).with_default(Literal::Text("x".into())))
            .build();
        assert_eq!(
            compile_nodes([node], 1).unwrap_err(),
            CompileError::UnsupportedDefault {
                field: "name".to_string()
            }
        );

        let node = StructBuilder::new(1, "Bad")
            .data_words(1)
            .field(Field::slot("n", 0, Type::INT16).with_default(Literal::Uint16(1)))
            .build();
        assert!(matches!(
            compile_nodes([node], 1),
            Err(CompileError::DefaultTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nullable_group() {
        let maybe = StructBuilder::new(2, "Outer.maybe")
            .group()
            .slot("isNull", 0, Type::Bool)
            .slot("value", 1, Type::INT32)
            .build();
        let outer = StructBuilder::new(1, "Outer")
            .data_words(1)
            .field(Field::group("maybe", 2).nullable())
            .build();
        let compiled = compile_nodes([outer, maybe], 1).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_i32(root.offset + 4, 9).unwrap();
        let present = builder.clone().into_bytes();
        builder.set_bit(root.offset, 0, true).unwrap();
        let absent = builder.into_bytes();

        let message = Message::from_segment(&present).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();
        assert!(matches!(view.get("maybe").unwrap(), Some(Value::Int32(9))));

        let message = Message::from_segment(&absent).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();
        assert!(view.get("maybe").unwrap().is_none());
    }

    #[test]
    fn test_plain_group_shares_parent_sections() {
        let inner = StructBuilder::new(2, "Outer.extra")
            .group()
            .slot("a", 1, Type::UINT16)
            .slot("label", 0, Type::Text)
            .build();
        let outer = StructBuilder::new(1, "Outer")
            .data_words(1)
            .pointers(1)
            .group_field("extra", 2)
            .build();
        let compiled = compile_nodes([outer, inner], 1).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 1).unwrap();
        builder.set_u16(root.offset + 2, 77).unwrap();
        builder.set_text(root.pointer(0), "g").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        let extra = view.get("extra").unwrap().unwrap().as_struct().unwrap();
        assert_eq!(extra.get("a").unwrap().unwrap().as_i64(), Some(77));
        assert_eq!(extra.get("label").unwrap().unwrap().as_text(), Some("g"));
    }

    #[test]
    fn test_invalid_nullable_group() {
        let maybe = StructBuilder::new(2, "G")
            .group()
            .slot("isNull", 0, Type::UINT8)
            .slot("value", 1, Type::UINT8)
            .build();
        let outer = StructBuilder::new(1, "Outer")
            .data_words(1)
            .field(Field::group("maybe", 2).nullable())
            .build();
        assert!(matches!(
            compile_nodes([outer, maybe], 1),
            Err(CompileError::InvalidNullableGroup {
                reason: "isNull is not a bool slot",
                ..
            })
        ));

        let maybe = StructBuilder::new(2, "G").group().slot("isNull", 0, Type::Bool).build();
        let outer = StructBuilder::new(1, "Outer")
            .data_words(1)
            .field(Field::group("maybe", 2).nullable())
            .build();
        assert!(matches!(
            compile_nodes([outer, maybe], 1),
            Err(CompileError::InvalidNullableGroup {
                reason: "missing value member",
                ..
            })
        ));
    }

    #[test]
    fn test_lists() {
        let node = StructBuilder::new(1, "Polygon")
            .pointers(3)
            .slot("points", 0, Type::list(Type::Struct(POINT)))
            .slot("weights", 1, Type::list(Type::INT16))
            .slot("tags", 2, Type::list(Type::Text))
            .build();
        let compiled = compile_nodes([node, point()], 1).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 3).unwrap();
        let points = builder.init_struct_list(root.pointer(0), 2, 2, 0).unwrap();
        builder.set_i64(points[1].offset, 10).unwrap();
        builder.set_i64(points[1].offset + 8, 20).unwrap();
        let weights = builder.init_list(root.pointer(1), ElementSize::TwoBytes, 3).unwrap();
        builder.set_i16(weights + 4, -7).unwrap();
        let tags = builder.init_list(root.pointer(2), ElementSize::Pointer, 2).unwrap();
        builder.set_text(tags, "a").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        let points = view.get("points").unwrap().unwrap().as_list().unwrap();
        assert_eq!(points.len(), 2);
        let second = points.get(1).unwrap().unwrap().as_struct().unwrap();
        assert_eq!(second.get("y").unwrap().unwrap().as_i64(), Some(20));
        assert!(matches!(points.get(2), Err(DecodeError::IndexOutOfRange { .. })));

        let weights = view.get("weights").unwrap().unwrap().as_list().unwrap();
        let values: Vec<_> = weights
            .iter()
            .map(|v| v.unwrap().unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![0, 0, -7]);

        let tags = view.get("tags").unwrap().unwrap().as_list().unwrap();
        assert_eq!(tags.get(0).unwrap().unwrap().as_text(), Some("a"));
        assert!(tags.get(1).unwrap().is_none());
    }

    #[test]
    fn test_list_element_size_mismatch() {
        let node = StructBuilder::new(1, "L")
            .pointers(1)
            .slot("values", 0, Type::list(Type::INT64))
            .build();
        let compiled = compile_nodes([node], 1).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        builder.init_list(root.pointer(0), ElementSize::Byte, 4).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();
        assert!(matches!(
            view.get("values"),
            Err(DecodeError::ElementSizeMismatch { .. })
        ));
    }

    /// `struct Named { n @0 :UInt64 = 3; name @1 :Text; }`
    fn named() -> crate::model::Node {
        StructBuilder::new(1, "Named")
            .data_words(1)
            .pointers(1)
            .field(Field::slot("n", 0, Type::UINT64).with_default(Literal::Uint64(3)))
            .slot("name", 0, Type::Text)
            .build()
    }

    #[test]
    fn test_wire_struct_wider_than_schema() {
        let compiled = compile_nodes([named()], 1).unwrap();

        // written by a newer schema: an extra data word and an extra pointer
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(2, 2).unwrap();
        builder.set_u64(root.offset, 7 ^ 3).unwrap();
        builder.set_u64(root.offset + 8, u64::MAX).unwrap();
        builder.set_text(root.pointer(0), "hi").unwrap();
        builder.set_text(root.pointer(1), "newer").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        assert_eq!(view.get("n").unwrap().unwrap().as_u64(), Some(7));
        assert!(view.has("name").unwrap());
        assert_eq!(view.get("name").unwrap().unwrap().as_text(), Some("hi"));
    }

    #[test]
    fn test_wire_struct_narrower_than_schema() {
        let compiled = compile_nodes([named()], 1).unwrap();

        // no data section: `n` reads its default, not the pointer word
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        builder.set_text(root.pointer(0), "hi").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();
        assert_eq!(view.get("n").unwrap().unwrap().as_u64(), Some(3));
        assert_eq!(view.get("name").unwrap().unwrap().as_text(), Some("hi"));

        // no pointer section: `name` is absent, not the next object
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_u64(root.offset, 9 ^ 3).unwrap();
        let trailing = builder.alloc(1);
        builder.set_u64(trailing, u64::MAX).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();
        assert_eq!(view.get("n").unwrap().unwrap().as_u64(), Some(9));
        assert!(!view.has("name").unwrap());
        assert!(view.get("name").unwrap().is_none());
    }

    #[test]
    fn test_union_discriminant_past_wire_data_section() {
        let shape = StructBuilder::new(1, "Shape")
            .data_words(2)
            .union(2, 4)
            .field(Field::slot("circle", 0, Type::FLOAT64).in_union(0))
            .field(Field::slot("square", 0, Type::FLOAT64).in_union(1))
            .build();
        let compiled = compile_nodes([shape], 1).unwrap();

        // an older writer with a single data word: the discriminant reads 0
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_f64(root.offset, 2.5).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        assert_eq!(view.which().unwrap(), Some("circle"));
        assert_eq!(view.get("circle").unwrap().unwrap().as_f64(), Some(2.5));
        assert!(matches!(view.get("square"), Err(DecodeError::UnionNotActive { .. })));
    }

    #[test]
    fn test_composite_elements_use_tag_sizes() {
        let holder = StructBuilder::new(2, "Holder")
            .pointers(1)
            .slot("items", 0, Type::list(Type::Struct(1)))
            .build();
        let compiled = compile_nodes([holder, named()], 2).unwrap();

        // elements carry 2 data words and 1 pointer
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        let items = builder.init_struct_list(root.pointer(0), 2, 2, 1).unwrap();
        builder.set_u64(items[1].offset, 40 ^ 3).unwrap();
        builder.set_u64(items[1].offset + 8, u64::MAX).unwrap();
        builder.set_text(items[1].pointer(0), "second").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(2, &message).unwrap().unwrap();

        let items = view.get("items").unwrap().unwrap().as_list().unwrap();
        let first = items.get(0).unwrap().unwrap().as_struct().unwrap();
        assert_eq!(first.get("n").unwrap().unwrap().as_u64(), Some(3));
        assert!(!first.has("name").unwrap());
        let second = items.get(1).unwrap().unwrap().as_struct().unwrap();
        assert_eq!(second.get("n").unwrap().unwrap().as_u64(), Some(40));
        assert_eq!(second.get("name").unwrap().unwrap().as_text(), Some("second"));

        // elements with pointers only
        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        let items = builder.init_struct_list(root.pointer(0), 1, 0, 1).unwrap();
        builder.set_text(items[0].pointer(0), "only").unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(2, &message).unwrap().unwrap();

        let items = view.get("items").unwrap().unwrap().as_list().unwrap();
        let only = items.get(0).unwrap().unwrap().as_struct().unwrap();
        assert_eq!(only.get("n").unwrap().unwrap().as_u64(), Some(3));
        assert_eq!(only.get("name").unwrap().unwrap().as_text(), Some("only"));
    }

    #[test]
    fn test_enum() {
        let color = enum_node(5, "Color", ["red", "green", "blue"]);
        let node = StructBuilder::new(1, "Pixel")
            .data_words(1)
            .slot("color", 0, Type::Enum(5))
            .slot("other", 1, Type::Enum(5))
            .build();
        let compiled = compile_nodes([node, color], 1).unwrap();
        assert_eq!(compiled.enum_type(5).unwrap().enumerants.len(), 3);

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(1, 0).unwrap();
        builder.set_u16(root.offset, 1).unwrap();
        builder.set_u16(root.offset + 2, 9).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        let color = view.get("color").unwrap().unwrap().as_enum().unwrap();
        assert_eq!(color.enumerant, Some("green"));
        let other = view.get("other").unwrap().unwrap().as_enum().unwrap();
        assert_eq!(other.ordinal, 9);
        assert_eq!(other.enumerant, None);
    }

    #[test]
    fn test_void_and_any_pointer() {
        let node = StructBuilder::new(1, "Misc")
            .pointers(1)
            .slot("nothing", 0, Type::Void)
            .slot("payload", 0, Type::AnyPointer)
            .build();
        let schema = Schema::from_nodes([node, point()]).unwrap();
        let compiled = compile(&schema, [1, POINT], CompileOptions::default()).unwrap();

        let mut builder = MessageBuilder::new();
        let root = builder.init_root(0, 1).unwrap();
        let p = builder.init_struct(root.pointer(0), 2, 0).unwrap();
        builder.set_i64(p.offset, 5).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();
        let view = compiled.read_root(1, &message).unwrap().unwrap();

        assert!(matches!(view.get("nothing").unwrap(), Some(Value::Void)));
        let Some(Value::AnyPointer(any)) = view.get("payload").unwrap() else {
            panic!("expected any pointer");
        };
        let target: Blob<'_> = any.read_struct().unwrap().unwrap();
        let point = compiled.view(POINT, target).unwrap();
        assert_eq!(point.get("x").unwrap().unwrap().as_i64(), Some(5));
    }

    #[test]
    fn test_recursive_struct() {
        let node = StructBuilder::new(1, "Chain")
            .data_words(1)
            .pointers(1)
            .slot("value", 0, Type::UINT32)
            .slot("next", 0, Type::Struct(1))
            .build();
        let compiled = compile_nodes([node], 1).unwrap();
        assert_eq!(compiled.len(), 1);

        let mut builder = MessageBuilder::new();
        let first = builder.init_root(1, 1).unwrap();
        builder.set_u32(first.offset, 1).unwrap();
        let second = builder.init_struct(first.pointer(0), 1, 1).unwrap();
        builder.set_u32(second.offset, 2).unwrap();
        let bytes = builder.into_bytes();
        let message = Message::from_segment(&bytes).unwrap();

        let view = compiled.read_root(1, &message).unwrap().unwrap();
        let next = view.get("next").unwrap().unwrap().as_struct().unwrap();
        assert_eq!(next.get("value").unwrap().unwrap().as_u64(), Some(2));
        assert!(next.get("next").unwrap().is_none());
    }

    #[test]
    fn test_schema_errors() {
        let node = StructBuilder::new(1, "A")
            .data_words(1)
            .field(Field::slot("x", 0, Type::INT32).in_union(1))
            .build();
        assert!(matches!(
            compile_nodes([node], 1),
            Err(CompileError::DiscriminantWithoutUnion { .. })
        ));

        let node = StructBuilder::new(1, "A").pointers(1).slot("b", 0, Type::Struct(2)).build();
        assert_eq!(
            compile_nodes([node], 1).unwrap_err(),
            CompileError::UnknownNode { id: 2 }
        );

        let node = StructBuilder::new(1, "A").data_words(1).slot("e", 0, Type::Enum(1)).build();
        assert_eq!(
            compile_nodes([node], 1).unwrap_err(),
            CompileError::NotAnEnum { id: 1 }
        );
    }

    #[test]
    fn test_section_checks() {
        let node = StructBuilder::new(1, "A").data_words(1).slot("x", 1, Type::INT64).build();
        let schema = Schema::from_nodes([node]).unwrap();
        assert_eq!(
            compile(&schema, [1], CompileOptions::default()).unwrap_err(),
            CompileError::SlotOutsideSection {
                field: "x".to_string(),
                section: "data",
            }
        );
        assert!(compile(&schema, [1], CompileOptions::lenient()).is_ok());

        let node = StructBuilder::new(1, "A").slot("t", 0, Type::Text).build();
        assert!(matches!(
            compile_nodes([node], 1),
            Err(CompileError::SlotOutsideSection { section: "pointer", .. })
        ));
    }

    #[test]
    fn test_unknown_root_struct() {
        let compiled = compile_nodes([point()], POINT).unwrap();
        let buf = [0u8; 8];
        assert_eq!(
            compiled.view(9, Blob::new(&buf, 0)).unwrap_err(),
            DecodeError::NoSuchStruct { id: 9 }
        );
    }
}

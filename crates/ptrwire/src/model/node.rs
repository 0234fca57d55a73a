//! Schema nodes and field descriptors.

use crate::model::types::{Literal, Type};
use crate::model::NodeId;

/// A schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub display_name: String,
    pub kind: NodeKind,
}

/// The node kinds the accessor compiler understands.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Struct(StructNode),
    Enum(EnumNode),
}

impl Node {
    pub fn new_struct(id: NodeId, display_name: impl Into<String>, node: StructNode) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind: NodeKind::Struct(node),
        }
    }

    pub fn new_enum(id: NodeId, display_name: impl Into<String>, node: EnumNode) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            kind: NodeKind::Enum(node),
        }
    }

    pub fn as_struct(&self) -> Option<&StructNode> {
        match &self.kind {
            NodeKind::Struct(node) => Some(node),
            NodeKind::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumNode> {
        match &self.kind {
            NodeKind::Enum(node) => Some(node),
            NodeKind::Struct(_) => None,
        }
    }
}

/// Layout and fields of a struct (or group).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructNode {
    pub data_word_count: u16,
    pub pointer_count: u16,
    /// Number of union members; zero if the struct has no union.
    pub discriminant_count: u16,
    /// Offset of the u16 discriminant, in units of 16 bits.
    pub discriminant_offset: u32,
    /// Groups share their parent's sections.
    pub is_group: bool,
    pub fields: Vec<Field>,
}

impl StructNode {
    /// Byte offset of the discriminant, if the struct has a union.
    pub fn discriminant_byte_offset(&self) -> Option<usize> {
        (self.discriminant_count > 0).then(|| self.discriminant_offset as usize * 2)
    }
}

/// Enumerants of an enum, by ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumNode {
    pub enumerants: Vec<String>,
}

/// One field of a struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Union member value, if the field is part of the struct's union.
    pub discriminant: Option<u16>,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Slot(Slot),
    Group(Group),
}

/// A field stored at a fixed offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Offset in units of the type's slot width.
    pub offset: u32,
    pub ty: Type,
    pub default: Option<Literal>,
    pub had_explicit_default: bool,
}

/// A field whose members are those of another (group) node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub type_id: NodeId,
    /// Expose the group as optional: absent when its `isNull` flag is set.
    pub nullable: bool,
}

impl Field {
    /// Slot field with no default.
    pub fn slot(name: impl Into<String>, offset: u32, ty: Type) -> Self {
        Self {
            name: name.into(),
            discriminant: None,
            kind: FieldKind::Slot(Slot {
                offset,
                ty,
                default: None,
                had_explicit_default: false,
            }),
        }
    }

    /// Group field.
    pub fn group(name: impl Into<String>, type_id: NodeId) -> Self {
        Self {
            name: name.into(),
            discriminant: None,
            kind: FieldKind::Group(Group {
                type_id,
                nullable: false,
            }),
        }
    }

    /// Sets an explicit default. No effect on group fields.
    pub fn with_default(mut self, default: Literal) -> Self {
        if let FieldKind::Slot(slot) = &mut self.kind {
            slot.default = Some(default);
            slot.had_explicit_default = true;
        }
        self
    }

    /// Marks the field as union member `discriminant`.
    pub fn in_union(mut self, discriminant: u16) -> Self {
        self.discriminant = Some(discriminant);
        self
    }

    /// Marks a group field as nullable. No effect on slot fields.
    pub fn nullable(mut self) -> Self {
        if let FieldKind::Group(group) = &mut self.kind {
            group.nullable = true;
        }
        self
    }
}

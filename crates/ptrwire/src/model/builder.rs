//! Builder API for ergonomic schema construction.
//!
//! The schema front-end normally produces nodes; the builders make it easy to
//! assemble them by hand.
//!
//! # Example
//!
//! ```rust
//! use ptrwire::model::{Field, Literal, StructBuilder, Type};
//!
//! let point = StructBuilder::new(0x10, "Point")
//!     .data_words(2)
//!     .slot("x", 0, Type::INT64)
//!     .field(Field::slot("y", 1, Type::INT64).with_default(Literal::Int64(7)))
//!     .build();
//! assert_eq!(point.as_struct().unwrap().fields.len(), 2);
//! ```

use crate::model::node::{EnumNode, Field, Node, StructNode};
use crate::model::types::Type;
use crate::model::NodeId;

/// Builder for a struct or group node.
#[derive(Debug, Clone)]
pub struct StructBuilder {
    id: NodeId,
    display_name: String,
    node: StructNode,
}

impl StructBuilder {
    /// Creates a builder for an empty struct.
    pub fn new(id: NodeId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            node: StructNode::default(),
        }
    }

    /// Sets the data section size in words.
    pub fn data_words(mut self, words: u16) -> Self {
        self.node.data_word_count = words;
        self
    }

    /// Sets the pointer section size in words.
    pub fn pointers(mut self, count: u16) -> Self {
        self.node.pointer_count = count;
        self
    }

    /// Declares a union of `members` fields with its discriminant at
    /// `offset` (in 16-bit units).
    pub fn union(mut self, members: u16, offset: u32) -> Self {
        self.node.discriminant_count = members;
        self.node.discriminant_offset = offset;
        self
    }

    /// Marks the node as a group.
    pub fn group(mut self) -> Self {
        self.node.is_group = true;
        self
    }

    /// Adds a field.
    pub fn field(mut self, field: Field) -> Self {
        self.node.fields.push(field);
        self
    }

    /// Adds a slot field with no default.
    pub fn slot(self, name: impl Into<String>, offset: u32, ty: Type) -> Self {
        self.field(Field::slot(name, offset, ty))
    }

    /// Adds a group field.
    pub fn group_field(self, name: impl Into<String>, type_id: NodeId) -> Self {
        self.field(Field::group(name, type_id))
    }

    pub fn build(self) -> Node {
        Node::new_struct(self.id, self.display_name, self.node)
    }
}

/// Builds an enum node from its enumerant names in ordinal order.
pub fn enum_node<S: Into<String>>(
    id: NodeId,
    display_name: impl Into<String>,
    enumerants: impl IntoIterator<Item = S>,
) -> Node {
    Node::new_enum(
        id,
        display_name,
        EnumNode {
            enumerants: enumerants.into_iter().map(Into::into).collect(),
        },
    )
}

//! Schema model consumed by the accessor compiler.
//!
//! This is the already-parsed form of a schema: struct and enum nodes keyed by
//! id, each struct carrying its section sizes and ordered field descriptors.
//! How the nodes are produced is outside this crate.

pub mod builder;
pub mod node;
pub mod schema;
pub mod types;

/// Schema node identifier.
pub type NodeId = u64;

pub use builder::{enum_node, StructBuilder};
pub use node::{EnumNode, Field, FieldKind, Group, Node, NodeKind, Slot, StructNode};
pub use schema::Schema;
pub use types::{Literal, PrimitiveKind, Type};

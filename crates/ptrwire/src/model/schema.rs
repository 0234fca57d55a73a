//! Node registry.

use rustc_hash::FxHashMap;

use crate::error::CompileError;
use crate::model::node::{EnumNode, Node, StructNode};
use crate::model::NodeId;

/// All nodes of a parsed schema, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: FxHashMap<NodeId, Node>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from nodes, rejecting duplicate ids.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, CompileError> {
        let mut schema = Self::new();
        for node in nodes {
            schema.insert(node)?;
        }
        Ok(schema)
    }

    /// Adds a node.
    pub fn insert(&mut self, node: Node) -> Result<(), CompileError> {
        if self.nodes.contains_key(&node.id) {
            return Err(CompileError::DuplicateNode { id: node.id });
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, CompileError> {
        self.nodes.get(&id).ok_or(CompileError::UnknownNode { id })
    }

    pub fn struct_node(&self, id: NodeId) -> Result<(&Node, &StructNode), CompileError> {
        let node = self.node(id)?;
        let st = node.as_struct().ok_or(CompileError::NotAStruct { id })?;
        Ok((node, st))
    }

    pub fn enum_node(&self, id: NodeId) -> Result<(&Node, &EnumNode), CompileError> {
        let node = self.node(id)?;
        let en = node.as_enum().ok_or(CompileError::NotAnEnum { id })?;
        Ok((node, en))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let a = Node::new_struct(1, "A", StructNode::default());
        let b = Node::new_enum(1, "B", EnumNode::default());
        assert_eq!(
            Schema::from_nodes([a, b]).unwrap_err(),
            CompileError::DuplicateNode { id: 1 }
        );
    }

    #[test]
    fn test_lookup_kinds() {
        let schema = Schema::from_nodes([
            Node::new_struct(1, "A", StructNode::default()),
            Node::new_enum(2, "E", EnumNode::default()),
        ])
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.struct_node(1).is_ok());
        assert_eq!(schema.struct_node(2).unwrap_err(), CompileError::NotAStruct { id: 2 });
        assert_eq!(schema.enum_node(1).unwrap_err(), CompileError::NotAnEnum { id: 1 });
        assert_eq!(schema.node(3).unwrap_err(), CompileError::UnknownNode { id: 3 });
    }
}

//! Node identifiers and input records.
//!
//! Every node has two identities:
//! - A caller-facing `NodeKey` taken from the input data (integer or string)
//! - A dense `NodeId` assigned in insertion order, used to index every
//!   per-node buffer the engines produce

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable node identifier.
///
/// Ids are assigned densely from zero in insertion order and never change
/// for the lifetime of a graph. It wraps a u32 for efficient storage and
/// WebAssembly interop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the id as a buffer index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Identifier supplied by the caller.
///
/// Board game data keys nodes by numeric ids, hand-written data by names;
/// both deserialize transparently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeKey {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Int(id) => write!(f, "{id}"),
            NodeKey::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for NodeKey {
    fn from(id: i64) -> Self {
        NodeKey::Int(id)
    }
}

impl From<&str> for NodeKey {
    fn from(id: &str) -> Self {
        NodeKey::Str(id.to_owned())
    }
}

impl From<String> for NodeKey {
    fn from(id: String) -> Self {
        NodeKey::Str(id)
    }
}

/// A node as supplied by the caller.
///
/// Only the identifier is read. Everything else (name, category, player
/// counts, ratings) rides along untouched for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(alias = "ID")]
    pub id: NodeKey,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl NodeRecord {
    /// Create a record with no attributes.
    pub fn new(id: impl Into<NodeKey>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Attach an opaque attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "Node(42)");
    }

    #[test]
    fn test_node_id_conversion() {
        let id: NodeId = 123.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 123);
    }

    #[test]
    fn test_node_key_untagged() {
        let key: NodeKey = serde_json::from_str("17").unwrap();
        assert_eq!(key, NodeKey::Int(17));

        let key: NodeKey = serde_json::from_str("\"game1\"").unwrap();
        assert_eq!(key, NodeKey::from("game1"));
        assert_eq!(key.to_string(), "game1");
    }

    #[test]
    fn test_node_record_keeps_attributes() {
        let record: NodeRecord = serde_json::from_str(
            r#"{"ID": 13, "Name": "Catan", "category": "Strategy", "Average": 7.1}"#,
        )
        .unwrap();

        assert_eq!(record.id, NodeKey::Int(13));
        assert_eq!(record.attributes.len(), 3);
        assert_eq!(record.attributes["Name"], Value::from("Catan"));
    }

    #[test]
    fn test_node_record_builder() {
        let record = NodeRecord::new("chess").with_attribute("min_players", 2);
        assert_eq!(record.id, NodeKey::from("chess"));
        assert_eq!(record.attributes["min_players"], Value::from(2));
    }
}

//! Edge identifiers and input records.
//!
//! Edges are directed connections between nodes. Parallel edges and
//! self-loops are both allowed; each occurrence is its own edge.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeKey};

/// Stable edge identifier.
///
/// Assigned densely in the order edges were accepted into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Create a new EdgeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({})", self.0)
    }
}

impl From<u32> for EdgeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A resolved edge between two nodes of the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    /// Whether both endpoints are the same node.
    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// An edge as supplied by the caller, keyed by node identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeKey,
    pub target: NodeKey,
}

impl EdgeRecord {
    pub fn new(source: impl Into<NodeKey>, target: impl Into<NodeKey>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id() {
        let id = EdgeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "Edge(42)");
    }

    #[test]
    fn test_self_loop() {
        let edge = Edge {
            source: NodeId(3),
            target: NodeId(3),
        };
        assert!(edge.is_self_loop());

        let edge = Edge {
            source: NodeId(3),
            target: NodeId(4),
        };
        assert!(!edge.is_self_loop());
    }

    #[test]
    fn test_edge_record_json() {
        let record: EdgeRecord =
            serde_json::from_str(r#"{"source": "game1", "target": 2}"#).unwrap();
        assert_eq!(record, EdgeRecord::new("game1", 2i64));
    }
}

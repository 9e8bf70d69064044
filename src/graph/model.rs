//! Graph - immutable directed graph shared by the ranking and layout engines.
//!
//! Topology is stored in petgraph's StableGraph. Once construction finishes
//! the adjacency is flattened into CSR (Compressed Sparse Row) arrays for
//! outgoing and incoming edges, so both engines get O(1) slice lookups
//! without touching petgraph in their inner loops.

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Directed;
use serde::Deserialize;
use std::collections::HashMap;

use super::edge::{Edge, EdgeId, EdgeRecord};
use super::node::{NodeId, NodeKey, NodeRecord};
use crate::error::{GraphError, GraphResult, Warning};

/// The `{ "nodes": [...], "links": [...] }` document the UI loads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default, alias = "edges")]
    pub links: Vec<EdgeRecord>,
}

/// Compressed adjacency: `offsets` has node_count + 1 entries, and the
/// neighbors of node `i` are `items[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone, Default)]
struct Csr {
    offsets: Vec<u32>,
    items: Vec<NodeId>,
}

impl Csr {
    fn slice(&self, id: NodeId) -> &[NodeId] {
        let i = id.index();
        if i + 1 >= self.offsets.len() {
            return &[];
        }
        &self.items[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }
}

/// An immutable directed graph.
///
/// This struct owns:
/// - Graph topology via petgraph
/// - The caller's node records, in insertion order
/// - The accepted edges, in insertion order
/// - Outgoing and incoming CSR views
/// - Diagnostics produced while building
#[derive(Debug, Clone)]
pub struct Graph {
    /// The underlying graph structure.
    /// Nodes store their caller key, edges store their stable EdgeId.
    graph: StableGraph<NodeKey, EdgeId, Directed>,

    /// Map from caller key to stable NodeId
    key_to_id: HashMap<NodeKey, NodeId>,

    /// Node records indexed by NodeId
    nodes: Vec<NodeRecord>,

    /// Accepted edges indexed by EdgeId
    edges: Vec<Edge>,

    /// Outgoing targets per node
    outgoing: Csr,

    /// Incoming sources per node
    incoming: Csr,

    /// Non-fatal problems found while building
    warnings: Vec<Warning>,
}

impl Graph {
    /// Build a graph from caller records.
    ///
    /// Fails only when two nodes share an identifier. Edges whose endpoints
    /// cannot be resolved are dropped and reported through [`Graph::warnings`].
    pub fn build(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> GraphResult<Self> {
        let mut graph = StableGraph::with_capacity(nodes.len(), edges.len());
        let mut key_to_id = HashMap::with_capacity(nodes.len());

        for (i, record) in nodes.iter().enumerate() {
            let id = NodeId(i as u32);
            if key_to_id.insert(record.id.clone(), id).is_some() {
                return Err(GraphError::DuplicateNode(record.id.clone()));
            }
            graph.add_node(record.id.clone());
        }

        let mut accepted = Vec::with_capacity(edges.len());
        let mut warnings = Vec::new();

        for (index, record) in edges.into_iter().enumerate() {
            match (key_to_id.get(&record.source), key_to_id.get(&record.target)) {
                (Some(&source), Some(&target)) => {
                    let id = EdgeId(accepted.len() as u32);
                    graph.add_edge(
                        NodeIndex::new(source.index()),
                        NodeIndex::new(target.index()),
                        id,
                    );
                    accepted.push(Edge { source, target });
                }
                _ => warnings.push(Warning::UnresolvedEdge {
                    index,
                    source: record.source,
                    target: record.target,
                }),
            }
        }

        if !warnings.is_empty() {
            log::warn!(
                "dropped {} edge(s) with unresolved endpoints while building graph",
                warnings.len()
            );
            for warning in &warnings {
                log::debug!("{warning}");
            }
        }

        let node_count = nodes.len();
        let outgoing = Self::build_csr(&graph, node_count, |s, _| s, |_, t| t);
        let incoming = Self::build_csr(&graph, node_count, |_, t| t, |s, _| s);

        log::debug!(
            "built graph with {} nodes and {} edges",
            node_count,
            accepted.len()
        );

        Ok(Self {
            graph,
            key_to_id,
            nodes,
            edges: accepted,
            outgoing,
            incoming,
            warnings,
        })
    }

    /// Build a graph from a `{ "nodes": [...], "links": [...] }` document.
    pub fn from_data(data: GraphData) -> GraphResult<Self> {
        Self::build(data.nodes, data.links)
    }

    /// Parse and build a graph from JSON text.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        let data: GraphData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    /// Build a CSR view grouped by `row(source, target)` holding
    /// `item(source, target)`. Edges keep their insertion order within a row.
    fn build_csr(
        graph: &StableGraph<NodeKey, EdgeId, Directed>,
        node_count: usize,
        row: impl Fn(usize, usize) -> usize,
        item: impl Fn(usize, usize) -> usize,
    ) -> Csr {
        let mut refs: Vec<_> = graph
            .edge_references()
            .map(|e| (*e.weight(), e.source().index(), e.target().index()))
            .collect();
        refs.sort_by_key(|&(id, _, _)| id.0);

        let mut offsets = vec![0u32; node_count + 1];

        // Count edges per row
        for &(_, s, t) in &refs {
            offsets[row(s, t) + 1] += 1;
        }

        // Prefix sum
        for i in 1..=node_count {
            offsets[i] += offsets[i - 1];
        }

        let mut items = vec![NodeId(0); refs.len()];
        let mut cursor = offsets[..node_count].to_vec();
        for &(_, s, t) in &refs {
            let r = row(s, t);
            items[cursor[r] as usize] = NodeId(item(s, t) as u32);
            cursor[r] += 1;
        }

        Csr { offsets, items }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate node ids in insertion order.
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Node records in insertion order.
    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    /// Get a node's record.
    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.index())
    }

    /// Get a node's caller key.
    pub fn key(&self, id: NodeId) -> Option<&NodeKey> {
        self.graph.node_weight(NodeIndex::new(id.index()))
    }

    /// Resolve a caller key to its node id.
    pub fn node_id(&self, key: &NodeKey) -> Option<NodeId> {
        self.key_to_id.get(key).copied()
    }

    /// Whether the id belongs to this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    // =========================================================================
    // Edges
    // =========================================================================

    /// Get the number of accepted edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Accepted edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Get an edge by id.
    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.edges.get(id.0 as usize).copied()
    }

    // =========================================================================
    // Adjacency
    // =========================================================================

    /// Targets of a node's outgoing edges, one entry per edge.
    pub fn outgoing(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.slice(id)
    }

    /// Sources of a node's incoming edges, one entry per edge.
    pub fn incoming(&self, id: NodeId) -> &[NodeId] {
        self.incoming.slice(id)
    }

    /// Number of outgoing edges, counting parallel edges and self-loops.
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.outgoing(id).len()
    }

    /// Number of incoming edges, counting parallel edges and self-loops.
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.incoming(id).len()
    }

    /// Distinct neighbors in either direction, excluding the node itself.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut neighbors: Vec<NodeId> = self
            .outgoing(id)
            .iter()
            .chain(self.incoming(id))
            .copied()
            .filter(|&n| n != id)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Non-fatal problems found while building.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of input edges that were dropped.
    pub fn dropped_edge_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::UnresolvedEdge { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(keys: &[&str]) -> Vec<NodeRecord> {
        keys.iter().map(|&k| NodeRecord::new(k)).collect()
    }

    #[test]
    fn test_build_preserves_order() {
        let graph = Graph::build(
            nodes(&["c", "a", "b"]),
            vec![EdgeRecord::new("a", "b"), EdgeRecord::new("c", "a")],
        )
        .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_id(&"c".into()), Some(NodeId(0)));
        assert_eq!(graph.key(NodeId(2)), Some(&NodeKey::from("b")));
        assert_eq!(
            graph.edges()[0],
            Edge {
                source: NodeId(1),
                target: NodeId(2)
            }
        );
    }

    #[test]
    fn test_duplicate_node_is_fatal() {
        let err = Graph::build(nodes(&["a", "b", "a"]), vec![]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode(NodeKey::from("a")));
    }

    #[test]
    fn test_unresolved_edges_dropped() {
        let graph = Graph::build(
            nodes(&["a", "b"]),
            vec![
                EdgeRecord::new("a", "b"),
                EdgeRecord::new("a", "ghost"),
                EdgeRecord::new("nobody", "b"),
            ],
        )
        .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dropped_edge_count(), 2);
        assert_eq!(
            graph.warnings()[0],
            Warning::UnresolvedEdge {
                index: 1,
                source: NodeKey::from("a"),
                target: NodeKey::from("ghost"),
            }
        );
    }

    #[test]
    fn test_adjacency_views() {
        let graph = Graph::build(
            nodes(&["a", "b", "c"]),
            vec![
                EdgeRecord::new("a", "b"),
                EdgeRecord::new("a", "c"),
                EdgeRecord::new("a", "b"),
                EdgeRecord::new("c", "c"),
            ],
        )
        .unwrap();

        let (a, b, c) = (NodeId(0), NodeId(1), NodeId(2));
        assert_eq!(graph.outgoing(a), &[b, c, b]);
        assert_eq!(graph.out_degree(a), 3);
        assert_eq!(graph.incoming(b), &[a, a]);
        assert_eq!(graph.outgoing(c), &[c]);
        assert_eq!(graph.incoming(c), &[a, c]);
        assert_eq!(graph.out_degree(b), 0);
        assert_eq!(graph.neighbors(a), vec![b, c]);
        assert_eq!(graph.neighbors(c), vec![a]);
    }

    #[test]
    fn test_empty_graph() {
        let graph = Graph::build(vec![], vec![EdgeRecord::new("a", "b")]).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.dropped_edge_count(), 1);
        assert!(graph.outgoing(NodeId(0)).is_empty());
    }

    #[test]
    fn test_from_json() {
        let graph = Graph::from_json(
            r#"{
                "nodes": [
                    {"ID": 1, "Name": "Catan"},
                    {"ID": 2, "Name": "Monopoly"}
                ],
                "links": [{"source": 1, "target": 2}]
            }"#,
        )
        .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_id(&NodeKey::Int(2)), Some(NodeId(1)));
        assert_eq!(
            graph.node(NodeId(0)).unwrap().attributes["Name"],
            serde_json::Value::from("Catan")
        );
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Graph::from_json("{ not json"),
            Err(GraphError::Parse(_))
        ));
    }
}

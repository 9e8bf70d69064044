//! Graph data structures.
//!
//! This module provides the immutable directed graph consumed by the ranking
//! and layout engines. Topology is held in petgraph's StableGraph and exposed
//! through precomputed CSR adjacency views.

mod edge;
mod model;
mod node;

pub use edge::{Edge, EdgeId, EdgeRecord};
pub use model::{Graph, GraphData};
pub use node::{NodeId, NodeKey, NodeRecord};

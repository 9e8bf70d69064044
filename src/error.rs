//! Error and diagnostic types.
//!
//! Fatal conditions are `GraphError` values returned through `Result`.
//! Non-fatal conditions are `Warning` values returned next to a usable
//! result, so a render loop always has something to draw.

use std::fmt;

use crate::graph::{NodeId, NodeKey};

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that abort an operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Two node records share the same identifier.
    #[error("Malformed input: duplicate node identifier {0}")]
    DuplicateNode(NodeKey),

    /// A node id does not belong to the graph.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Per-node buffers do not line up with the graph.
    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Parse(err.to_string())
    }
}

/// Which engine stopped at its cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Ranking,
    Layout,
}

/// Non-fatal conditions reported alongside a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// An edge referenced an unknown node and was dropped.
    UnresolvedEdge {
        /// Position of the edge in the input records.
        index: usize,
        source: NodeKey,
        target: NodeKey,
    },

    /// The iteration or step cap was reached before convergence.
    /// The last computed result is still returned.
    NonConvergence {
        engine: Engine,
        iterations: usize,
        /// Last measured change (L1 delta for ranking, alpha for layout).
        residual: f64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedEdge {
                index,
                source,
                target,
            } => write!(
                f,
                "edge #{index} ({source} -> {target}) references an unknown node and was dropped"
            ),
            Warning::NonConvergence {
                engine,
                iterations,
                residual,
            } => write!(
                f,
                "{engine:?} stopped after {iterations} iterations without converging (residual {residual:.3e})"
            ),
        }
    }
}

//! PageRank with dangling-mass redistribution and a hard iteration cap.
//!
//! # Algorithm Overview
//!
//! 1. Every node starts with score `1 / N`.
//! 2. Each iteration pulls score along incoming edges: a predecessor `s`
//!    contributes `score[s] / out_degree[s]` once per edge it has to the
//!    node, so parallel edges weigh more and self-loops count like any edge.
//! 3. The link term is scaled by the damping factor, then every node gets the
//!    uniform teleport term `(1 - d) / N` plus an equal share `d * D / N` of
//!    the mass `D` held by dangling nodes (out-degree zero). Without that
//!    share the total would leak below one.
//! 4. Stop when the L1 distance between successive vectors drops below the
//!    tolerance, or when the iteration cap is hit.
//!
//! The final vector is renormalised so floating-point drift cannot break the
//! sum-to-one invariant.
//!
//! # References
//!
//! - Page et al., "The PageRank Citation Ranking: Bringing Order to the Web" (1999)

use serde::{Deserialize, Serialize};

use crate::error::{Engine, GraphError, GraphResult, Warning};
use crate::graph::{Graph, NodeId, NodeKey};

/// Configuration for PageRank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Probability of following a link rather than teleporting (default: 0.85).
    pub damping_factor: f64,
    /// L1 change below which the vector counts as converged (default: 1e-4).
    pub tolerance: f64,
    /// Hard cap on iterations (default: 100).
    pub max_iterations: usize,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

impl PageRankConfig {
    /// Check every parameter is in range.
    pub fn validate(&self) -> GraphResult<()> {
        if !(self.damping_factor > 0.0 && self.damping_factor < 1.0) {
            return Err(GraphError::InvalidConfig(format!(
                "damping_factor must be in (0, 1), got {}",
                self.damping_factor
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(GraphError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(GraphError::InvalidConfig(
                "max_iterations must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Score per node, indexed by [`NodeId`].
///
/// Entries are non-negative and sum to one for a non-empty graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankVector {
    scores: Vec<f64>,
}

impl RankVector {
    /// Get a node's score.
    pub fn get(&self, id: NodeId) -> Option<f64> {
        self.scores.get(id.index()).copied()
    }

    /// Look up a score by the caller's key.
    pub fn get_by_key(&self, graph: &Graph, key: &NodeKey) -> Option<f64> {
        graph.node_id(key).and_then(|id| self.get(id))
    }

    /// Scores as a slice, in node insertion order.
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    /// Iterate `(id, score)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.scores
            .iter()
            .enumerate()
            .map(|(i, &score)| (NodeId(i as u32), score))
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Total mass.
    pub fn sum(&self) -> f64 {
        self.scores.iter().sum()
    }

    /// Node ids from highest to lowest score. Ties keep insertion order.
    pub fn ranked(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = (0..self.scores.len() as u32).map(NodeId).collect();
        ids.sort_by(|a, b| self.scores[b.index()].total_cmp(&self.scores[a.index()]));
        ids
    }
}

/// Outcome of a ranking run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankResult {
    pub scores: RankVector,
    /// Iterations actually performed.
    pub iterations: usize,
    /// Whether the tolerance was reached before the cap.
    pub converged: bool,
    /// L1 change of the last iteration.
    pub delta: f64,
}

impl RankResult {
    /// The non-convergence diagnostic, if the cap was hit.
    pub fn warning(&self) -> Option<Warning> {
        (!self.converged).then_some(Warning::NonConvergence {
            engine: Engine::Ranking,
            iterations: self.iterations,
            residual: self.delta,
        })
    }
}

/// Compute PageRank scores for every node.
///
/// Returns an empty, converged result for an empty graph. Fails only when
/// the configuration is out of range.
pub fn rank(graph: &Graph, config: &PageRankConfig) -> GraphResult<RankResult> {
    config.validate()?;

    let n = graph.node_count();
    if n == 0 {
        return Ok(RankResult {
            scores: RankVector::default(),
            iterations: 0,
            converged: true,
            delta: 0.0,
        });
    }

    let d = config.damping_factor;
    let uniform = 1.0 / n as f64;

    // Reciprocal out-degree, zero marks a dangling node
    let inv_out: Vec<f64> = graph
        .node_ids()
        .map(|id| match graph.out_degree(id) {
            0 => 0.0,
            deg => 1.0 / deg as f64,
        })
        .collect();

    let mut scores = vec![uniform; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut delta = f64::INFINITY;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let dangling: f64 = scores
            .iter()
            .zip(&inv_out)
            .filter(|&(_, &inv)| inv == 0.0)
            .map(|(&s, _)| s)
            .sum();
        let base = (1.0 - d) * uniform + d * dangling * uniform;

        for id in graph.node_ids() {
            let inflow: f64 = graph
                .incoming(id)
                .iter()
                .map(|src| scores[src.index()] * inv_out[src.index()])
                .sum();
            next[id.index()] = base + d * inflow;
        }

        delta = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut scores, &mut next);

        log::trace!("pagerank iteration {iterations}: delta {delta:.3e}");

        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        for score in &mut scores {
            *score /= total;
        }
    }

    if converged {
        log::debug!("pagerank converged after {iterations} iterations");
    } else {
        log::warn!(
            "pagerank hit the cap of {} iterations (delta {delta:.3e})",
            config.max_iterations
        );
    }

    Ok(RankResult {
        scores: RankVector { scores },
        iterations,
        converged,
        delta,
    })
}

//! Link-analysis ranking.
//!
//! Scores every node of a [`Graph`](crate::graph::Graph) by the stationary
//! distribution of a damped random walk over its edges.

pub mod pagerank;

pub use pagerank::{rank, PageRankConfig, RankResult, RankVector};

//! Spatial indexing for neighbor queries.
//!
//! This module provides an R-tree based spatial index used by the collision
//! force to find overlapping nodes without an all-pairs scan.

mod rtree;

pub use rtree::SpatialIndex;

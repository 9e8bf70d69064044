//! Per-node layout state and sizing hints.
//!
//! Positions and velocities are kept in SoA (Structure of Arrays) layout so
//! the UI can view each axis as a flat `Float32Array` without copying.

use serde::Serialize;
use std::f32::consts::PI;

use crate::error::{GraphError, GraphResult};
use crate::graph::NodeId;
use crate::rank::RankVector;

/// Spacing of the initial spiral.
const INITIAL_RADIUS: f32 = 10.0;

/// Positions, velocities and pin overrides for every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutState {
    /// X positions (SoA layout)
    pub(crate) pos_x: Vec<f32>,

    /// Y positions (SoA layout)
    pub(crate) pos_y: Vec<f32>,

    /// X velocities (SoA layout)
    pub(crate) vel_x: Vec<f32>,

    /// Y velocities (SoA layout)
    pub(crate) vel_y: Vec<f32>,

    /// Fixed position for nodes held by the UI
    pub(crate) pinned: Vec<Option<(f32, f32)>>,
}

impl LayoutState {
    /// Create a state with every node at the origin and at rest.
    pub fn new(node_count: usize) -> Self {
        Self {
            pos_x: vec![0.0; node_count],
            pos_y: vec![0.0; node_count],
            vel_x: vec![0.0; node_count],
            vel_y: vec![0.0; node_count],
            pinned: vec![None; node_count],
        }
    }

    /// Seed nodes on a phyllotaxis spiral around a center.
    ///
    /// No two nodes coincide, so the first step never has to break ties.
    pub fn phyllotaxis(node_count: usize, center_x: f32, center_y: f32) -> Self {
        let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
        let mut state = Self::new(node_count);
        for i in 0..node_count {
            let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
            let angle = i as f32 * golden_angle;
            state.pos_x[i] = center_x + radius * angle.cos();
            state.pos_y[i] = center_y + radius * angle.sin();
        }
        state
    }

    /// Create a state from explicit positions, all at rest.
    pub fn from_positions(positions: &[(f32, f32)]) -> Self {
        let mut state = Self::new(positions.len());
        for (i, &(x, y)) in positions.iter().enumerate() {
            state.pos_x[i] = x;
            state.pos_y[i] = y;
        }
        state
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.pos_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_x.is_empty()
    }

    fn check(&self, id: NodeId) -> GraphResult<usize> {
        let i = id.index();
        if i < self.len() {
            Ok(i)
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    /// Get a node's position.
    pub fn position(&self, id: NodeId) -> Option<(f32, f32)> {
        let i = id.index();
        (i < self.len()).then(|| (self.pos_x[i], self.pos_y[i]))
    }

    /// Get a node's velocity.
    pub fn velocity(&self, id: NodeId) -> Option<(f32, f32)> {
        let i = id.index();
        (i < self.len()).then(|| (self.vel_x[i], self.vel_y[i]))
    }

    /// Move a node. Its velocity is kept.
    pub fn set_position(&mut self, id: NodeId, x: f32, y: f32) -> GraphResult<()> {
        let i = self.check(id)?;
        self.pos_x[i] = x;
        self.pos_y[i] = y;
        Ok(())
    }

    /// Fix a node at a position until it is unpinned.
    pub fn pin(&mut self, id: NodeId, x: f32, y: f32) -> GraphResult<()> {
        let i = self.check(id)?;
        self.pinned[i] = Some((x, y));
        Ok(())
    }

    /// Release a pinned node. The node stays where it was last placed.
    pub fn unpin(&mut self, id: NodeId) -> GraphResult<()> {
        let i = self.check(id)?;
        self.pinned[i] = None;
        Ok(())
    }

    /// Check if a node is pinned.
    pub fn is_pinned(&self, id: NodeId) -> bool {
        self.pinned.get(id.index()).is_some_and(Option::is_some)
    }

    /// Get a node's pin override.
    pub fn pinned_position(&self, id: NodeId) -> Option<(f32, f32)> {
        self.pinned.get(id.index()).copied().flatten()
    }

    /// Get X positions slice.
    pub fn positions_x(&self) -> &[f32] {
        &self.pos_x
    }

    /// Get Y positions slice.
    pub fn positions_y(&self) -> &[f32] {
        &self.pos_y
    }

    /// Get X velocities slice.
    pub fn velocities_x(&self) -> &[f32] {
        &self.vel_x
    }

    /// Get Y velocities slice.
    pub fn velocities_y(&self) -> &[f32] {
        &self.vel_y
    }

    /// Positions interleaved as [x0, y0, x1, y1, ...].
    pub fn interleaved_positions(&self) -> Vec<f32> {
        self.pos_x
            .iter()
            .zip(&self.pos_y)
            .flat_map(|(&x, &y)| [x, y])
            .collect()
    }

    /// Largest speed of any node.
    pub fn max_speed(&self) -> f32 {
        self.vel_x
            .iter()
            .zip(&self.vel_y)
            .map(|(vx, vy)| (vx * vx + vy * vy).sqrt())
            .fold(0.0, f32::max)
    }

    /// Get the bounding box of all nodes as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(f32, f32, f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for (&x, &y) in self.pos_x.iter().zip(&self.pos_y) {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        Some((min_x, min_y, max_x, max_y))
    }
}

/// Collision radius per node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SizingHint {
    radii: Vec<f32>,
}

impl SizingHint {
    /// Radius of a node with zero rank.
    pub const BASE_RADIUS: f32 = 10.0;
    /// Radius gained per unit of rank.
    pub const RANK_SCALE: f32 = 100.0;

    /// Every node gets the same radius.
    pub fn uniform(node_count: usize, radius: f32) -> Self {
        Self {
            radii: vec![radius; node_count],
        }
    }

    /// Explicit radii, indexed by node id.
    pub fn from_radii(radii: Vec<f32>) -> Self {
        Self { radii }
    }

    /// Size nodes by rank: `10 + rank * 100`.
    pub fn from_ranks(ranks: &RankVector) -> Self {
        Self::from_ranks_scaled(ranks, Self::BASE_RADIUS, Self::RANK_SCALE)
    }

    /// Size nodes by rank: `base + rank * scale`.
    pub fn from_ranks_scaled(ranks: &RankVector, base: f32, scale: f32) -> Self {
        Self {
            radii: ranks
                .as_slice()
                .iter()
                .map(|&rank| base + rank as f32 * scale)
                .collect(),
        }
    }

    /// Get a node's radius.
    pub fn radius(&self, id: NodeId) -> Option<f32> {
        self.radii.get(id.index()).copied()
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    /// Largest radius, zero when empty.
    pub fn max_radius(&self) -> f32 {
        self.radii.iter().copied().fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phyllotaxis_is_distinct_and_centered() {
        let state = LayoutState::phyllotaxis(50, 100.0, 200.0);
        assert_eq!(state.len(), 50);

        for i in 0..50 {
            for j in (i + 1)..50 {
                let dx = state.pos_x[i] - state.pos_x[j];
                let dy = state.pos_y[i] - state.pos_y[j];
                assert!(dx * dx + dy * dy > 1.0, "nodes {i} and {j} overlap");
            }
        }

        let (x, y) = state.position(NodeId(0)).unwrap();
        assert!((x - 100.0).abs() < INITIAL_RADIUS);
        assert!((y - 200.0).abs() < INITIAL_RADIUS);
        assert_eq!(state.max_speed(), 0.0);
    }

    #[test]
    fn test_pin_unpin() {
        let mut state = LayoutState::new(2);
        let id = NodeId(1);

        assert!(!state.is_pinned(id));

        state.pin(id, 5.0, 6.0).unwrap();
        assert!(state.is_pinned(id));
        assert_eq!(state.pinned_position(id), Some((5.0, 6.0)));

        state.unpin(id).unwrap();
        assert!(!state.is_pinned(id));
        assert_eq!(state.pinned_position(id), None);
    }

    #[test]
    fn test_unknown_node() {
        let mut state = LayoutState::new(1);
        assert_eq!(
            state.pin(NodeId(3), 0.0, 0.0),
            Err(GraphError::UnknownNode(NodeId(3)))
        );
        assert!(!state.is_pinned(NodeId(3)));
        assert_eq!(state.position(NodeId(3)), None);
    }

    #[test]
    fn test_bounds_and_interleave() {
        let state = LayoutState::from_positions(&[(-10.0, -5.0), (10.0, 5.0)]);
        assert_eq!(state.bounds(), Some((-10.0, -5.0, 10.0, 5.0)));
        assert_eq!(state.interleaved_positions(), vec![-10.0, -5.0, 10.0, 5.0]);
        assert_eq!(LayoutState::new(0).bounds(), None);
    }

    #[test]
    fn test_sizing_hint() {
        let hint = SizingHint::uniform(3, 4.0);
        assert_eq!(hint.radius(NodeId(2)), Some(4.0));
        assert_eq!(hint.max_radius(), 4.0);
        assert_eq!(SizingHint::default().max_radius(), 0.0);

        let hint = SizingHint::from_radii(vec![1.0, 7.5]);
        assert_eq!(hint.max_radius(), 7.5);
        assert_eq!(hint.radius(NodeId(5)), None);
    }
}

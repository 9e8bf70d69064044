//! R-tree based spatial index using the rstar crate.
//!
//! The layout engine rebuilds it once per step from predicted positions and
//! asks it for collision candidates within a radius.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::graph::NodeId;

/// A point in the spatial index with associated node ID.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePoint {
    /// The node identifier.
    pub id: NodeId,
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl NodePoint {
    /// Create a new NodePoint.
    pub fn new(id: NodeId, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over node positions.
///
/// Uses an R*-tree bulk loaded from a full set of positions.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk load an index from parallel coordinate slices.
    /// Node `i` gets `NodeId(i)`.
    pub fn from_coordinates(xs: &[f32], ys: &[f32]) -> Self {
        let mut index = Self::new();
        index.rebuild(xs, ys);
        index
    }

    /// Replace the contents with the given coordinates.
    ///
    /// Non-finite points are left out so a diverging node cannot poison
    /// queries for the rest of the graph.
    pub fn rebuild(&mut self, xs: &[f32], ys: &[f32]) {
        let points: Vec<_> = xs
            .iter()
            .zip(ys)
            .enumerate()
            .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
            .map(|(i, (&x, &y))| NodePoint::new(NodeId(i as u32), x, y))
            .collect();

        self.tree = RTree::bulk_load(points);
    }

    /// Find all nodes within a radius of a point, in id order.
    pub fn in_radius(&self, x: f32, y: f32, radius: f32) -> Vec<NodeId> {
        let radius_sq = radius * radius;
        let mut ids: Vec<NodeId> = self
            .tree
            .locate_within_distance([x, y], radius_sq)
            .map(|point| point.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

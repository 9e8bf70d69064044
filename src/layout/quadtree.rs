//! Barnes-Hut quadtree for the charge force.
//!
//! Each cell stores the number of bodies below it and their centroid. A far
//! enough cell (`size / distance < theta`) that does not contain the node
//! acts on it as one aggregate body, which brings the charge force from
//! O(n^2) down to O(n log n).
//!
//! # References
//!
//! - Barnes & Hut, "A hierarchical O(N log N) force-calculation algorithm" (1986)

/// Deepest subdivision. Bodies still sharing a cell at this depth are
/// effectively coincident and stay together in one leaf.
const MAX_DEPTH: u32 = 24;

const NO_CHILD: u32 = u32::MAX;

struct Cell {
    /// Top-left corner of the square region.
    x0: f32,
    y0: f32,
    /// Side length of the square region.
    size: f32,
    /// Centroid of the bodies below this cell.
    cx: f32,
    cy: f32,
    /// Number of bodies below this cell.
    count: u32,
    /// Child cells, `NO_CHILD` for empty quadrants. All empty for a leaf.
    children: [u32; 4],
    /// Bodies held directly by a leaf.
    bodies: Vec<u32>,
}

impl Cell {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c == NO_CHILD)
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x0 + self.size && y >= self.y0 && y < self.y0 + self.size
    }
}

pub(crate) struct QuadTree {
    cells: Vec<Cell>,
}

impl QuadTree {
    /// Build a tree over the given points.
    pub(crate) fn build(xs: &[f32], ys: &[f32]) -> Self {
        let mut tree = Self { cells: Vec::new() };
        if xs.is_empty() {
            return tree;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for (&x, &y) in xs.iter().zip(ys) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        // Square root cell, nudged so the max edge falls inside
        let size = (max_x - min_x).max(max_y - min_y).max(1.0) * 1.0001;

        let bodies: Vec<u32> = (0..xs.len() as u32).collect();
        tree.subdivide(bodies, min_x, min_y, size, 0, xs, ys);
        tree
    }

    fn subdivide(
        &mut self,
        bodies: Vec<u32>,
        x0: f32,
        y0: f32,
        size: f32,
        depth: u32,
        xs: &[f32],
        ys: &[f32],
    ) -> u32 {
        let count = bodies.len() as u32;
        let (sum_x, sum_y) = bodies.iter().fold((0.0f32, 0.0f32), |(sx, sy), &b| {
            (sx + xs[b as usize], sy + ys[b as usize])
        });

        let index = self.cells.len() as u32;
        self.cells.push(Cell {
            x0,
            y0,
            size,
            cx: sum_x / count as f32,
            cy: sum_y / count as f32,
            count,
            children: [NO_CHILD; 4],
            bodies: Vec::new(),
        });

        if count == 1 || depth >= MAX_DEPTH {
            self.cells[index as usize].bodies = bodies;
            return index;
        }

        let half = size / 2.0;
        let (mx, my) = (x0 + half, y0 + half);
        let mut quadrants: [Vec<u32>; 4] = Default::default();
        for b in bodies {
            let right = xs[b as usize] >= mx;
            let below = ys[b as usize] >= my;
            quadrants[(right as usize) | ((below as usize) << 1)].push(b);
        }

        for (q, members) in quadrants.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let qx = if q & 1 == 0 { x0 } else { mx };
            let qy = if q & 2 == 0 { y0 } else { my };
            let child = self.subdivide(members, qx, qy, half, depth + 1, xs, ys);
            self.cells[index as usize].children[q] = child;
        }

        index
    }

    /// Visit the tree on behalf of `node`.
    ///
    /// `near(j)` is called for every body that must be treated exactly,
    /// `far(cx, cy, count)` for every cell accepted as an aggregate.
    pub(crate) fn visit(
        &self,
        node: u32,
        x: f32,
        y: f32,
        theta: f32,
        mut near: impl FnMut(u32),
        mut far: impl FnMut(f32, f32, u32),
    ) {
        if self.cells.is_empty() {
            return;
        }

        let theta2 = theta * theta;
        let mut stack = vec![0u32];

        while let Some(index) = stack.pop() {
            let cell = &self.cells[index as usize];
            let dx = cell.cx - x;
            let dy = cell.cy - y;
            let l = dx * dx + dy * dy;

            // A cell holding the node itself is never collapsed
            if cell.size * cell.size < theta2 * l && !cell.contains(x, y) {
                far(cell.cx, cell.cy, cell.count);
                continue;
            }

            if cell.is_leaf() {
                for &b in &cell.bodies {
                    if b != node {
                        near(b);
                    }
                }
            } else {
                // Reverse so quadrant 0 is visited first
                stack.extend(cell.children.iter().rev().filter(|&&c| c != NO_CHILD));
            }
        }
    }
}

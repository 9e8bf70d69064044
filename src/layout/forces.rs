//! Force kernels.
//!
//! Every kernel reads positions and adds to velocities in place. Kernels run
//! in a fixed order over a fixed node order, so a step is fully deterministic.

use super::config::ForceConfig;
use super::quadtree::QuadTree;
use super::state::{LayoutState, SizingHint};
use crate::graph::Graph;
use crate::spatial::SpatialIndex;

/// Tiny deterministic offset used to separate exactly coincident points.
pub(crate) fn jiggle(seed: usize) -> f32 {
    let unit = (seed as f32 * 0.618_034).fract() - 0.5;
    if unit == 0.0 { 1e-6 } else { unit * 1e-6 }
}

/// Pull linked nodes toward the rest length.
///
/// Works on predicted positions (position + velocity). The correction is
/// split between the endpoints by degree so the better connected end moves
/// less. Self-loops are skipped.
pub(crate) fn apply_links(graph: &Graph, state: &mut LayoutState, config: &ForceConfig, alpha: f32) {
    let mut degree = vec![0u32; state.len()];
    for edge in graph.edges().iter().filter(|e| !e.is_self_loop()) {
        degree[edge.source.index()] += 1;
        degree[edge.target.index()] += 1;
    }

    for (k, edge) in graph.edges().iter().enumerate() {
        if edge.is_self_loop() {
            continue;
        }
        let (s, t) = (edge.source.index(), edge.target.index());

        let mut x = state.pos_x[t] + state.vel_x[t] - state.pos_x[s] - state.vel_x[s];
        let mut y = state.pos_y[t] + state.vel_y[t] - state.pos_y[s] - state.vel_y[s];
        if x == 0.0 {
            x = jiggle(2 * k);
        }
        if y == 0.0 {
            y = jiggle(2 * k + 1);
        }

        let strength = config
            .link_strength
            .unwrap_or_else(|| 1.0 / degree[s].min(degree[t]) as f32);
        let l = (x * x + y * y).sqrt();
        let scale = (l - config.link_distance) / l * alpha * strength;
        x *= scale;
        y *= scale;

        let bias = degree[s] as f32 / (degree[s] + degree[t]) as f32;
        state.vel_x[t] -= x * bias;
        state.vel_y[t] -= y * bias;
        state.vel_x[s] += x * (1.0 - bias);
        state.vel_y[s] += y * (1.0 - bias);
    }
}

/// Velocity change on a node from a charge `weight` at offset (dx, dy).
#[inline]
fn charge_kernel(
    mut dx: f32,
    mut dy: f32,
    weight: f32,
    seed: usize,
    min2: f32,
    max2: f32,
) -> Option<(f32, f32)> {
    if dx == 0.0 {
        dx = jiggle(seed);
    }
    if dy == 0.0 {
        dy = jiggle(seed + 1);
    }
    let mut l = dx * dx + dy * dy;
    if l >= max2 {
        return None;
    }
    if l < min2 {
        l = (min2 * l).sqrt();
    }
    let w = weight / l;
    Some((dx * w, dy * w))
}

/// Pairwise inverse-square charge between all nodes.
///
/// Brute force up to `barnes_hut_threshold` nodes, Barnes-Hut above it.
pub(crate) fn apply_charge(state: &mut LayoutState, config: &ForceConfig, alpha: f32) {
    let n = state.len();
    if n < 2 || config.charge_strength == 0.0 {
        return;
    }

    let weight = config.charge_strength * alpha;
    let min2 = config.distance_min * config.distance_min;
    let max2 = config.distance_max.map_or(f32::INFINITY, |d| d * d);

    if n > config.barnes_hut_threshold {
        let tree = QuadTree::build(&state.pos_x, &state.pos_y);
        for i in 0..n {
            let (xi, yi) = (state.pos_x[i], state.pos_y[i]);
            let (mut near_x, mut near_y) = (0.0, 0.0);
            let (mut far_x, mut far_y) = (0.0, 0.0);
            tree.visit(
                i as u32,
                xi,
                yi,
                config.theta,
                |j| {
                    let j = j as usize;
                    let dx = state.pos_x[j] - xi;
                    let dy = state.pos_y[j] - yi;
                    if let Some((vx, vy)) = charge_kernel(dx, dy, weight, i * n + j, min2, max2) {
                        near_x += vx;
                        near_y += vy;
                    }
                },
                |cx, cy, count| {
                    let w = weight * count as f32;
                    if let Some((vx, vy)) = charge_kernel(cx - xi, cy - yi, w, i, min2, max2) {
                        far_x += vx;
                        far_y += vy;
                    }
                },
            );
            state.vel_x[i] += near_x + far_x;
            state.vel_y[i] += near_y + far_y;
        }
        return;
    }

    for i in 0..n {
        let (xi, yi) = (state.pos_x[i], state.pos_y[i]);
        let (mut dvx, mut dvy) = (0.0, 0.0);
        for j in 0..n {
            if j == i {
                continue;
            }
            let dx = state.pos_x[j] - xi;
            let dy = state.pos_y[j] - yi;
            if let Some((vx, vy)) = charge_kernel(dx, dy, weight, i * n + j, min2, max2) {
                dvx += vx;
                dvy += vy;
            }
        }
        state.vel_x[i] += dvx;
        state.vel_y[i] += dvy;
    }
}

/// Weak per-axis spring toward the configured center.
pub(crate) fn apply_centering(state: &mut LayoutState, config: &ForceConfig, alpha: f32) {
    let k = config.center_strength * alpha;
    if k == 0.0 {
        return;
    }
    for i in 0..state.len() {
        state.vel_x[i] += (config.center_x - state.pos_x[i]) * k;
        state.vel_y[i] += (config.center_y - state.pos_y[i]) * k;
    }
}

/// Push overlapping circles apart.
///
/// Candidates come from an R-tree over predicted positions. Each overlapping
/// pair resolves `collision_strength` of its overlap, split so the smaller
/// circle moves more. Not scaled by alpha.
pub(crate) fn apply_collision(
    state: &mut LayoutState,
    sizing: &SizingHint,
    config: &ForceConfig,
    index: &mut SpatialIndex,
) {
    let n = state.len();
    if n < 2 || config.collision_strength == 0.0 {
        return;
    }

    let max_radius = sizing.max_radius() + config.collision_padding;
    if max_radius <= 0.0 {
        return;
    }

    let radii: Vec<f32> = sizing
        .radii()
        .iter()
        .map(|r| r + config.collision_padding)
        .collect();
    let predicted_x: Vec<f32> = state.pos_x.iter().zip(&state.vel_x).map(|(x, v)| x + v).collect();
    let predicted_y: Vec<f32> = state.pos_y.iter().zip(&state.vel_y).map(|(y, v)| y + v).collect();
    index.rebuild(&predicted_x, &predicted_y);

    for i in 0..n {
        let ri = radii[i];
        let xi = state.pos_x[i] + state.vel_x[i];
        let yi = state.pos_y[i] + state.vel_y[i];

        for j in index.in_radius(xi, yi, ri + max_radius) {
            let j = j.index();
            if j <= i {
                continue;
            }
            let rj = radii[j];
            let r = ri + rj;

            let mut x = xi - state.pos_x[j] - state.vel_x[j];
            let mut y = yi - state.pos_y[j] - state.vel_y[j];
            let mut l = x * x + y * y;
            if l >= r * r {
                continue;
            }

            if x == 0.0 {
                x = jiggle(i * n + j);
                l += x * x;
            }
            if y == 0.0 {
                y = jiggle(i * n + j + 1);
                l += y * y;
            }
            let l = l.sqrt();
            let scale = (r - l) / l * config.collision_strength;
            x *= scale;
            y *= scale;

            let share = (rj * rj) / (ri * ri + rj * rj);
            state.vel_x[i] += x * share;
            state.vel_y[i] += y * share;
            state.vel_x[j] -= x * (1.0 - share);
            state.vel_y[j] -= y * (1.0 - share);
        }
    }
}

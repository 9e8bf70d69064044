//! One integration step of the force-directed layout.

use super::config::ForceConfig;
use super::forces::{apply_centering, apply_charge, apply_collision, apply_links};
use super::state::{LayoutState, SizingHint};
use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::spatial::SpatialIndex;

fn check_len(what: &'static str, expected: usize, actual: usize) -> GraphResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(GraphError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Advance the layout by one step.
///
/// Pure: the input state is not touched and identical inputs give identical
/// output. Forces are applied in order (link, charge, centering, collision)
/// to the velocities, then free nodes integrate with
/// `v *= 1 - velocity_decay; x += v * dt`. Pinned nodes sit at their pin for
/// the whole step, so they push and pull the others, and come out at rest.
///
/// `alpha` scales link, charge and centering; the simulation driver decays it.
/// An empty `sizing` disables collision.
pub fn step(
    graph: &Graph,
    state: &LayoutState,
    sizing: &SizingHint,
    forces: &ForceConfig,
    alpha: f32,
    dt: f32,
) -> GraphResult<LayoutState> {
    let n = graph.node_count();
    check_len("layout state", n, state.len())?;
    if !sizing.is_empty() {
        check_len("sizing hint", n, sizing.len())?;
    }
    forces.validate()?;
    if !(alpha.is_finite() && alpha >= 0.0) {
        return Err(GraphError::InvalidConfig(format!(
            "alpha must be finite and non-negative, got {alpha}"
        )));
    }
    if !(dt.is_finite() && dt > 0.0) {
        return Err(GraphError::InvalidConfig(format!(
            "dt must be finite and positive, got {dt}"
        )));
    }

    let mut next = state.clone();
    if n == 0 {
        return Ok(next);
    }

    for i in 0..n {
        if let Some((x, y)) = next.pinned[i] {
            next.pos_x[i] = x;
            next.pos_y[i] = y;
            next.vel_x[i] = 0.0;
            next.vel_y[i] = 0.0;
        }
    }

    apply_links(graph, &mut next, forces, alpha);
    apply_charge(&mut next, forces, alpha);
    apply_centering(&mut next, forces, alpha);
    if !sizing.is_empty() {
        apply_collision(&mut next, sizing, forces, &mut SpatialIndex::new());
    }

    let retain = 1.0 - forces.velocity_decay;
    for i in 0..n {
        if next.pinned[i].is_some() {
            next.vel_x[i] = 0.0;
            next.vel_y[i] = 0.0;
        } else {
            next.vel_x[i] *= retain;
            next.vel_y[i] *= retain;
            next.pos_x[i] += next.vel_x[i] * dt;
            next.pos_y[i] += next.vel_y[i] * dt;
        }
    }

    log::trace!("layout step: alpha {alpha:.4}, max speed {:.3}", next.max_speed());
    Ok(next)
}

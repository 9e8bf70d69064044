//! Force-directed layout.
//!
//! This module computes 2-D positions by simulating four forces on every
//! node: springs along links, inverse-square charge between all pairs,
//! a weak pull toward a center point, and collision between circles sized
//! by a [`SizingHint`]. [`step`] performs one pure integration step; the
//! [`simulation`](crate::simulation) driver calls it repeatedly with a
//! decaying alpha until the layout settles.

pub mod config;
mod forces;
mod quadtree;
pub mod state;
mod step;

pub use config::ForceConfig;
pub use state::{LayoutState, SizingHint};
pub use step::step;

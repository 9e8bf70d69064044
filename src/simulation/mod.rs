//! Simulation driver.
//!
//! Repeats [`layout::step`](crate::layout::step) under a decaying alpha until
//! the layout settles, and handles pinning and reheating for interaction.

mod driver;

pub use driver::{run, steps, RunOutcome, Simulation, SimulationConfig, Steps};

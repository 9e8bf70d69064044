//! Simulation - drives layout steps with a decaying alpha.
//!
//! Alpha starts hot and eases toward `alpha_target` by `alpha_decay` each
//! tick. With the default target of zero it falls below `alpha_min` after
//! about 300 ticks and the layout counts as settled. Interaction raises the
//! target (`reheat`), which keeps the layout moving until it is lowered again.
//!
//! The driver never owns a timer: the caller decides when to tick, typically
//! once per animation frame.

use serde::{Deserialize, Serialize};

use crate::error::{Engine, GraphError, GraphResult, Warning};
use crate::graph::{Graph, NodeId};
use crate::layout::{step, ForceConfig, LayoutState, SizingHint};

/// Configuration for the simulation driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Starting alpha (default: 1.0).
    pub alpha: f32,
    /// Alpha below which the layout is settled (default: 0.001).
    pub alpha_min: f32,
    /// Fraction of the gap to the target closed per tick
    /// (default: 1 - 0.001^(1/300), settles in 300 ticks).
    pub alpha_decay: f32,
    /// Value alpha eases toward (default: 0.0).
    pub alpha_target: f32,
    /// Target used while a node is dragged (default: 0.3).
    pub restart_alpha_target: f32,
    /// Ticks allowed per run before giving up (default: 1000).
    pub max_steps: usize,
    /// Integration time step (default: 1.0).
    pub dt: f32,
    /// Forces applied each tick.
    pub forces: ForceConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min: f32 = 0.001;
        Self {
            alpha: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            restart_alpha_target: 0.3,
            max_steps: 1000,
            dt: 1.0,
            forces: ForceConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Check every parameter is in range.
    pub fn validate(&self) -> GraphResult<()> {
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        let checks = [
            (unit(self.alpha), "alpha must be in [0, 1]"),
            (
                self.alpha_min > 0.0 && self.alpha_min < 1.0,
                "alpha_min must be in (0, 1)",
            ),
            (unit(self.alpha_decay), "alpha_decay must be in [0, 1]"),
            (unit(self.alpha_target), "alpha_target must be in [0, 1]"),
            (
                unit(self.restart_alpha_target),
                "restart_alpha_target must be in [0, 1]",
            ),
            (self.max_steps > 0, "max_steps must be at least 1"),
            (self.dt.is_finite() && self.dt > 0.0, "dt must be positive"),
        ];

        if let Some((_, message)) = checks.iter().find(|(ok, _)| !ok) {
            return Err(GraphError::InvalidConfig((*message).to_owned()));
        }
        self.forces.validate()
    }
}

/// Outcome of running a simulation to rest.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub state: LayoutState,
    /// Ticks performed by this run.
    pub steps: usize,
    /// Whether alpha fell below `alpha_min` before the step cap.
    pub converged: bool,
    /// Alpha after the last tick.
    pub alpha: f32,
}

impl RunOutcome {
    /// The non-convergence diagnostic, if the step cap was hit.
    pub fn warning(&self) -> Option<Warning> {
        (!self.converged).then_some(Warning::NonConvergence {
            engine: Engine::Layout,
            iterations: self.steps,
            residual: f64::from(self.alpha),
        })
    }
}

/// A running layout simulation.
///
/// Owns the layout state; the graph stays with the caller and is passed to
/// every tick.
#[derive(Debug, Clone)]
pub struct Simulation {
    state: LayoutState,
    sizing: SizingHint,
    config: SimulationConfig,
    alpha: f32,
    alpha_target: f32,
    /// Ticks since construction or the last reheat.
    steps: usize,
}

impl Simulation {
    /// Create a simulation starting from the given state.
    pub fn new(
        graph: &Graph,
        initial: LayoutState,
        sizing: SizingHint,
        config: SimulationConfig,
    ) -> GraphResult<Self> {
        config.validate()?;
        let n = graph.node_count();
        if initial.len() != n {
            return Err(GraphError::LengthMismatch {
                what: "layout state",
                expected: n,
                actual: initial.len(),
            });
        }
        if !sizing.is_empty() && sizing.len() != n {
            return Err(GraphError::LengthMismatch {
                what: "sizing hint",
                expected: n,
                actual: sizing.len(),
            });
        }

        Ok(Self {
            state: initial,
            sizing,
            alpha: config.alpha,
            alpha_target: config.alpha_target,
            config,
            steps: 0,
        })
    }

    /// Create a simulation with nodes seeded on a spiral around the
    /// configured center.
    pub fn seeded(graph: &Graph, sizing: SizingHint, config: SimulationConfig) -> GraphResult<Self> {
        let initial = LayoutState::phyllotaxis(
            graph.node_count(),
            config.forces.center_x,
            config.forces.center_y,
        );
        Self::new(graph, initial, sizing, config)
    }

    /// Current layout snapshot.
    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    /// Take the layout state out of the simulation.
    pub fn into_state(self) -> LayoutState {
        self.state
    }

    pub fn sizing(&self) -> &SizingHint {
        &self.sizing
    }

    /// Replace the collision radii, e.g. after ranks are recomputed.
    pub fn set_sizing(&mut self, sizing: SizingHint) -> GraphResult<()> {
        if !sizing.is_empty() && sizing.len() != self.state.len() {
            return Err(GraphError::LengthMismatch {
                what: "sizing hint",
                expected: self.state.len(),
                actual: sizing.len(),
            });
        }
        self.sizing = sizing;
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    /// Ticks since construction or the last reheat.
    pub fn steps_taken(&self) -> usize {
        self.steps
    }

    /// Whether alpha has fallen below `alpha_min` and is not being held
    /// above it by the target.
    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    /// Whether the step budget is used up.
    pub fn is_exhausted(&self) -> bool {
        self.steps >= self.config.max_steps
    }

    /// Advance one tick: decay alpha, then run one layout step.
    pub fn tick(&mut self, graph: &Graph) -> GraphResult<&LayoutState> {
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        self.state = step(
            graph,
            &self.state,
            &self.sizing,
            &self.config.forces,
            self.alpha,
            self.config.dt,
        )?;
        self.steps += 1;
        Ok(&self.state)
    }

    /// Tick until settled or out of budget.
    pub fn run(&mut self, graph: &Graph) -> GraphResult<RunOutcome> {
        let start = self.steps;
        if !self.state.is_empty() {
            while !self.is_settled() && !self.is_exhausted() {
                self.tick(graph)?;
            }
        }

        let outcome = RunOutcome {
            state: self.state.clone(),
            steps: self.steps - start,
            converged: self.state.is_empty() || self.is_settled(),
            alpha: self.alpha,
        };

        if outcome.converged {
            log::debug!("layout settled after {} steps", outcome.steps);
        } else {
            log::warn!(
                "layout hit the cap of {} steps with alpha {:.4}",
                self.config.max_steps,
                self.alpha
            );
        }
        Ok(outcome)
    }

    /// Turn the simulation into a lazy sequence of snapshots.
    pub fn into_steps(self, graph: &Graph) -> Steps<'_> {
        Steps {
            graph,
            sim: self,
            failed: false,
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Hold a node at a position. It still exerts forces on the others.
    pub fn pin(&mut self, id: NodeId, x: f32, y: f32) -> GraphResult<()> {
        self.state.pin(id, x, y)?;
        self.state.set_position(id, x, y)
    }

    /// Release a node back to free integration.
    pub fn unpin(&mut self, id: NodeId) -> GraphResult<()> {
        self.state.unpin(id)
    }

    /// Set the alpha target and refill the step budget.
    ///
    /// A positive target keeps the layout moving (while dragging); zero lets
    /// it settle again.
    pub fn reheat(&mut self, alpha_target: f32) -> GraphResult<()> {
        if !(0.0..=1.0).contains(&alpha_target) {
            return Err(GraphError::InvalidConfig(format!(
                "alpha_target must be in [0, 1], got {alpha_target}"
            )));
        }
        self.alpha_target = alpha_target;
        self.steps = 0;
        log::debug!("reheat: alpha {:.4} -> target {alpha_target}", self.alpha);
        Ok(())
    }

    /// Set alpha directly and refill the step budget.
    pub fn restart(&mut self, alpha: f32) -> GraphResult<()> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(GraphError::InvalidConfig(format!(
                "alpha must be in [0, 1], got {alpha}"
            )));
        }
        self.alpha = alpha;
        self.steps = 0;
        Ok(())
    }

    /// Start dragging a node: raise the target and pin it where it is.
    pub fn drag_start(&mut self, id: NodeId) -> GraphResult<()> {
        let (x, y) = self.state.position(id).ok_or(GraphError::UnknownNode(id))?;
        self.reheat(self.config.restart_alpha_target)?;
        self.pin(id, x, y)
    }

    /// Follow the pointer while dragging.
    pub fn drag_to(&mut self, id: NodeId, x: f32, y: f32) -> GraphResult<()> {
        self.pin(id, x, y)
    }

    /// Stop dragging: let the layout settle and release the node.
    pub fn drag_end(&mut self, id: NodeId) -> GraphResult<()> {
        self.reheat(0.0)?;
        self.unpin(id)
    }
}

/// Lazy sequence of layout snapshots, one per tick.
///
/// Ends when the simulation settles or runs out of steps. A failed tick is
/// yielded once as `Err` and ends the sequence. The simulation can be
/// borrowed between items to pin, unpin or reheat.
pub struct Steps<'g> {
    graph: &'g Graph,
    sim: Simulation,
    failed: bool,
}

impl<'g> Steps<'g> {
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Stop iterating and get the simulation back.
    pub fn into_simulation(self) -> Simulation {
        self.sim
    }
}

impl Iterator for Steps<'_> {
    type Item = GraphResult<LayoutState>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed
            || self.sim.state.is_empty()
            || self.sim.is_settled()
            || self.sim.is_exhausted()
        {
            return None;
        }
        match self.sim.tick(self.graph) {
            Ok(state) => Some(Ok(state.clone())),
            Err(err) => {
                log::error!("layout step failed: {err}");
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Run a simulation from `initial` to rest.
pub fn run(
    graph: &Graph,
    initial: LayoutState,
    sizing: SizingHint,
    config: SimulationConfig,
) -> GraphResult<RunOutcome> {
    Simulation::new(graph, initial, sizing, config)?.run(graph)
}

/// Lazy sequence of snapshots from `initial` until rest.
pub fn steps(
    graph: &Graph,
    initial: LayoutState,
    sizing: SizingHint,
    config: SimulationConfig,
) -> GraphResult<Steps<'_>> {
    Ok(Simulation::new(graph, initial, sizing, config)?.into_steps(graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRecord, NodeRecord};

    fn graph(keys: &[&str], edges: &[(&str, &str)]) -> Graph {
        Graph::build(
            keys.iter().map(|&k| NodeRecord::new(k)).collect(),
            edges.iter().map(|&(s, t)| EdgeRecord::new(s, t)).collect(),
        )
        .unwrap()
    }

    fn springs_only() -> SimulationConfig {
        SimulationConfig {
            forces: ForceConfig {
                charge_strength: 0.0,
                center_strength: 0.0,
                collision_strength: 0.0,
                ..ForceConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    fn distance(state: &LayoutState, a: usize, b: usize) -> f32 {
        let (ax, ay) = state.position(NodeId(a as u32)).unwrap();
        let (bx, by) = state.position(NodeId(b as u32)).unwrap();
        (ax - bx).hypot(ay - by)
    }

    #[test]
    fn test_default_decay_settles_in_about_300_ticks() {
        let config = SimulationConfig::default();
        assert!((config.alpha_decay - 0.0228).abs() < 1e-3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_two_nodes_settle_at_rest_length() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let initial = LayoutState::from_positions(&[(0.0, 0.0), (30.0, 10.0)]);

        let outcome = run(&g, initial, SizingHint::default(), springs_only()).unwrap();

        assert!(outcome.converged);
        assert!(outcome.warning().is_none());
        assert!(outcome.steps <= 310);
        let d = distance(&outcome.state, 0, 1);
        assert!((d - 100.0).abs() < 1.0, "distance {d}");
    }

    #[test]
    fn test_step_cap_reports_non_convergence() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let config = SimulationConfig {
            max_steps: 10,
            ..SimulationConfig::default()
        };
        let outcome = Simulation::seeded(&g, SizingHint::default(), config)
            .unwrap()
            .run(&g)
            .unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.steps, 10);
        assert_eq!(outcome.state.len(), 2);
        assert!(matches!(
            outcome.warning(),
            Some(Warning::NonConvergence {
                engine: Engine::Layout,
                iterations: 10,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_graph() {
        let g = graph(&[], &[]);
        let outcome = run(
            &g,
            LayoutState::new(0),
            SizingHint::default(),
            SimulationConfig::default(),
        )
        .unwrap();
        assert!(outcome.converged);
        assert_eq!(outcome.steps, 0);
        assert!(outcome.state.is_empty());

        let count = steps(
            &g,
            LayoutState::new(0),
            SizingHint::default(),
            SimulationConfig::default(),
        )
        .unwrap()
        .count();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_new_rejects_mismatched_state() {
        let g = graph(&["A", "B"], &[]);
        let err = Simulation::new(
            &g,
            LayoutState::new(1),
            SizingHint::default(),
            SimulationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::LengthMismatch { .. }));
    }

    #[test]
    fn test_steps_match_run() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let sizing = SizingHint::uniform(3, 10.0);
        let config = SimulationConfig::default();

        let snapshots: Vec<LayoutState> = Simulation::seeded(&g, sizing.clone(), config)
            .unwrap()
            .into_steps(&g)
            .collect::<GraphResult<_>>()
            .unwrap();
        let outcome = Simulation::seeded(&g, sizing, config)
            .unwrap()
            .run(&g)
            .unwrap();

        assert_eq!(snapshots.len(), outcome.steps);
        assert_eq!(snapshots.last(), Some(&outcome.state));
    }

    #[test]
    fn test_steps_are_lazy_and_resumable() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let mut iter = steps(
            &g,
            LayoutState::from_positions(&[(0.0, 0.0), (50.0, 0.0)]),
            SizingHint::default(),
            springs_only(),
        )
        .unwrap();

        let first: Vec<_> = iter.by_ref().take(5).collect();
        assert_eq!(first.len(), 5);
        assert_eq!(iter.simulation().steps_taken(), 5);

        let sim = iter.into_simulation();
        let alpha = sim.alpha();
        let rest: Vec<_> = sim.into_steps(&g).collect();
        assert!(!rest.is_empty());
        assert!(alpha > 0.001);
    }

    #[test]
    fn test_pinned_node_holds_during_simulation() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::uniform(3, 10.0), SimulationConfig::default())
                .unwrap();
        sim.pin(NodeId(1), 10.0, 20.0).unwrap();

        for _ in 0..50 {
            let state = sim.tick(&g).unwrap();
            assert_eq!(state.position(NodeId(1)), Some((10.0, 20.0)));
        }

        sim.unpin(NodeId(1)).unwrap();
        sim.tick(&g).unwrap();
        assert_ne!(sim.state().position(NodeId(1)), Some((10.0, 20.0)));
    }

    #[test]
    fn test_pin_unknown_node() {
        let g = graph(&["A"], &[]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        assert_eq!(
            sim.pin(NodeId(9), 0.0, 0.0),
            Err(GraphError::UnknownNode(NodeId(9)))
        );
        assert_eq!(sim.drag_start(NodeId(9)), Err(GraphError::UnknownNode(NodeId(9))));
    }

    #[test]
    fn test_reheat_restarts_settled_layout() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        assert!(sim.run(&g).unwrap().converged);
        assert!(sim.is_settled());

        sim.reheat(0.3).unwrap();
        for _ in 0..100 {
            sim.tick(&g).unwrap();
        }
        assert!(!sim.is_settled());
        assert!(sim.alpha() > 0.1);

        // target held above alpha_min: only the budget stops the run
        let outcome = sim.run(&g).unwrap();
        assert!(!outcome.converged);

        sim.reheat(0.0).unwrap();
        assert!(sim.run(&g).unwrap().converged);
    }

    #[test]
    fn test_reheat_resumes_run_and_steps() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        assert!(sim.run(&g).unwrap().converged);

        sim.reheat(0.3).unwrap();
        assert!(!sim.is_settled());
        let mut iter = sim.clone().into_steps(&g);
        assert!(matches!(iter.next(), Some(Ok(_))));

        let outcome = sim.run(&g).unwrap();
        assert!(outcome.steps > 0);
        assert!(!outcome.converged);
    }

    #[test]
    fn test_drag_after_settle_moves_neighbors() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        sim.run(&g).unwrap();
        let before = sim.state().position(NodeId(1));

        sim.drag_start(NodeId(0)).unwrap();
        sim.drag_to(NodeId(0), 900.0, 900.0).unwrap();
        let dragging = sim.clone().into_steps(&g).take(30).count();
        assert_eq!(dragging, 30);
        for _ in 0..30 {
            sim.tick(&g).unwrap();
        }
        sim.drag_end(NodeId(0)).unwrap();

        let outcome = sim.run(&g).unwrap();
        assert!(outcome.steps > 0);
        assert!(outcome.converged);
        assert_ne!(outcome.state.position(NodeId(1)), before);
    }

    #[test]
    fn test_restart_sets_alpha() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        sim.run(&g).unwrap();

        sim.restart(1.0).unwrap();
        assert_eq!(sim.alpha(), 1.0);
        assert_eq!(sim.steps_taken(), 0);
        let outcome = sim.run(&g).unwrap();
        assert!(outcome.converged);
        assert!(outcome.steps > 250);
    }

    #[test]
    fn test_steps_yield_error_once() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let other = graph(&["A", "B", "C"], &[]);
        let sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();

        let mut iter = sim.into_steps(&other);
        assert!(matches!(
            iter.next(),
            Some(Err(GraphError::LengthMismatch { .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_reheat_rejects_out_of_range() {
        let g = graph(&["A"], &[]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::default(), SimulationConfig::default()).unwrap();
        assert!(sim.reheat(1.5).is_err());
        assert!(sim.restart(-0.1).is_err());
    }

    #[test]
    fn test_drag_lifecycle() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C")]);
        let mut sim =
            Simulation::seeded(&g, SizingHint::uniform(3, 10.0), SimulationConfig::default())
                .unwrap();
        sim.run(&g).unwrap();

        let dragged = NodeId(0);
        sim.drag_start(dragged).unwrap();
        assert!(sim.state().is_pinned(dragged));
        assert_eq!(sim.alpha_target(), 0.3);

        sim.drag_to(dragged, 900.0, 900.0).unwrap();
        for _ in 0..20 {
            sim.tick(&g).unwrap();
        }
        assert_eq!(sim.state().position(dragged), Some((900.0, 900.0)));

        sim.drag_end(dragged).unwrap();
        assert!(!sim.state().is_pinned(dragged));
        assert_eq!(sim.alpha_target(), 0.0);
        assert!(sim.run(&g).unwrap().converged);
    }

    #[test]
    fn test_isolated_pair_never_attracts() {
        let g = graph(&["A", "B"], &[]);
        let config = SimulationConfig {
            forces: ForceConfig {
                charge_strength: 0.0,
                ..ForceConfig::default()
            },
            ..SimulationConfig::default()
        };
        let (cx, cy) = (config.forces.center_x, config.forces.center_y);
        let initial = LayoutState::from_positions(&[(cx - 300.0, cy - 100.0), (cx + 300.0, cy + 100.0)]);
        let start_a = distance(&initial, 0, 1) / 2.0;

        let outcome = run(&g, initial, SizingHint::default(), config).unwrap();
        let (ax, ay) = outcome.state.position(NodeId(0)).unwrap();
        let to_center = (ax - cx).hypot(ay - cy);
        assert!(to_center < start_a);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"max_steps": 50, "forces": {"link_distance": 60}}"#).unwrap();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.forces.link_distance, 60.0);
        assert_eq!(config.alpha_min, 0.001);
        assert_eq!(config.forces.collision_strength, 0.7);
    }
}

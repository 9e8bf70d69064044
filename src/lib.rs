//! Board Game Graph - WASM Module
//!
//! Core engines behind the board game graph visualization: PageRank scoring
//! of a directed graph and a force-directed layout driven by a decaying
//! simulation. The crate compiles to WebAssembly and exposes a
//! JavaScript-friendly API via wasm-bindgen; the rendering side only reads
//! rank scores and node positions.
//!
//! # Architecture
//!
//! - `graph`: Immutable graph model (petgraph `StableGraph` + CSR adjacency)
//! - `rank`: PageRank with dangling-node redistribution
//! - `layout`: Pure force-directed step (links, charge, centering, collision)
//! - `simulation`: Alpha-decay driver with pinning and reheat
//! - `spatial`: R-tree index used for collision candidates

use js_sys::Float32Array;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod graph;
pub mod layout;
pub mod rank;
pub mod simulation;
pub mod spatial;

use graph::{Graph, GraphData, NodeId, NodeKey};
use layout::SizingHint;
use rank::{PageRankConfig, RankResult};
use simulation::{Simulation, SimulationConfig};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Read an optional JS config object, falling back to defaults for
/// `undefined`/`null` and for any missing field.
fn config_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsError> {
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        Ok(serde_wasm_bindgen::from_value(value)?)
    }
}

/// Main entry point for the board game graph.
///
/// Owns the graph, the latest ranking and the running layout simulation.
#[wasm_bindgen]
pub struct BoardGameGraphWasm {
    graph: Graph,
    ranks: Option<RankResult>,
    simulation: Simulation,
}

#[wasm_bindgen]
impl BoardGameGraphWasm {
    /// Build the graph from `{ nodes, links }` data.
    ///
    /// # Arguments
    ///
    /// * `data` - `{ nodes: [{ id, ... }], links: [{ source, target }] }`
    /// * `config` - Partial `SimulationConfig`, or `undefined` for defaults
    #[wasm_bindgen(constructor)]
    pub fn new(data: JsValue, config: JsValue) -> Result<BoardGameGraphWasm, JsError> {
        let data: GraphData = serde_wasm_bindgen::from_value(data)?;
        let config: SimulationConfig = config_or_default(config)?;
        let graph = Graph::from_data(data)?;
        let sizing = SizingHint::uniform(graph.node_count(), SizingHint::BASE_RADIUS);
        let simulation = Simulation::seeded(&graph, sizing, config)?;

        log::info!(
            "graph ready: {} nodes, {} edges ({} dropped)",
            graph.node_count(),
            graph.edge_count(),
            graph.dropped_edge_count()
        );

        Ok(Self {
            graph,
            ranks: None,
            simulation,
        })
    }

    // =========================================================================
    // Graph
    // =========================================================================

    /// Get the number of nodes in the graph.
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.graph.node_count() as u32
    }

    /// Get the number of accepted edges.
    #[wasm_bindgen(js_name = edgeCount)]
    pub fn edge_count(&self) -> u32 {
        self.graph.edge_count() as u32
    }

    /// Get the number of edges dropped for unknown endpoints.
    #[wasm_bindgen(js_name = droppedEdgeCount)]
    pub fn dropped_edge_count(&self) -> u32 {
        self.graph.dropped_edge_count() as u32
    }

    /// Look up the dense index of a node by its data identifier.
    #[wasm_bindgen(js_name = nodeIndex)]
    pub fn node_index(&self, key: JsValue) -> Result<Option<u32>, JsError> {
        let key: NodeKey = serde_wasm_bindgen::from_value(key)?;
        Ok(self.graph.node_id(&key).map(NodeId::raw))
    }

    /// Get distinct neighbors of a node in either direction.
    #[wasm_bindgen(js_name = getNeighbors)]
    pub fn get_neighbors(&self, node: u32) -> Vec<u32> {
        let id = NodeId(node);
        if !self.graph.contains(id) {
            return Vec::new();
        }
        self.graph.neighbors(id).into_iter().map(NodeId::raw).collect()
    }

    /// Get node degrees as [out_deg_0, in_deg_0, out_deg_1, in_deg_1, ...].
    #[wasm_bindgen(js_name = getNodeDegrees)]
    pub fn get_node_degrees(&self) -> Vec<u32> {
        self.graph
            .node_ids()
            .flat_map(|id| [self.graph.out_degree(id) as u32, self.graph.in_degree(id) as u32])
            .collect()
    }

    /// Human-readable diagnostics from building, ranking and layout.
    pub fn warnings(&self) -> Vec<String> {
        self.graph
            .warnings()
            .iter()
            .cloned()
            .chain(self.ranks.as_ref().and_then(RankResult::warning))
            .map(|w| w.to_string())
            .collect()
    }

    // =========================================================================
    // Ranking
    // =========================================================================

    /// Compute PageRank scores and resize collision radii from them.
    ///
    /// Returns one score per node, in node index order.
    pub fn rank(&mut self, config: JsValue) -> Result<Vec<f64>, JsError> {
        let config: PageRankConfig = config_or_default(config)?;
        let result = rank::rank(&self.graph, &config)?;
        if let Some(warning) = result.warning() {
            log::warn!("{warning}");
        }

        self.simulation
            .set_sizing(SizingHint::from_ranks(&result.scores))?;
        let scores = result.scores.as_slice().to_vec();
        self.ranks = Some(result);
        Ok(scores)
    }

    /// Scores from the last `rank` call, empty before the first.
    #[wasm_bindgen(js_name = rankScores)]
    pub fn rank_scores(&self) -> Vec<f64> {
        self.ranks
            .as_ref()
            .map(|r| r.scores.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Node indices sorted by descending score, ties in index order.
    #[wasm_bindgen(js_name = rankedOrder)]
    pub fn ranked_order(&self) -> Vec<u32> {
        self.ranks
            .as_ref()
            .map(|r| r.scores.ranked().into_iter().map(NodeId::raw).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance the layout by one tick.
    ///
    /// Returns true once the layout has settled.
    pub fn tick(&mut self) -> Result<bool, JsError> {
        self.simulation.tick(&self.graph)?;
        Ok(self.simulation.is_settled())
    }

    /// Tick until settled or out of budget.
    ///
    /// Returns true if the layout settled.
    pub fn run(&mut self) -> Result<bool, JsError> {
        let outcome = self.simulation.run(&self.graph)?;
        Ok(outcome.converged)
    }

    /// Current alpha.
    pub fn alpha(&self) -> f32 {
        self.simulation.alpha()
    }

    /// Whether alpha has fallen below its minimum.
    #[wasm_bindgen(js_name = isSettled)]
    pub fn is_settled(&self) -> bool {
        self.simulation.is_settled()
    }

    /// Pin a node at a position.
    pub fn pin(&mut self, node: u32, x: f32, y: f32) -> Result<(), JsError> {
        Ok(self.simulation.pin(NodeId(node), x, y)?)
    }

    /// Release a pinned node.
    pub fn unpin(&mut self, node: u32) -> Result<(), JsError> {
        Ok(self.simulation.unpin(NodeId(node))?)
    }

    /// Set the alpha target; positive keeps the layout moving.
    pub fn reheat(&mut self, alpha_target: f32) -> Result<(), JsError> {
        Ok(self.simulation.reheat(alpha_target)?)
    }

    /// Set alpha directly, e.g. `1.0` to re-run the layout from hot.
    pub fn restart(&mut self, alpha: f32) -> Result<(), JsError> {
        Ok(self.simulation.restart(alpha)?)
    }

    /// Start dragging a node.
    #[wasm_bindgen(js_name = dragStart)]
    pub fn drag_start(&mut self, node: u32) -> Result<(), JsError> {
        Ok(self.simulation.drag_start(NodeId(node))?)
    }

    /// Move a dragged node to the pointer.
    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&mut self, node: u32, x: f32, y: f32) -> Result<(), JsError> {
        Ok(self.simulation.drag_to(NodeId(node), x, y)?)
    }

    /// Stop dragging a node.
    #[wasm_bindgen(js_name = dragEnd)]
    pub fn drag_end(&mut self, node: u32) -> Result<(), JsError> {
        Ok(self.simulation.drag_end(NodeId(node))?)
    }

    // =========================================================================
    // Position Buffer Access (Zero-Copy)
    // =========================================================================

    /// Get a zero-copy view of X positions.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Use immediately, do not store.
    #[wasm_bindgen(js_name = getPositionsXView)]
    pub fn get_positions_x_view(&self) -> Float32Array {
        unsafe { Float32Array::view(self.simulation.state().positions_x()) }
    }

    /// Get a zero-copy view of Y positions.
    ///
    /// # Safety
    ///
    /// The returned view is invalidated if any Rust allocation occurs.
    /// Use immediately, do not store.
    #[wasm_bindgen(js_name = getPositionsYView)]
    pub fn get_positions_y_view(&self) -> Float32Array {
        unsafe { Float32Array::view(self.simulation.state().positions_y()) }
    }

    /// Get a zero-copy view of X velocities.
    #[wasm_bindgen(js_name = getVelocitiesXView)]
    pub fn get_velocities_x_view(&self) -> Float32Array {
        unsafe { Float32Array::view(self.simulation.state().velocities_x()) }
    }

    /// Get a zero-copy view of Y velocities.
    #[wasm_bindgen(js_name = getVelocitiesYView)]
    pub fn get_velocities_y_view(&self) -> Float32Array {
        unsafe { Float32Array::view(self.simulation.state().velocities_y()) }
    }

    /// Get the bounding box of all nodes.
    ///
    /// Returns [min_x, min_y, max_x, max_y], or None if the graph is empty.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> Option<Vec<f32>> {
        self.simulation
            .state()
            .bounds()
            .map(|(min_x, min_y, max_x, max_y)| vec![min_x, min_y, max_x, max_y])
    }

    /// Copy positions as [x0, y0, x1, y1, ...].
    #[wasm_bindgen(js_name = getPositions)]
    pub fn get_positions(&self) -> Float32Array {
        Float32Array::from(&self.simulation.state().interleaved_positions()[..])
    }
}

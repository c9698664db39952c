//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::capture::CaptureService;
use crate::config::GameConfig;
use crate::engine::Engine;
use crate::fixed::{Energy, Fixed64};
use crate::id::*;
use crate::node_kind::NodeKind;
use crate::state::GameState;

// ===========================================================================
// Fixed-point helpers
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn energy(v: i32) -> Energy {
    Energy::from_num(v)
}

/// Put a packet on `edge` leaving `origin` without waiting for an emission.
/// Panics if the launch is refused.
pub fn inject_packet(
    state: &mut GameState,
    edge: EdgeId,
    owner: PlayerId,
    origin: NodeId,
    amount: Energy,
) -> PacketId {
    state
        .launch_packet(edge, owner, origin, amount)
        .expect("packet launch accepted")
}

// ===========================================================================
// Boards
// ===========================================================================

/// `n` neutral, empty nodes of `kind` joined in a line by unit-length edges.
pub fn line_graph(n: usize, kind: NodeKind) -> (GameState, Vec<NodeId>) {
    let mut state = GameState::default();
    let nodes: Vec<NodeId> = (0..n).map(|_| state.add_node(kind, Fixed64::ZERO)).collect();
    for pair in nodes.windows(2) {
        state
            .connect(pair[0], pair[1], Fixed64::ONE)
            .expect("line nodes are distinct");
    }
    (state, nodes)
}

/// `rows x cols` grid of neutral Standard nodes, row-major.
pub fn grid_graph(rows: usize, cols: usize) -> (GameState, Vec<NodeId>) {
    let mut state = GameState::default();
    let nodes: Vec<NodeId> = (0..rows * cols)
        .map(|_| state.add_node(NodeKind::Standard, Fixed64::ZERO))
        .collect();
    for r in 0..rows {
        for c in 0..cols {
            let here = nodes[r * cols + c];
            if c + 1 < cols {
                state
                    .connect(here, nodes[r * cols + c + 1], Fixed64::ONE)
                    .expect("grid nodes are distinct");
            }
            if r + 1 < rows {
                state
                    .connect(here, nodes[(r + 1) * cols + c], Fixed64::ONE)
                    .expect("grid nodes are distinct");
            }
        }
    }
    (state, nodes)
}

/// Two Standard nodes joined by one unit edge. Red starts on `a`, blue on
/// `b`, both with 100 energy.
pub struct Duel {
    pub state: GameState,
    pub a: NodeId,
    pub b: NodeId,
    pub edge: EdgeId,
    pub red: PlayerId,
    pub blue: PlayerId,
}

pub fn duel() -> Duel {
    let mut state = GameState::default();
    let a = state.add_node(NodeKind::Standard, Fixed64::ZERO);
    let b = state.add_node(NodeKind::Standard, Fixed64::ZERO);
    let edge = state.connect(a, b, Fixed64::ONE).expect("distinct nodes");
    let red = state.add_player("red");
    let blue = state.add_player("blue");
    let capture = CaptureService::new();
    capture
        .capture_initial_node(&mut state, red, a, energy(100))
        .expect("a is neutral");
    capture
        .capture_initial_node(&mut state, blue, b, energy(100))
        .expect("b is neutral");
    Duel {
        state,
        a,
        b,
        edge,
        red,
        blue,
    }
}

/// Ids of the board built by [`duel_engine`].
#[derive(Debug, Clone, Copy)]
pub struct DuelIds {
    pub a: NodeId,
    pub b: NodeId,
    pub edge: EdgeId,
    pub red: PlayerId,
    pub blue: PlayerId,
}

/// The [`duel`] board inside an engine running `config`. Initial nodes get
/// `config.starting_energy`.
pub fn duel_engine(config: GameConfig) -> (Engine, DuelIds) {
    let mut engine = Engine::new(config).expect("test config is valid");
    let a = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let b = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let edge = engine.connect(a, b, Fixed64::ONE).expect("distinct nodes");
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, a).expect("a is neutral");
    engine.claim_initial_node(blue, b).expect("b is neutral");
    (
        engine,
        DuelIds {
            a,
            b,
            edge,
            red,
            blue,
        },
    )
}

//! Read-only projection of match state.
//!
//! Snapshot types are owned copies built from live state. Nothing in them
//! aliases engine storage, so rendering and UI code can hold them across
//! ticks.

use crate::fixed::{Energy, Fixed64, Seconds, Ticks, as_f64, checked_div_64};
use crate::id::{EdgeId, NodeId, PacketId, PlayerId};
use crate::node_kind::NodeKind;
use crate::state::GameState;
use crate::victory::{VictoryService, VictoryState};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub owner: Option<PlayerId>,
    #[serde(serialize_with = "as_f64::serialize")]
    pub energy_pool: Energy,
    #[serde(serialize_with = "as_f64::serialize")]
    pub assigned: Energy,
    #[serde(serialize_with = "as_f64::serialize")]
    pub defense_energy: Energy,
    pub assignments: Vec<AssignmentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentSnapshot {
    pub edge: EdgeId,
    #[serde(serialize_with = "as_f64::serialize")]
    pub amount: Energy,
}

/// A packet in flight. `position` runs from the edge's `a` end (0) to its
/// `b` end (1) whatever the direction of travel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketSnapshot {
    pub id: PacketId,
    pub owner: PlayerId,
    #[serde(serialize_with = "as_f64::serialize")]
    pub amount: Energy,
    pub origin: NodeId,
    pub target: NodeId,
    #[serde(serialize_with = "as_f64::serialize")]
    pub position: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
    #[serde(serialize_with = "as_f64::serialize")]
    pub length: Fixed64,
    pub packets: Vec<PacketSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub owned_nodes: usize,
    /// Share of all nodes, 0..=100.
    #[serde(serialize_with = "as_f64::serialize")]
    pub ownership_percent: Fixed64,
    #[serde(serialize_with = "as_f64::serialize")]
    pub dominance_time: Seconds,
    #[serde(serialize_with = "as_f64::serialize")]
    pub pool_energy: Energy,
    #[serde(serialize_with = "as_f64::serialize")]
    pub in_flight_energy: Energy,
    #[serde(serialize_with = "as_f64::serialize")]
    pub total_energy: Energy,
    pub in_game: bool,
    pub eliminated: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub tick: Ticks,
    #[serde(serialize_with = "as_f64::serialize")]
    pub elapsed: Seconds,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub players: Vec<PlayerSnapshot>,
    pub outcome: VictoryState,
    pub winner: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl GameSnapshot {
    /// Copy out the current state of `state`, with dominance and outcome
    /// taken from `victory`.
    pub fn capture(state: &GameState, victory: &VictoryService, tick: Ticks) -> Self {
        let graph = state.graph();
        let total_nodes = graph.node_count();

        let nodes = graph
            .nodes()
            .map(|(id, node)| NodeSnapshot {
                id,
                kind: node.kind(),
                owner: node.owner(),
                energy_pool: node.energy_pool(),
                assigned: node.assigned_total(),
                defense_energy: node.defense_energy(),
                assignments: node
                    .assignments()
                    .iter()
                    .map(|(&edge, &amount)| AssignmentSnapshot { edge, amount })
                    .collect(),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(id, edge)| EdgeSnapshot {
                id,
                a: edge.a,
                b: edge.b,
                length: edge.length,
                packets: edge
                    .packets()
                    .iter()
                    .map(|packet| PacketSnapshot {
                        id: packet.id,
                        owner: packet.owner,
                        amount: packet.amount,
                        origin: packet.origin,
                        target: packet.target,
                        position: packet.position_on(edge),
                    })
                    .collect(),
            })
            .collect();

        let players = state
            .players()
            .map(|(id, player)| {
                let energy = state.player_energy(id);
                let owned = player.owned_count();
                PlayerSnapshot {
                    id,
                    name: player.name.clone(),
                    owned_nodes: owned,
                    ownership_percent: ownership_percent(owned, total_nodes),
                    dominance_time: victory.dominance_time(id),
                    pool_energy: energy.pool,
                    in_flight_energy: energy.in_flight,
                    total_energy: energy.total(),
                    in_game: player.is_in_game(),
                    eliminated: player.is_eliminated(),
                }
            })
            .collect();

        Self {
            tick,
            elapsed: victory.elapsed(),
            nodes,
            edges,
            players,
            outcome: victory.state(),
            winner: victory.result().and_then(|r| r.winner),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn packet_count(&self) -> usize {
        self.edges.iter().map(|e| e.packets.len()).sum()
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn ownership_percent(owned: usize, total: usize) -> Fixed64 {
    if total == 0 {
        return Fixed64::ZERO;
    }
    let scaled = Fixed64::from_num(owned as u32).saturating_mul(Fixed64::from_num(100));
    checked_div_64(scaled, Fixed64::from_num(total as u32)).unwrap_or(Fixed64::ZERO)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

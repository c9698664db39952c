//! Whole-state invariant checks.
//!
//! [`validate_state`] walks a [`GameState`] and reports every broken
//! invariant it finds. An empty result means the state is consistent. It is
//! meant for tests, debug assertions and desync hunting; the tick pipeline
//! never calls it.

use crate::capture::reachable_territory;
use crate::fixed::{Energy, Fixed64};
use crate::id::{EdgeId, NodeId, PacketId, PlayerId};
use crate::state::GameState;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("node {node:?} names owner {owner:?}, which does not exist")]
    UnknownOwner { node: NodeId, owner: PlayerId },
    #[error("node {node:?} names owner {owner:?} but is missing from their owned set")]
    OwnerNotInSet { node: NodeId, owner: PlayerId },
    #[error("player {player:?} lists node {node:?} without owning it")]
    SetMemberNotOwned { player: PlayerId, node: NodeId },
    #[error("node {node:?} assigns {assigned} from a pool of {pool}")]
    AssignmentsExceedPool {
        node: NodeId,
        assigned: Energy,
        pool: Energy,
    },
    #[error("node {node:?} assigns energy to edge {edge:?}, which does not touch it")]
    AssignmentOnForeignEdge { node: NodeId, edge: EdgeId },
    #[error("neutral node {0:?} has assignments")]
    NeutralAssignments(NodeId),
    #[error("packet {packet:?} on edge {edge:?} does not travel between its endpoints")]
    PacketEndpointMismatch { edge: EdgeId, packet: PacketId },
    #[error("packet {packet:?} on edge {edge:?} has progress outside [0, 1]")]
    ProgressOutOfRange { edge: EdgeId, packet: PacketId },
    #[error("packet {packet:?} on edge {edge:?} carries no energy")]
    EmptyPacket { edge: EdgeId, packet: PacketId },
    #[error("packet {packet:?} on edge {edge:?} belongs to a player no longer playing")]
    InactivePacketOwner { edge: EdgeId, packet: PacketId },
    #[error("player {0:?} is out of the match but still owns nodes")]
    InactiveOwnsNodes(PlayerId),
    #[error("active player {0:?} owns nodes but not their initial node")]
    InitialNodeLost(PlayerId),
    #[error("node {node:?} of player {player:?} is cut off from their initial node")]
    DisconnectedTerritory { player: PlayerId, node: NodeId },
}

/// Check every cross-entity invariant of `state`.
pub fn validate_state(state: &GameState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let graph = state.graph();

    for (id, node) in graph.nodes() {
        match node.owner() {
            Some(owner) => match state.player(owner) {
                None => violations.push(InvariantViolation::UnknownOwner { node: id, owner }),
                Some(player) if !player.owns(id) => {
                    violations.push(InvariantViolation::OwnerNotInSet { node: id, owner })
                }
                Some(_) => {}
            },
            None if !node.assignments().is_empty() => {
                violations.push(InvariantViolation::NeutralAssignments(id));
            }
            None => {}
        }

        let assigned = node.assigned_total();
        if assigned > node.energy_pool() {
            violations.push(InvariantViolation::AssignmentsExceedPool {
                node: id,
                assigned,
                pool: node.energy_pool(),
            });
        }
        for &edge in node.assignments().keys() {
            if !graph.edge(edge).is_some_and(|e| e.connects(id)) {
                violations.push(InvariantViolation::AssignmentOnForeignEdge { node: id, edge });
            }
        }
    }

    for (edge_id, edge) in graph.edges() {
        for packet in edge.packets() {
            let forward = packet.origin == edge.a && packet.target == edge.b;
            let backward = packet.origin == edge.b && packet.target == edge.a;
            if !forward && !backward {
                violations.push(InvariantViolation::PacketEndpointMismatch {
                    edge: edge_id,
                    packet: packet.id,
                });
            }
            if packet.progress < Fixed64::ZERO || packet.progress > Fixed64::ONE {
                violations.push(InvariantViolation::ProgressOutOfRange {
                    edge: edge_id,
                    packet: packet.id,
                });
            }
            if packet.amount <= Fixed64::ZERO {
                violations.push(InvariantViolation::EmptyPacket {
                    edge: edge_id,
                    packet: packet.id,
                });
            }
            if !state.player(packet.owner).is_some_and(|p| p.is_active()) {
                violations.push(InvariantViolation::InactivePacketOwner {
                    edge: edge_id,
                    packet: packet.id,
                });
            }
        }
    }

    for (id, player) in state.players() {
        for &node in player.owned_nodes() {
            if graph.node(node).and_then(|n| n.owner()) != Some(id) {
                violations.push(InvariantViolation::SetMemberNotOwned { player: id, node });
            }
        }
        if !player.is_active() {
            if player.owned_count() > 0 {
                violations.push(InvariantViolation::InactiveOwnsNodes(id));
            }
            continue;
        }
        if player.owned_count() == 0 {
            continue;
        }
        let Some(initial) = player.initial_node().filter(|&n| player.owns(n)) else {
            violations.push(InvariantViolation::InitialNodeLost(id));
            continue;
        };
        let reachable = reachable_territory(graph, id, initial, None);
        for &node in player.owned_nodes() {
            if !reachable.contains(&node) {
                violations.push(InvariantViolation::DisconnectedTerritory { player: id, node });
            }
        }
    }

    violations
}

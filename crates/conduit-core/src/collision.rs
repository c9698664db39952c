//! Packet-vs-packet collisions and packet-vs-node arrival decisions.
//!
//! [`CollisionService::resolve_edge_collisions`] rewrites one edge's packet
//! list. [`CollisionService::resolve_node_arrival_intent`] is a pure decision:
//! it classifies an arrival into an [`ArrivalOutcome`] and leaves applying it
//! to the tick pipeline.

use crate::fixed::{Energy, Fixed64, checked_div_64};
use crate::graph::{EnergyPacket, Node};
use crate::id::{EdgeId, NodeId, PlayerId};
use crate::state::GameState;
use tracing::debug;

// ---------------------------------------------------------------------------
// Edge collisions
// ---------------------------------------------------------------------------

/// Two packets of the same owner cancelled each other out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasteWarning {
    pub player: PlayerId,
    pub edge: EdgeId,
    /// Sum of both packets' amounts.
    pub amount_lost: Energy,
}

/// What one call to [`CollisionService::resolve_edge_collisions`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeCollisionReport {
    /// Number of colliding pairs.
    pub collisions: usize,
    /// Packets removed from the edge, including ones replaced by survivors.
    pub packets_destroyed: usize,
    /// Reduced replacement packets put back on the edge.
    pub packets_survived: usize,
    pub waste_warnings: Vec<WasteWarning>,
}

// ---------------------------------------------------------------------------
// Arrival outcomes
// ---------------------------------------------------------------------------

/// A packet to send back along the edge after a repelled attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnPacket {
    pub owner: PlayerId,
    pub origin: NodeId,
    pub target: NodeId,
    pub amount: Energy,
}

/// Classification of a packet reaching its target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// The node already belongs to the packet's owner; the whole amount joins
    /// the pool.
    Integrated { energy: Energy },
    /// Attack exceeded defense. The node changes hands and keeps the excess.
    Captured {
        previous_owner: Option<PlayerId>,
        defense: Energy,
        energy_integrated: Energy,
    },
    /// Attack exactly matched defense. The node is left ownerless and empty.
    Neutralized {
        previous_owner: Option<PlayerId>,
        defense: Energy,
    },
    /// Attack fell short. The node's pool drops by `pool_loss`, which lowers
    /// its defense by exactly the attack energy.
    Defeated {
        defense: Energy,
        pool_loss: Energy,
        return_packet: Option<ReturnPacket>,
    },
}

// ---------------------------------------------------------------------------
// CollisionService
// ---------------------------------------------------------------------------

/// Collision and arrival rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionService {
    threshold: Fixed64,
    return_defeated_packets: bool,
}

impl CollisionService {
    pub fn new(threshold: Fixed64, return_defeated_packets: bool) -> Self {
        Self {
            threshold,
            return_defeated_packets,
        }
    }

    pub fn threshold(&self) -> Fixed64 {
        self.threshold
    }

    /// Resolve every colliding pair of packets on `edge_id`.
    ///
    /// Pairs are examined in emission order; a packet destroyed by one pair
    /// takes no part in later pairs, and reduced survivors are appended after
    /// the pass so they only collide again on the next tick.
    pub fn resolve_edge_collisions(
        &self,
        state: &mut GameState,
        edge_id: EdgeId,
    ) -> EdgeCollisionReport {
        let mut report = EdgeCollisionReport::default();

        let Some(edge) = state.graph.edge_mut(edge_id) else {
            return report;
        };
        if edge.packets.len() < 2 {
            return report;
        }
        let packets = std::mem::take(&mut edge.packets);
        let positions: Vec<Fixed64> = packets.iter().map(|p| p.position_on(edge)).collect();

        let mut destroyed = vec![false; packets.len()];
        let mut survivors: Vec<EnergyPacket> = Vec::new();

        for i in 0..packets.len() {
            for j in (i + 1)..packets.len() {
                if destroyed[i] || destroyed[j] {
                    continue;
                }
                let (first, second) = (&packets[i], &packets[j]);
                if (positions[i] - positions[j]).abs() > self.threshold {
                    continue;
                }

                if first.owner == second.owner {
                    if first.same_direction(second) {
                        continue;
                    }
                    let amount_lost = first.amount.saturating_add(second.amount);
                    debug!(edge = ?edge_id, player = ?first.owner, %amount_lost, "friendly packets cancelled");
                    report.waste_warnings.push(WasteWarning {
                        player: first.owner,
                        edge: edge_id,
                        amount_lost,
                    });
                } else {
                    let absorbed = first.amount.min(second.amount);
                    debug!(edge = ?edge_id, %absorbed, "hostile packets collided");
                    for packet in [first, second] {
                        let remaining = packet.amount - absorbed;
                        if remaining > Fixed64::ZERO {
                            survivors.push(EnergyPacket {
                                amount: remaining,
                                ..packet.clone()
                            });
                        }
                    }
                }

                destroyed[i] = true;
                destroyed[j] = true;
                report.collisions += 1;
                report.packets_destroyed += 2;
            }
        }

        let mut kept: Vec<EnergyPacket> = packets
            .into_iter()
            .zip(destroyed)
            .filter_map(|(packet, gone)| (!gone).then_some(packet))
            .collect();
        report.packets_survived = survivors.len();
        for mut survivor in survivors {
            survivor.id = state.allocate_packet_id();
            kept.push(survivor);
        }

        if let Some(edge) = state.graph.edge_mut(edge_id) {
            edge.packets = kept;
        }
        report
    }

    /// Decide what happens when `packet` reaches `node`.
    ///
    /// `origin_owner` is the current owner of the packet's origin node; a
    /// repelled packet only bounces back if its owner still holds the origin.
    /// The three-way comparison of attack against defense is exact.
    pub fn resolve_node_arrival_intent(
        &self,
        packet: &EnergyPacket,
        node: &Node,
        origin_owner: Option<PlayerId>,
    ) -> ArrivalOutcome {
        let attacker = packet.owner;
        let previous_owner = node.owner();

        if previous_owner == Some(attacker) {
            return ArrivalOutcome::Integrated {
                energy: packet.amount,
            };
        }

        let defense = node.defense_energy();
        let attack = packet.amount;

        match attack.cmp(&defense) {
            std::cmp::Ordering::Greater => ArrivalOutcome::Captured {
                previous_owner,
                defense,
                energy_integrated: attack - defense,
            },
            std::cmp::Ordering::Equal => ArrivalOutcome::Neutralized {
                previous_owner,
                defense,
            },
            std::cmp::Ordering::Less => {
                let pool_loss = checked_div_64(attack, node.stats().defense_multiplier)
                    .unwrap_or(node.free_energy())
                    .min(node.free_energy());
                let return_packet = (self.return_defeated_packets
                    && origin_owner == Some(attacker))
                .then_some(ReturnPacket {
                    owner: attacker,
                    origin: packet.target,
                    target: packet.origin,
                    amount: attack,
                });
                ArrivalOutcome::Defeated {
                    defense,
                    pool_loss,
                    return_packet,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

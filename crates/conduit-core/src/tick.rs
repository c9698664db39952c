//! The per-frame pipeline.
//!
//! [`TickService::execute_tick`] runs five phases in a fixed order:
//!
//! 1. **Defenses** -- refresh the defense timer of every owned node whose
//!    defense interval elapsed. Defense values themselves are derived live.
//! 2. **Emission** -- every owned node whose attack interval elapsed launches
//!    one packet per assigned edge, carrying `assigned * attack_multiplier`.
//!    Pools are never drained by emission.
//! 3. **Advance** -- packets move `dt * speed / length` along their edge.
//! 4. **Collisions** -- packets meeting on an edge cancel out.
//! 5. **Arrivals** -- packets that reached their target are removed and
//!    applied: integrate, capture, neutralize or repel.
//!
//! Collisions always resolve before arrivals so a cancelled packet never
//! reaches a node. All timers live in a [`TickClock`] the caller threads
//! through every call.

use crate::capture::{CaptureError, CaptureService};
use crate::collision::{ArrivalOutcome, CollisionService, EdgeCollisionReport, WasteWarning};
use crate::config::GameConfig;
use crate::fixed::{Energy, Fixed64, Seconds, checked_div_64};
use crate::graph::EnergyPacket;
use crate::id::{EdgeId, NodeId, PacketId, PlayerId};
use crate::state::GameState;
use slotmap::SecondaryMap;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal failures of a tick. The state should be treated as corrupt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    #[error("tick delta must not be negative, got {0}")]
    NegativeDelta(Seconds),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time and per-node timers of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    pub(crate) now: Seconds,
    pub(crate) accumulator: Seconds,
    last_emission: SecondaryMap<NodeId, Seconds>,
    last_defense_update: SecondaryMap<NodeId, Seconds>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated seconds since the clock started.
    pub fn now(&self) -> Seconds {
        self.now
    }

    /// Frame time carried over by the fixed-timestep strategy.
    pub fn accumulator(&self) -> Seconds {
        self.accumulator
    }

    /// When `node` last emitted. Never-emitted nodes count from zero.
    pub fn last_emission(&self, node: NodeId) -> Seconds {
        self.last_emission.get(node).copied().unwrap_or(Fixed64::ZERO)
    }

    /// When `node` last refreshed its defense.
    pub fn last_defense_update(&self, node: NodeId) -> Seconds {
        self.last_defense_update
            .get(node)
            .copied()
            .unwrap_or(Fixed64::ZERO)
    }

    /// Clear every timer and the frame accumulator. Between games only.
    pub fn reset(&mut self) {
        self.now = Fixed64::ZERO;
        self.accumulator = Fixed64::ZERO;
        self.last_emission.clear();
        self.last_defense_update.clear();
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A packet launched during the emission phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionRecord {
    pub node: NodeId,
    pub edge: EdgeId,
    pub player: PlayerId,
    pub packet: PacketId,
    pub amount: Energy,
}

/// A packet applied to its target node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalRecord {
    pub edge: EdgeId,
    pub packet: PacketId,
    pub node: NodeId,
    pub attacker: PlayerId,
    pub amount: Energy,
    pub outcome: ArrivalOutcome,
    /// Capture bonus credited to the attacker.
    pub energy_bonus: Energy,
    /// Energy pulled in from the attacker's assignments towards this node.
    pub transferred: Energy,
    /// Nodes released by the cascade this arrival triggered, per player.
    pub disconnected: Vec<(PlayerId, Vec<NodeId>)>,
    pub eliminated: Option<PlayerId>,
    /// Id of the packet sent back after a repelled attack.
    pub returned: Option<PacketId>,
}

/// Everything one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Delta this tick ran with.
    pub dt: Seconds,
    pub defenses_refreshed: usize,
    pub emissions: Vec<EmissionRecord>,
    /// Non-empty collision results, per edge.
    pub collisions: Vec<(EdgeId, EdgeCollisionReport)>,
    pub arrivals: Vec<ArrivalRecord>,
    /// Arrivals dropped because their owner left the game mid-tick.
    pub discarded_arrivals: usize,
}

impl TickReport {
    pub fn collision_count(&self) -> usize {
        self.collisions.iter().map(|(_, r)| r.collisions).sum()
    }

    pub fn waste_warnings(&self) -> impl Iterator<Item = &WasteWarning> {
        self.collisions
            .iter()
            .flat_map(|(_, r)| r.waste_warnings.iter())
    }

    /// Players eliminated during this tick, in order.
    pub fn eliminated(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.arrivals.iter().filter_map(|a| a.eliminated)
    }
}

// ---------------------------------------------------------------------------
// TickService
// ---------------------------------------------------------------------------

/// Runs the five-phase pipeline over a [`GameState`].
#[derive(Debug, Clone, Copy)]
pub struct TickService {
    packet_speed: Fixed64,
    collision: CollisionService,
    capture: CaptureService,
}

impl TickService {
    pub fn new(packet_speed: Fixed64, collision: CollisionService) -> Self {
        Self {
            packet_speed,
            collision,
            capture: CaptureService::new(),
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.packet_speed,
            CollisionService::new(config.collision_threshold, config.return_defeated_packets),
        )
    }

    pub fn collision(&self) -> &CollisionService {
        &self.collision
    }

    pub fn capture(&self) -> &CaptureService {
        &self.capture
    }

    /// Advance `clock` by `dt` and run every phase once.
    pub fn execute_tick(
        &self,
        state: &mut GameState,
        clock: &mut TickClock,
        dt: Seconds,
    ) -> Result<TickReport, TickError> {
        if dt < Fixed64::ZERO {
            return Err(TickError::NegativeDelta(dt));
        }
        clock.now = clock.now.saturating_add(dt);
        let span = tracing::debug_span!("tick", now = %clock.now);
        let _enter = span.enter();

        let mut report = TickReport {
            dt,
            ..TickReport::default()
        };
        report.defenses_refreshed = self.update_defenses(state, clock);
        self.emit_energy_packets(state, clock, &mut report);
        self.advance_packets(state, dt);
        self.resolve_collisions(state, &mut report);
        self.resolve_arrivals(state, &mut report)?;
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    fn update_defenses(&self, state: &GameState, clock: &mut TickClock) -> usize {
        let now = clock.now;
        let mut refreshed = 0;
        for (id, node) in state.graph.nodes() {
            if node.is_neutral() {
                continue;
            }
            if now - clock.last_defense_update(id) >= node.stats().defense_interval {
                clock.last_defense_update.insert(id, now);
                refreshed += 1;
            }
        }
        refreshed
    }

    fn emit_energy_packets(
        &self,
        state: &mut GameState,
        clock: &mut TickClock,
        report: &mut TickReport,
    ) {
        let now = clock.now;
        let mut due: Vec<(NodeId, PlayerId, Fixed64, Vec<(EdgeId, Energy)>)> = Vec::new();
        for (id, node) in state.graph.nodes() {
            let Some(owner) = node.owner() else {
                continue;
            };
            if now - clock.last_emission(id) < node.stats().attack_interval {
                continue;
            }
            clock.last_emission.insert(id, now);
            let assigned: Vec<(EdgeId, Energy)> = node
                .assignments()
                .iter()
                .filter(|&(_, &amount)| amount > Fixed64::ZERO)
                .map(|(&edge, &amount)| (edge, amount))
                .collect();
            if !assigned.is_empty() {
                due.push((id, owner, node.stats().attack_multiplier, assigned));
            }
        }

        for (node, owner, multiplier, assigned) in due {
            for (edge, amount) in assigned {
                let attack = amount.saturating_mul(multiplier);
                let Some(packet) = state.launch_packet(edge, owner, node, attack) else {
                    continue;
                };
                trace!(?node, ?edge, %attack, "packet emitted");
                report.emissions.push(EmissionRecord {
                    node,
                    edge,
                    player: owner,
                    packet,
                    amount: attack,
                });
            }
        }
    }

    fn advance_packets(&self, state: &mut GameState, dt: Seconds) {
        let distance = dt.saturating_mul(self.packet_speed);
        for (_, edge) in state.graph.edges_mut() {
            let step = checked_div_64(distance, edge.length).unwrap_or(Fixed64::ONE);
            for packet in edge.packets.iter_mut() {
                packet.progress = packet.progress.saturating_add(step).min(Fixed64::ONE);
            }
        }
    }

    fn resolve_collisions(&self, state: &mut GameState, report: &mut TickReport) {
        for edge in state.graph.edge_ids() {
            let result = self.collision.resolve_edge_collisions(state, edge);
            if result.collisions > 0 {
                report.collisions.push((edge, result));
            }
        }
    }

    fn resolve_arrivals(
        &self,
        state: &mut GameState,
        report: &mut TickReport,
    ) -> Result<(), TickError> {
        let mut arrived: Vec<(EdgeId, EnergyPacket)> = Vec::new();
        for (edge_id, edge) in state.graph.edges_mut() {
            if !edge.packets.iter().any(EnergyPacket::has_arrived) {
                continue;
            }
            let (done, travelling): (Vec<_>, Vec<_>) = std::mem::take(&mut edge.packets)
                .into_iter()
                .partition(EnergyPacket::has_arrived);
            edge.packets = travelling;
            arrived.extend(done.into_iter().map(|packet| (edge_id, packet)));
        }

        for (edge, packet) in arrived {
            let owner_active = state.player(packet.owner).is_some_and(|p| p.is_active());
            if !owner_active {
                report.discarded_arrivals += 1;
                continue;
            }
            if let Some(record) = self.apply_arrival(state, edge, &packet)? {
                report.arrivals.push(record);
            }
        }
        Ok(())
    }

    fn apply_arrival(
        &self,
        state: &mut GameState,
        edge: EdgeId,
        packet: &EnergyPacket,
    ) -> Result<Option<ArrivalRecord>, TickError> {
        let node_id = packet.target;
        let origin_owner = state.graph.node(packet.origin).and_then(|n| n.owner());
        let Some(node) = state.graph.node(node_id) else {
            return Ok(None);
        };
        let outcome = self
            .collision
            .resolve_node_arrival_intent(packet, node, origin_owner);

        let mut record = ArrivalRecord {
            edge,
            packet: packet.id,
            node: node_id,
            attacker: packet.owner,
            amount: packet.amount,
            outcome,
            energy_bonus: Fixed64::ZERO,
            transferred: Fixed64::ZERO,
            disconnected: Vec::new(),
            eliminated: None,
            returned: None,
        };

        match outcome {
            ArrivalOutcome::Integrated { energy } => {
                if let Some(node) = state.graph.node_mut(node_id) {
                    node.add_energy(energy);
                }
            }
            ArrivalOutcome::Captured {
                previous_owner,
                energy_integrated,
                ..
            } => {
                let result = self.capture.capture_node_with_articulation_check(
                    state,
                    node_id,
                    packet.owner,
                    previous_owner,
                )?;
                if let Some(node) = state.graph.node_mut(node_id) {
                    node.set_energy_pool(result.energy_bonus.saturating_add(energy_integrated));
                }
                record.energy_bonus = result.energy_bonus;
                record.eliminated = result.player_eliminated;
                if let Some(prev) = previous_owner.filter(|_| !result.nodes_lost.is_empty()) {
                    record.disconnected.push((prev, result.nodes_lost));
                }
                record.transferred = self.pull_attacker_assignments(state, node_id, packet.owner);

                let stranded = self
                    .capture
                    .handle_articulation_capture(state, node_id, packet.owner)?;
                if stranded.contains(&node_id) {
                    // Out of reach of the attacker's territory: the node is
                    // emptied and the bonus taken back.
                    if let Some(node) = state.graph.node_mut(node_id) {
                        node.reset_to_neutral();
                    }
                    if let Some(attacker) = state.player_mut(packet.owner) {
                        attacker.revoke_bonus(record.energy_bonus);
                    }
                    record.energy_bonus = Fixed64::ZERO;
                }
                if !stranded.is_empty() {
                    record.disconnected.push((packet.owner, stranded));
                }
                debug!(node = ?node_id, attacker = ?packet.owner, ?previous_owner, "captured on arrival");
            }
            ArrivalOutcome::Neutralized { previous_owner, .. } => {
                if let Some(prev) = previous_owner {
                    let result = self
                        .capture
                        .neutralize_node_with_articulation_check(state, node_id, prev)?;
                    record.eliminated = result.player_eliminated;
                    if !result.nodes_lost.is_empty() {
                        record.disconnected.push((prev, result.nodes_lost));
                    }
                }
                if let Some(node) = state.graph.node_mut(node_id) {
                    node.reset_to_neutral();
                }
            }
            ArrivalOutcome::Defeated {
                pool_loss,
                return_packet,
                ..
            } => {
                if let Some(node) = state.graph.node_mut(node_id) {
                    let pool = node.energy_pool();
                    node.set_energy_pool(pool - pool_loss);
                }
                if let Some(back) = return_packet {
                    record.returned = state.launch_packet(edge, back.owner, back.origin, back.amount);
                }
            }
        }
        Ok(Some(record))
    }

    /// Move the attacker's assignments aimed at `captured` into its pool.
    /// Each neighbour owned by `attacker` gives up the assignment on the
    /// shared edge and the matching amount of pool.
    fn pull_attacker_assignments(
        &self,
        state: &mut GameState,
        captured: NodeId,
        attacker: PlayerId,
    ) -> Energy {
        let feeders: Vec<(EdgeId, NodeId)> = state.graph.neighbors(captured).collect();
        let mut total = Fixed64::ZERO;
        for (edge, far) in feeders {
            let Some(neighbor) = state.graph.node_mut(far) else {
                continue;
            };
            if neighbor.owner() != Some(attacker) {
                continue;
            }
            let amount = neighbor.take_assignment(edge);
            if amount <= Fixed64::ZERO {
                continue;
            }
            let pool = neighbor.energy_pool();
            neighbor.set_energy_pool(pool - amount);
            total = total.saturating_add(amount);
        }
        if total > Fixed64::ZERO {
            if let Some(node) = state.graph.node_mut(captured) {
                node.add_energy(total);
            }
        }
        total
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! The mutable world a match runs on: graph, players and packet ids.

use crate::fixed::{Energy, Fixed64};
use crate::graph::{EnergyPacket, Graph, GraphError};
use crate::id::*;
use crate::node_kind::{NodeKind, NodeKindTable};
use crate::player::Player;
use crate::sim::StateHash;
use slotmap::SlotMap;

/// Energy held by one player, split by where it currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerEnergy {
    /// Sum of the pools of every owned node.
    pub pool: Energy,
    /// Sum of the amounts of the player's packets still on edges.
    pub in_flight: Energy,
}

impl PlayerEnergy {
    pub fn total(&self) -> Energy {
        self.pool.saturating_add(self.in_flight)
    }
}

/// Graph plus players. Everything the tick pipeline mutates lives here.
#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) graph: Graph,
    pub(crate) players: SlotMap<PlayerId, Player>,
    kinds: NodeKindTable,
    next_packet: u64,
}

impl GameState {
    /// Create an empty world whose nodes take their constants from `kinds`.
    pub fn new(kinds: NodeKindTable) -> Self {
        Self {
            graph: Graph::new(),
            players: SlotMap::with_key(),
            kinds,
            next_packet: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Add a neutral node of `kind` holding `energy`.
    pub fn add_node(&mut self, kind: NodeKind, energy: Energy) -> NodeId {
        let stats = *self.kinds.get(kind);
        self.graph.add_node(kind, stats, energy)
    }

    /// Connect two nodes. See [`Graph::connect`].
    pub fn connect(&mut self, a: NodeId, b: NodeId, length: Fixed64) -> Result<EdgeId, GraphError> {
        self.graph.connect(a, b, length)
    }

    /// Register a player. They own nothing until their initial node is
    /// captured.
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        self.players.insert(Player::new(name))
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable graph access for construction-time edits such as pool
    /// overrides. Ownership cannot be changed through this handle.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn node_kinds(&self) -> &NodeKindTable {
        &self.kinds
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Iterate over all players in registration order.
    pub fn players(&self) -> impl Iterator<Item = (PlayerId, &Player)> {
        self.players.iter()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().collect()
    }

    /// Players in the game and not eliminated.
    pub fn active_players(&self) -> impl Iterator<Item = (PlayerId, &Player)> {
        self.players.iter().filter(|(_, p)| p.is_active())
    }

    /// Current pool and in-flight energy of `player`.
    pub fn player_energy(&self, player: PlayerId) -> PlayerEnergy {
        let mut energy = PlayerEnergy::default();
        if let Some(data) = self.players.get(player) {
            for &node in data.owned_nodes() {
                if let Some(n) = self.graph.node(node) {
                    energy.pool = energy.pool.saturating_add(n.energy_pool());
                }
            }
        }
        for (_, edge) in self.graph.edges() {
            for packet in edge.packets().iter().filter(|p| p.owner == player) {
                energy.in_flight = energy.in_flight.saturating_add(packet.amount);
            }
        }
        energy
    }

    // -----------------------------------------------------------------------
    // Packets
    // -----------------------------------------------------------------------

    pub(crate) fn allocate_packet_id(&mut self) -> PacketId {
        let id = PacketId(self.next_packet);
        self.next_packet += 1;
        id
    }

    /// Put a new packet on `edge`, leaving `origin` towards the far endpoint.
    /// Returns `None` if the edge does not exist or does not touch `origin`,
    /// if `amount` is not positive, or if `owner` is not an active player.
    pub(crate) fn launch_packet(
        &mut self,
        edge: EdgeId,
        owner: PlayerId,
        origin: NodeId,
        amount: Energy,
    ) -> Option<PacketId> {
        let active = self.players.get(owner).is_some_and(|p| p.is_active());
        if amount <= Fixed64::ZERO || !active {
            return None;
        }
        let target = self.graph.edge(edge)?.other(origin)?;
        let id = self.allocate_packet_id();
        self.graph.edge_mut(edge)?.packets.push(EnergyPacket {
            id,
            owner,
            amount,
            origin,
            target,
            progress: Fixed64::ZERO,
        });
        Some(id)
    }

    /// Remove every in-flight packet owned by `player`. Returns how many
    /// were removed.
    pub(crate) fn remove_packets_of(&mut self, player: PlayerId) -> usize {
        let mut removed = 0;
        for (_, edge) in self.graph.edges_mut() {
            let before = edge.packets.len();
            edge.packets.retain(|p| p.owner != player);
            removed += before - edge.packets.len();
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Hashing
    // -----------------------------------------------------------------------

    /// Deterministic hash of ownership, pools, assignments, packets and
    /// player flags.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        let player_index = |id: Option<PlayerId>| -> u64 {
            id.and_then(|id| self.players.keys().position(|k| k == id))
                .map_or(u64::MAX, |i| i as u64)
        };

        for (_, node) in self.graph.nodes() {
            h.write_u64(player_index(node.owner()));
            h.write_fixed64(node.energy_pool());
            h.write_u64(node.assignments().len() as u64);
            for &amount in node.assignments().values() {
                h.write_fixed64(amount);
            }
        }
        for (_, edge) in self.graph.edges() {
            h.write_u64(edge.packets().len() as u64);
            for packet in edge.packets() {
                h.write_u64(packet.id.0);
                h.write_u64(player_index(Some(packet.owner)));
                h.write_fixed64(packet.amount);
                h.write_fixed64(packet.progress);
            }
        }
        for (_, player) in self.players.iter() {
            h.write_u64(player.owned_count() as u64);
            h.write_u32(u32::from(player.is_eliminated()));
        }
        h.finish()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(NodeKindTable::default())
    }
}

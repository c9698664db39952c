use crate::fixed::{Energy, Fixed64};
use crate::id::*;
use crate::node_kind::{NodeKind, NodeKindStats};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while building or editing the contest graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeId),
    #[error("cannot connect node {0:?} to itself")]
    SelfLoop(NodeId),
    #[error("nodes {0:?} and {1:?} are already connected")]
    DuplicateEdge(NodeId, NodeId),
    #[error("edge length must be positive, got {0}")]
    InvalidLength(Fixed64),
    #[error("energy pool {pool} of node {node:?} is below its assigned total {assigned}")]
    PoolBelowAssigned {
        node: NodeId,
        pool: Energy,
        assigned: Energy,
    },
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A node of the contest graph.
///
/// The kind and its constants are fixed when the graph is built. Owner, pool
/// and assignments change only through the capture service, the command
/// surface and the tick pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    stats: NodeKindStats,
    owner: Option<PlayerId>,
    energy_pool: Energy,
    assignments: BTreeMap<EdgeId, Energy>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn stats(&self) -> &NodeKindStats {
        &self.stats
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    pub fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }

    pub fn energy_pool(&self) -> Energy {
        self.energy_pool
    }

    /// Per-edge assignment table. Only positive amounts are stored.
    pub fn assignments(&self) -> &BTreeMap<EdgeId, Energy> {
        &self.assignments
    }

    /// Energy assigned to `edge`, zero if none.
    pub fn assignment(&self, edge: EdgeId) -> Energy {
        self.assignments.get(&edge).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Sum of all per-edge assignments.
    pub fn assigned_total(&self) -> Energy {
        self.assignments
            .values()
            .fold(Fixed64::ZERO, |acc, &amount| acc.saturating_add(amount))
    }

    /// Pool energy not committed to any edge.
    pub fn free_energy(&self) -> Energy {
        (self.energy_pool - self.assigned_total()).max(Fixed64::ZERO)
    }

    /// `(pool - assigned) * defense_multiplier`, always derived live.
    pub fn defense_energy(&self) -> Energy {
        self.free_energy()
            .saturating_mul(self.stats.defense_multiplier)
    }

    // -- crate-internal mutation --

    pub(crate) fn set_owner(&mut self, owner: Option<PlayerId>) {
        self.owner = owner;
    }

    pub(crate) fn set_energy_pool(&mut self, energy: Energy) {
        self.energy_pool = energy.max(Fixed64::ZERO);
    }

    pub(crate) fn add_energy(&mut self, energy: Energy) {
        self.energy_pool = self.energy_pool.saturating_add(energy);
    }

    pub(crate) fn set_assignment(&mut self, edge: EdgeId, amount: Energy) {
        if amount > Fixed64::ZERO {
            self.assignments.insert(edge, amount);
        } else {
            self.assignments.remove(&edge);
        }
    }

    pub(crate) fn take_assignment(&mut self, edge: EdgeId) -> Energy {
        self.assignments.remove(&edge).unwrap_or(Fixed64::ZERO)
    }

    pub(crate) fn clear_assignments(&mut self) {
        self.assignments.clear();
    }

    /// Drop owner, pool and assignments.
    pub(crate) fn reset_to_neutral(&mut self) {
        self.owner = None;
        self.energy_pool = Fixed64::ZERO;
        self.assignments.clear();
    }
}

// ---------------------------------------------------------------------------
// Packets and edges
// ---------------------------------------------------------------------------

/// A discrete amount of energy travelling along an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyPacket {
    pub id: PacketId,
    pub owner: PlayerId,
    pub amount: Energy,
    pub origin: NodeId,
    pub target: NodeId,
    /// Fraction of the edge covered, from origin (0) to target (1).
    pub progress: Fixed64,
}

impl EnergyPacket {
    /// Position along `edge`, normalized so that 0 is `edge.a` and 1 is
    /// `edge.b`, regardless of the packet's travel direction.
    pub fn position_on(&self, edge: &Edge) -> Fixed64 {
        if self.origin == edge.a {
            self.progress
        } else {
            Fixed64::ONE - self.progress
        }
    }

    /// True once the packet has covered the whole edge.
    pub fn has_arrived(&self) -> bool {
        self.progress >= Fixed64::ONE
    }

    /// True when both packets travel between the same endpoints in the same
    /// direction.
    pub fn same_direction(&self, other: &EnergyPacket) -> bool {
        self.origin == other.origin && self.target == other.target
    }
}

/// An undirected edge with the packets currently in flight on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    /// Transit length. Packets cover `speed * dt / length` per tick.
    pub length: Fixed64,
    /// In-flight packets in emission order.
    pub(crate) packets: Vec<EnergyPacket>,
}

impl Edge {
    /// The endpoint opposite `node`, or `None` if `node` is not an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn connects(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }

    pub fn packets(&self) -> &[EnergyPacket] {
        &self.packets
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// The contest graph. Topology is fixed once the match starts; only node
/// state and edge packet lists change during ticks.
///
/// Adjacency is stored in a `SecondaryMap` keyed by `NodeId`, so lookups stay
/// in sync with the primary `nodes` SlotMap.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: SlotMap<NodeId, Node>,
    edges: SlotMap<EdgeId, Edge>,
    adjacency: SecondaryMap<NodeId, Vec<EdgeId>>,
}

impl Graph {
    /// Create a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a neutral node of `kind` with the given constants and starting pool.
    pub fn add_node(&mut self, kind: NodeKind, stats: NodeKindStats, energy: Energy) -> NodeId {
        let id = self.nodes.insert(Node {
            kind,
            stats,
            owner: None,
            energy_pool: energy.max(Fixed64::ZERO),
            assignments: BTreeMap::new(),
        });
        self.adjacency.insert(id, Vec::new());
        id
    }

    /// Connect two distinct nodes with an undirected edge of positive length.
    pub fn connect(&mut self, a: NodeId, b: NodeId, length: Fixed64) -> Result<EdgeId, GraphError> {
        if !self.nodes.contains_key(a) {
            return Err(GraphError::NodeNotFound(a));
        }
        if !self.nodes.contains_key(b) {
            return Err(GraphError::NodeNotFound(b));
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if length <= Fixed64::ZERO {
            return Err(GraphError::InvalidLength(length));
        }
        if self.edge_between(a, b).is_some() {
            return Err(GraphError::DuplicateEdge(a, b));
        }

        let id = self.edges.insert(Edge {
            a,
            b,
            length,
            packets: Vec::new(),
        });
        for endpoint in [a, b] {
            if let Some(list) = self.adjacency.get_mut(endpoint) {
                list.push(id);
            }
        }
        Ok(id)
    }

    /// Overwrite a node's pool. Refuses values below the node's assigned
    /// total so the assignment invariant cannot be broken from outside.
    pub fn set_energy_pool(&mut self, node: NodeId, energy: Energy) -> Result<(), GraphError> {
        let data = self
            .nodes
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let assigned = data.assigned_total();
        if energy < assigned {
            return Err(GraphError::PoolBelowAssigned {
                node,
                pool: energy,
                assigned,
            });
        }
        data.set_energy_pool(energy);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Iterate over all edges in slot order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter()
    }

    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = (EdgeId, &mut Edge)> {
        self.edges.iter_mut()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.keys().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges touching `node`, in connection order.
    pub fn incident_edges(&self, node: NodeId) -> &[EdgeId] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(edge, far endpoint)` pairs for every edge touching `node`.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        self.incident_edges(node).iter().filter_map(move |&edge_id| {
            self.edges
                .get(edge_id)
                .and_then(|edge| edge.other(node))
                .map(|far| (edge_id, far))
        })
    }

    /// The edge joining `a` and `b`, if any.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.incident_edges(a).iter().copied().find(|&edge_id| {
            self.edges
                .get(edge_id)
                .is_some_and(|edge| edge.other(a) == Some(b))
        })
    }

    /// Total number of packets in flight across all edges.
    pub fn packet_count(&self) -> usize {
        self.edges.values().map(|edge| edge.packets.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_kind::NodeKindTable;

    fn standard(graph: &mut Graph, energy: i32) -> NodeId {
        let stats = *NodeKindTable::default().get(NodeKind::Standard);
        graph.add_node(NodeKind::Standard, stats, Energy::from_num(energy))
    }

    #[test]
    fn connect_builds_adjacency_both_ways() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 0);
        let b = standard(&mut graph, 0);
        let edge = graph.connect(a, b, Fixed64::ONE).unwrap();

        assert_eq!(graph.incident_edges(a), &[edge]);
        assert_eq!(graph.incident_edges(b), &[edge]);
        assert_eq!(graph.edge_between(b, a), Some(edge));
        assert_eq!(graph.edge(edge).unwrap().other(a), Some(b));
    }

    #[test]
    fn connect_rejects_bad_input() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 0);
        let b = standard(&mut graph, 0);

        assert_eq!(graph.connect(a, a, Fixed64::ONE), Err(GraphError::SelfLoop(a)));
        assert_eq!(
            graph.connect(a, b, Fixed64::ZERO),
            Err(GraphError::InvalidLength(Fixed64::ZERO))
        );
        graph.connect(a, b, Fixed64::ONE).unwrap();
        assert_eq!(
            graph.connect(b, a, Fixed64::ONE),
            Err(GraphError::DuplicateEdge(b, a))
        );
    }

    #[test]
    fn defense_energy_uses_free_pool() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 100);
        let b = standard(&mut graph, 0);
        let edge = graph.connect(a, b, Fixed64::ONE).unwrap();

        let node = graph.node_mut(a).unwrap();
        node.set_assignment(edge, Energy::from_num(30));
        assert_eq!(node.assigned_total(), Energy::from_num(30));
        assert_eq!(node.free_energy(), Energy::from_num(70));
        assert_eq!(node.defense_energy(), Energy::from_num(70));
    }

    #[test]
    fn zero_assignment_is_removed() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 10);
        let b = standard(&mut graph, 0);
        let edge = graph.connect(a, b, Fixed64::ONE).unwrap();

        let node = graph.node_mut(a).unwrap();
        node.set_assignment(edge, Energy::from_num(5));
        node.set_assignment(edge, Fixed64::ZERO);
        assert!(node.assignments().is_empty());
    }

    #[test]
    fn set_energy_pool_respects_assignments() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 50);
        let b = standard(&mut graph, 0);
        let edge = graph.connect(a, b, Fixed64::ONE).unwrap();
        graph
            .node_mut(a)
            .unwrap()
            .set_assignment(edge, Energy::from_num(40));

        let err = graph.set_energy_pool(a, Energy::from_num(10)).unwrap_err();
        assert!(matches!(err, GraphError::PoolBelowAssigned { .. }));
        graph.set_energy_pool(a, Energy::from_num(40)).unwrap();
        assert_eq!(graph.node(a).unwrap().energy_pool(), Energy::from_num(40));
    }

    #[test]
    fn packet_position_is_normalized_to_edge() {
        let mut graph = Graph::new();
        let a = standard(&mut graph, 0);
        let b = standard(&mut graph, 0);
        let edge_id = graph.connect(a, b, Fixed64::ONE).unwrap();
        let edge = graph.edge(edge_id).unwrap();

        let mut packet = EnergyPacket {
            id: PacketId(0),
            owner: PlayerId::default(),
            amount: Energy::from_num(1),
            origin: b,
            target: a,
            progress: Fixed64::from_num(0.25),
        };
        assert_eq!(packet.position_on(edge), Fixed64::from_num(0.75));
        packet.origin = a;
        packet.target = b;
        assert_eq!(packet.position_on(edge), Fixed64::from_num(0.25));
    }
}

//! Ownership transfer, connectivity cascades and elimination.
//!
//! Every change of node ownership goes through [`CaptureService`], which keeps
//! each node's `owner` field and its owner's owned-node set in lockstep. Errors
//! returned from here are invariant violations: they mean the caller sequenced
//! operations wrongly, and the offending operation is aborted before any
//! state is touched.
//!
//! # Articulation cascade
//!
//! A player's territory must stay connected to their initial node. After one
//! of their nodes is captured or neutralized, a breadth-first walk from the
//! initial node through nodes they still own marks the surviving territory;
//! every owned node the walk misses is released to neutral.

use crate::fixed::{Energy, Fixed64};
use crate::graph::Graph;
use crate::id::{NodeId, PlayerId};
use crate::state::GameState;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Invariant violations raised by ownership changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("player not found: {0:?}")]
    PlayerNotFound(PlayerId),
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("player {0:?} is not in the game")]
    AttackerNotInGame(PlayerId),
    #[error("player {player:?} already owns node {node:?}")]
    AlreadyOwned { node: NodeId, player: PlayerId },
    #[error("node {node:?} is not owned by {expected:?}")]
    OwnerMismatch {
        node: NodeId,
        expected: Option<PlayerId>,
    },
    #[error("player {0:?} has no initial node")]
    MissingInitialNode(PlayerId),
    #[error("player {0:?} already has an initial node")]
    InitialNodeAlreadySet(PlayerId),
    #[error("node {0:?} owner field and owned-node set disagree")]
    OwnershipDesync(NodeId),
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a capture changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub node: NodeId,
    pub captured: bool,
    /// Nodes the previous owner lost in addition to `node`: disconnected
    /// territory, or everything left after an elimination.
    pub nodes_lost: Vec<NodeId>,
    pub player_eliminated: Option<PlayerId>,
    /// Bonus credited to the attacker.
    pub energy_bonus: Energy,
}

impl CaptureResult {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            captured: false,
            nodes_lost: Vec::new(),
            player_eliminated: None,
            energy_bonus: Fixed64::ZERO,
        }
    }
}

/// What a neutralization changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeutralizeResult {
    pub node: NodeId,
    pub nodes_lost: Vec<NodeId>,
    pub player_eliminated: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// CaptureService
// ---------------------------------------------------------------------------

/// Stateless ownership rules over a [`GameState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureService;

impl CaptureService {
    pub fn new() -> Self {
        Self
    }

    /// Give `player` their starting node with `starting_energy` in its pool.
    /// Must be called once per player before the first tick.
    pub fn capture_initial_node(
        &self,
        state: &mut GameState,
        player: PlayerId,
        node: NodeId,
        starting_energy: Energy,
    ) -> Result<CaptureResult, CaptureError> {
        let data = state
            .player(player)
            .ok_or(CaptureError::PlayerNotFound(player))?;
        if !data.is_active() {
            return Err(CaptureError::AttackerNotInGame(player));
        }
        if data.initial_node().is_some() {
            return Err(CaptureError::InitialNodeAlreadySet(player));
        }
        let target = state
            .graph
            .node(node)
            .ok_or(CaptureError::NodeNotFound(node))?;
        if target.owner().is_some() {
            return Err(CaptureError::OwnerMismatch {
                node,
                expected: None,
            });
        }

        if let Some(target) = state.graph.node_mut(node) {
            target.set_owner(Some(player));
            target.clear_assignments();
            target.set_energy_pool(starting_energy);
        }
        if let Some(data) = state.player_mut(player) {
            data.set_initial_node(node);
            data.insert_node(node);
        }
        info!(?player, ?node, "initial node claimed");

        let mut result = CaptureResult::new(node);
        result.captured = true;
        Ok(result)
    }

    /// Move `node` from `previous_owner` (or from neutral) to `attacker`,
    /// crediting the node's capture bonus. Eliminates the previous owner if
    /// `node` was their initial node.
    pub fn capture_node(
        &self,
        state: &mut GameState,
        node: NodeId,
        attacker: PlayerId,
        previous_owner: Option<PlayerId>,
    ) -> Result<CaptureResult, CaptureError> {
        let attacker_data = state
            .player(attacker)
            .ok_or(CaptureError::PlayerNotFound(attacker))?;
        if !attacker_data.is_active() {
            return Err(CaptureError::AttackerNotInGame(attacker));
        }
        let target = state
            .graph
            .node(node)
            .ok_or(CaptureError::NodeNotFound(node))?;
        if target.owner() == Some(attacker) || attacker_data.owns(node) {
            return Err(CaptureError::AlreadyOwned {
                node,
                player: attacker,
            });
        }
        if target.owner() != previous_owner {
            return Err(CaptureError::OwnerMismatch {
                node,
                expected: previous_owner,
            });
        }
        let bonus = target.stats().energy_addition;

        let mut previous_initial = None;
        if let Some(prev) = previous_owner {
            let prev_data = state
                .player(prev)
                .ok_or(CaptureError::PlayerNotFound(prev))?;
            if !prev_data.owns(node) {
                return Err(CaptureError::OwnershipDesync(node));
            }
            previous_initial = prev_data.initial_node();
            if let Some(prev_data) = state.player_mut(prev) {
                prev_data.remove_node(node);
            }
        }

        if let Some(target) = state.graph.node_mut(node) {
            target.set_owner(Some(attacker));
            target.clear_assignments();
            target.add_energy(bonus);
        }
        if let Some(attacker_data) = state.player_mut(attacker) {
            attacker_data.insert_node(node);
            attacker_data.credit_bonus(bonus);
        }
        debug!(?node, ?attacker, ?previous_owner, %bonus, "node captured");

        let mut result = CaptureResult::new(node);
        result.captured = true;
        result.energy_bonus = bonus;

        if let Some(prev) = previous_owner {
            if previous_initial == Some(node) {
                result.nodes_lost = self.eliminate_player(state, prev)?;
                result.player_eliminated = Some(prev);
            }
        }
        Ok(result)
    }

    /// Release `node` from `previous_owner` without giving it to anyone.
    /// Owner and assignments are cleared; the pool is left to the caller.
    pub fn neutralize_node(
        &self,
        state: &mut GameState,
        node: NodeId,
        previous_owner: PlayerId,
    ) -> Result<(), CaptureError> {
        let target = state
            .graph
            .node(node)
            .ok_or(CaptureError::NodeNotFound(node))?;
        let prev_data = state
            .player(previous_owner)
            .ok_or(CaptureError::PlayerNotFound(previous_owner))?;
        if target.owner() != Some(previous_owner) {
            return Err(CaptureError::OwnerMismatch {
                node,
                expected: Some(previous_owner),
            });
        }
        if !prev_data.owns(node) {
            return Err(CaptureError::OwnershipDesync(node));
        }

        if let Some(prev_data) = state.player_mut(previous_owner) {
            prev_data.remove_node(node);
        }
        if let Some(target) = state.graph.node_mut(node) {
            target.set_owner(None);
            target.clear_assignments();
        }
        debug!(?node, ?previous_owner, "node neutralized");
        Ok(())
    }

    /// Release every node of `affected` that is no longer reachable from
    /// their initial node through their own territory. Returns the released
    /// nodes in id order and eliminates the player if nothing is left.
    pub fn handle_articulation_capture(
        &self,
        state: &mut GameState,
        captured_node: NodeId,
        affected: PlayerId,
    ) -> Result<Vec<NodeId>, CaptureError> {
        let data = state
            .player(affected)
            .ok_or(CaptureError::PlayerNotFound(affected))?;
        if data.is_eliminated() {
            return Ok(Vec::new());
        }
        let Some(initial) = data.initial_node() else {
            return Ok(Vec::new());
        };
        if initial == captured_node || !data.owns(initial) {
            return Ok(Vec::new());
        }

        let reachable = reachable_territory(&state.graph, affected, initial, None);
        let disconnected: Vec<NodeId> = data
            .owned_nodes()
            .iter()
            .copied()
            .filter(|node| !reachable.contains(node))
            .collect();

        for &node in &disconnected {
            if let Some(data) = state.player_mut(affected) {
                data.remove_node(node);
            }
            if let Some(lost) = state.graph.node_mut(node) {
                lost.set_owner(None);
                lost.clear_assignments();
            }
        }
        if !disconnected.is_empty() {
            debug!(player = ?affected, lost = disconnected.len(), "territory disconnected");
        }

        let emptied = state
            .player(affected)
            .is_some_and(|p| p.owned_count() == 0);
        if emptied {
            self.eliminate_player(state, affected)?;
        }
        Ok(disconnected)
    }

    /// [`capture_node`](Self::capture_node) followed by the articulation
    /// cascade on the previous owner.
    pub fn capture_node_with_articulation_check(
        &self,
        state: &mut GameState,
        node: NodeId,
        attacker: PlayerId,
        previous_owner: Option<PlayerId>,
    ) -> Result<CaptureResult, CaptureError> {
        let mut result = self.capture_node(state, node, attacker, previous_owner)?;

        if let Some(prev) = previous_owner.filter(|_| result.player_eliminated.is_none()) {
            let lost = self.handle_articulation_capture(state, node, prev)?;
            result.nodes_lost.extend(lost);
            let prev_data = state
                .player(prev)
                .ok_or(CaptureError::PlayerNotFound(prev))?;
            if prev_data.is_eliminated() {
                result.player_eliminated = Some(prev);
            } else if prev_data.owned_count() == 0 {
                self.eliminate_player(state, prev)?;
                result.player_eliminated = Some(prev);
            }
        }
        Ok(result)
    }

    /// [`neutralize_node`](Self::neutralize_node) followed by elimination
    /// (if `node` was the initial node) or the articulation cascade.
    pub fn neutralize_node_with_articulation_check(
        &self,
        state: &mut GameState,
        node: NodeId,
        previous_owner: PlayerId,
    ) -> Result<NeutralizeResult, CaptureError> {
        let initial = state
            .player(previous_owner)
            .ok_or(CaptureError::PlayerNotFound(previous_owner))?
            .initial_node();
        self.neutralize_node(state, node, previous_owner)?;

        let mut result = NeutralizeResult {
            node,
            nodes_lost: Vec::new(),
            player_eliminated: None,
        };
        if initial == Some(node) {
            result.nodes_lost = self.eliminate_player(state, previous_owner)?;
            result.player_eliminated = Some(previous_owner);
            return Ok(result);
        }

        result.nodes_lost = self.handle_articulation_capture(state, node, previous_owner)?;
        let prev_data = state
            .player(previous_owner)
            .ok_or(CaptureError::PlayerNotFound(previous_owner))?;
        if prev_data.is_eliminated() {
            result.player_eliminated = Some(previous_owner);
        } else if prev_data.owned_count() == 0 {
            self.eliminate_player(state, previous_owner)?;
            result.player_eliminated = Some(previous_owner);
        }
        Ok(result)
    }

    /// Mark `player` eliminated, release every node they still own and drop
    /// their in-flight packets. Returns the released nodes.
    pub fn eliminate_player(
        &self,
        state: &mut GameState,
        player: PlayerId,
    ) -> Result<Vec<NodeId>, CaptureError> {
        let data = state
            .player_mut(player)
            .ok_or(CaptureError::PlayerNotFound(player))?;
        if data.initial_node().is_none() {
            return Err(CaptureError::MissingInitialNode(player));
        }
        if data.is_eliminated() {
            return Ok(Vec::new());
        }
        data.mark_eliminated();
        let released: Vec<NodeId> = data.take_owned().into_iter().collect();

        let dropped = release_territory(state, player, &released);
        info!(?player, released = released.len(), dropped, "player eliminated");
        Ok(released)
    }

    /// Take `player` out of the match without eliminating them, as when
    /// they leave or forfeit. They stop counting as active, every node they
    /// own turns neutral and their in-flight packets are dropped. Returns
    /// the released nodes; empty if they had already left.
    pub fn remove_player_from_game(
        &self,
        state: &mut GameState,
        player: PlayerId,
    ) -> Result<Vec<NodeId>, CaptureError> {
        let data = state
            .player_mut(player)
            .ok_or(CaptureError::PlayerNotFound(player))?;
        if !data.is_in_game() {
            return Ok(Vec::new());
        }
        data.set_in_game(false);
        let released: Vec<NodeId> = data.take_owned().into_iter().collect();

        let dropped = release_territory(state, player, &released);
        info!(?player, released = released.len(), dropped, "player left the match");
        Ok(released)
    }

    // -----------------------------------------------------------------------
    // Read-only analysis
    // -----------------------------------------------------------------------

    /// Nodes of `player` that would be cut off if `node` were lost. Empty if
    /// `player` does not own `node`. Losing the initial node puts every other
    /// owned node at risk.
    pub fn nodes_at_risk(&self, state: &GameState, node: NodeId, player: PlayerId) -> Vec<NodeId> {
        let Some(data) = state.player(player) else {
            return Vec::new();
        };
        if !data.owns(node) {
            return Vec::new();
        }
        let Some(initial) = data.initial_node() else {
            return Vec::new();
        };

        let reachable = if initial == node || !data.owns(initial) {
            BTreeSet::new()
        } else {
            reachable_territory(&state.graph, player, initial, Some(node))
        };
        data.owned_nodes()
            .iter()
            .copied()
            .filter(|&owned| owned != node && !reachable.contains(&owned))
            .collect()
    }

    /// True if losing `node` would cut off at least one other node of
    /// `player`.
    pub fn is_articulation_point(&self, state: &GameState, node: NodeId, player: PlayerId) -> bool {
        !self.nodes_at_risk(state, node, player).is_empty()
    }
}

/// Turn `nodes` neutral (pools stay) and drop every packet of `player`.
/// Returns how many packets were dropped.
fn release_territory(state: &mut GameState, player: PlayerId, nodes: &[NodeId]) -> usize {
    for &node in nodes {
        if let Some(lost) = state.graph.node_mut(node) {
            lost.set_owner(None);
            lost.clear_assignments();
        }
    }
    state.remove_packets_of(player)
}

/// Breadth-first walk from `start` through nodes owned by `player`, never
/// entering `excluded`.
pub(crate) fn reachable_territory(
    graph: &Graph,
    player: PlayerId,
    start: NodeId,
    excluded: Option<NodeId>,
) -> BTreeSet<NodeId> {
    let mut visited = BTreeSet::new();
    if Some(start) == excluded || graph.node(start).and_then(|n| n.owner()) != Some(player) {
        return visited;
    }

    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        for (_, far) in graph.neighbors(current) {
            if Some(far) == excluded || visited.contains(&far) {
                continue;
            }
            if graph.node(far).and_then(|n| n.owner()) == Some(player) {
                visited.insert(far);
                queue.push_back(far);
            }
        }
    }
    visited
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_kind::NodeKind;
    use crate::test_utils::*;

    const SERVICE: CaptureService = CaptureService;

    /// A - B - C line, red starts on A and owns all three, blue starts on a
    /// separate node D attached to C.
    struct Line {
        state: GameState,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        d: NodeId,
        red: PlayerId,
        blue: PlayerId,
    }

    fn line() -> Line {
        let mut state = GameState::default();
        let a = state.add_node(NodeKind::Standard, energy(0));
        let b = state.add_node(NodeKind::Standard, energy(0));
        let c = state.add_node(NodeKind::Standard, energy(0));
        let d = state.add_node(NodeKind::Standard, energy(0));
        state.connect(a, b, Fixed64::ONE).unwrap();
        state.connect(b, c, Fixed64::ONE).unwrap();
        state.connect(c, d, Fixed64::ONE).unwrap();
        let red = state.add_player("red");
        let blue = state.add_player("blue");
        SERVICE.capture_initial_node(&mut state, red, a, energy(100)).unwrap();
        SERVICE.capture_initial_node(&mut state, blue, d, energy(100)).unwrap();
        SERVICE.capture_node(&mut state, b, red, None).unwrap();
        SERVICE.capture_node(&mut state, c, red, None).unwrap();
        Line { state, a, b, c, d, red, blue }
    }

    #[test]
    fn capture_moves_membership_and_credits_bonus() {
        let mut line = line();
        let result = SERVICE
            .capture_node(&mut line.state, line.c, line.blue, Some(line.red))
            .unwrap();

        assert!(result.captured);
        assert_eq!(result.energy_bonus, energy(10));
        assert_eq!(line.state.graph().node(line.c).unwrap().owner(), Some(line.blue));
        assert!(line.state.player(line.blue).unwrap().owns(line.c));
        assert!(!line.state.player(line.red).unwrap().owns(line.c));
        assert_eq!(line.state.player(line.blue).unwrap().bonus_energy(), energy(10));
    }

    #[test]
    fn capturing_own_node_is_fatal() {
        let mut line = line();
        let err = SERVICE
            .capture_node(&mut line.state, line.b, line.red, Some(line.red))
            .unwrap_err();
        assert_eq!(
            err,
            CaptureError::AlreadyOwned {
                node: line.b,
                player: line.red
            }
        );
    }

    #[test]
    fn eliminated_attacker_cannot_capture() {
        let mut line = line();
        SERVICE.eliminate_player(&mut line.state, line.blue).unwrap();
        let err = SERVICE
            .capture_node(&mut line.state, line.c, line.blue, Some(line.red))
            .unwrap_err();
        assert_eq!(err, CaptureError::AttackerNotInGame(line.blue));
    }

    #[test]
    fn wrong_previous_owner_is_rejected_without_mutation() {
        let mut line = line();
        let before = line.state.state_hash();
        let err = SERVICE
            .capture_node(&mut line.state, line.c, line.blue, None)
            .unwrap_err();
        assert!(matches!(err, CaptureError::OwnerMismatch { .. }));
        assert_eq!(before, line.state.state_hash());
    }

    #[test]
    fn cascade_releases_node_behind_captured_articulation() {
        let mut line = line();
        SERVICE
            .capture_node(&mut line.state, line.b, line.blue, Some(line.red))
            .unwrap();

        let lost = SERVICE
            .handle_articulation_capture(&mut line.state, line.b, line.red)
            .unwrap();

        assert_eq!(lost, vec![line.c]);
        assert_eq!(line.state.graph().node(line.c).unwrap().owner(), None);
        let red = line.state.player(line.red).unwrap();
        assert_eq!(red.owned_nodes().iter().copied().collect::<Vec<_>>(), vec![line.a]);
        assert!(!red.is_eliminated());
    }

    #[test]
    fn cascade_on_two_node_line_loses_nothing() {
        let mut state = GameState::default();
        let a = state.add_node(NodeKind::Standard, energy(0));
        let b = state.add_node(NodeKind::Standard, energy(0));
        let x = state.add_node(NodeKind::Standard, energy(0));
        state.connect(a, b, Fixed64::ONE).unwrap();
        state.connect(b, x, Fixed64::ONE).unwrap();
        let red = state.add_player("red");
        let blue = state.add_player("blue");
        SERVICE.capture_initial_node(&mut state, red, a, energy(50)).unwrap();
        SERVICE.capture_initial_node(&mut state, blue, x, energy(50)).unwrap();
        SERVICE.capture_node(&mut state, b, red, None).unwrap();

        let result = SERVICE
            .capture_node_with_articulation_check(&mut state, b, blue, Some(red))
            .unwrap();

        assert!(result.nodes_lost.is_empty());
        assert_eq!(result.player_eliminated, None);
        assert_eq!(state.player(red).unwrap().owned_count(), 1);
        assert!(state.player(red).unwrap().owns(a));
    }

    #[test]
    fn composed_capture_folds_cascade_into_result() {
        let mut line = line();
        let result = SERVICE
            .capture_node_with_articulation_check(&mut line.state, line.b, line.blue, Some(line.red))
            .unwrap();
        assert_eq!(result.nodes_lost, vec![line.c]);
        assert_eq!(result.player_eliminated, None);
        assert_eq!(line.state.graph().node(line.c).unwrap().owner(), None);
    }

    #[test]
    fn capturing_initial_node_eliminates_and_releases_territory() {
        let mut line = line();
        let result = SERVICE
            .capture_node_with_articulation_check(&mut line.state, line.a, line.blue, Some(line.red))
            .unwrap();

        assert_eq!(result.player_eliminated, Some(line.red));
        assert_eq!(result.nodes_lost, vec![line.b, line.c]);
        let red = line.state.player(line.red).unwrap();
        assert!(red.is_eliminated());
        assert_eq!(red.owned_count(), 0);
        assert_eq!(line.state.graph().node(line.b).unwrap().owner(), None);
        assert_eq!(line.state.graph().node(line.a).unwrap().owner(), Some(line.blue));
    }

    #[test]
    fn elimination_drops_in_flight_packets() {
        let mut line = line();
        let edge = line.state.graph().edge_between(line.a, line.b).unwrap();
        line.state.launch_packet(edge, line.red, line.a, energy(5));
        SERVICE.eliminate_player(&mut line.state, line.red).unwrap();
        assert_eq!(line.state.graph().packet_count(), 0);
    }

    #[test]
    fn leaving_releases_territory_without_eliminating() {
        let mut line = line();
        let edge = line.state.graph().edge_between(line.c, line.d).unwrap();
        line.state.launch_packet(edge, line.red, line.c, energy(5));

        let released = SERVICE
            .remove_player_from_game(&mut line.state, line.red)
            .unwrap();

        assert_eq!(released, vec![line.a, line.b, line.c]);
        let red = line.state.player(line.red).unwrap();
        assert!(!red.is_in_game());
        assert!(!red.is_eliminated());
        assert!(!red.is_active());
        assert!(line.state.graph().node(line.a).unwrap().is_neutral());
        assert_eq!(line.state.graph().node(line.a).unwrap().energy_pool(), energy(100));
        assert_eq!(line.state.graph().packet_count(), 0);
        assert!(crate::validation::validate_state(&line.state).is_empty());

        // Leaving twice is a no-op.
        assert!(SERVICE
            .remove_player_from_game(&mut line.state, line.red)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn player_out_of_the_match_cannot_capture() {
        let mut line = line();
        SERVICE.remove_player_from_game(&mut line.state, line.red).unwrap();
        let err = SERVICE
            .capture_node(&mut line.state, line.b, line.red, None)
            .unwrap_err();
        assert_eq!(err, CaptureError::AttackerNotInGame(line.red));
    }

    #[test]
    fn neutralize_requires_current_owner() {
        let mut line = line();
        let err = SERVICE
            .neutralize_node(&mut line.state, line.b, line.blue)
            .unwrap_err();
        assert_eq!(
            err,
            CaptureError::OwnerMismatch {
                node: line.b,
                expected: Some(line.blue)
            }
        );
    }

    #[test]
    fn neutralize_with_check_cascades() {
        let mut line = line();
        let result = SERVICE
            .neutralize_node_with_articulation_check(&mut line.state, line.b, line.red)
            .unwrap();
        assert_eq!(result.nodes_lost, vec![line.c]);
        assert_eq!(line.state.graph().node(line.b).unwrap().owner(), None);
        assert_eq!(line.state.player(line.red).unwrap().owned_count(), 1);
    }

    #[test]
    fn neutralizing_initial_node_eliminates() {
        let mut line = line();
        let result = SERVICE
            .neutralize_node_with_articulation_check(&mut line.state, line.d, line.blue)
            .unwrap();
        assert_eq!(result.player_eliminated, Some(line.blue));
        assert!(line.state.player(line.blue).unwrap().is_eliminated());
    }

    #[test]
    fn at_risk_analysis_has_no_side_effects() {
        let line = line();
        let before = line.state.state_hash();

        assert_eq!(SERVICE.nodes_at_risk(&line.state, line.b, line.red), vec![line.c]);
        assert!(SERVICE.is_articulation_point(&line.state, line.b, line.red));
        assert!(!SERVICE.is_articulation_point(&line.state, line.c, line.red));
        assert_eq!(
            SERVICE.nodes_at_risk(&line.state, line.a, line.red),
            vec![line.b, line.c]
        );
        assert!(SERVICE.nodes_at_risk(&line.state, line.d, line.red).is_empty());

        assert_eq!(before, line.state.state_hash());
    }

    #[test]
    fn initial_node_cannot_be_claimed_twice() {
        let mut line = line();
        let err = SERVICE
            .capture_initial_node(&mut line.state, line.red, line.c, energy(1))
            .unwrap_err();
        assert_eq!(err, CaptureError::InitialNodeAlreadySet(line.red));
    }
}

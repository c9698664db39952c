use crate::fixed::{Energy, Fixed64};
use crate::id::NodeId;
use std::collections::BTreeSet;

/// A participant in the match.
///
/// The owned-node set mirrors each node's `owner` field; both sides are only
/// ever changed together by the capture service.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    owned: BTreeSet<NodeId>,
    initial_node: Option<NodeId>,
    in_game: bool,
    eliminated: bool,
    bonus_energy: Energy,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owned: BTreeSet::new(),
            initial_node: None,
            in_game: true,
            eliminated: false,
            bonus_energy: Fixed64::ZERO,
        }
    }

    pub fn owned_nodes(&self) -> &BTreeSet<NodeId> {
        &self.owned
    }

    pub fn owns(&self, node: NodeId) -> bool {
        self.owned.contains(&node)
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    pub fn initial_node(&self) -> Option<NodeId> {
        self.initial_node
    }

    pub fn is_in_game(&self) -> bool {
        self.in_game
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// In the game and not eliminated: the only state in which a player may
    /// issue commands or capture nodes.
    pub fn is_active(&self) -> bool {
        self.in_game && !self.eliminated
    }

    /// Capture bonuses credited over the match.
    pub fn bonus_energy(&self) -> Energy {
        self.bonus_energy
    }

    pub(crate) fn insert_node(&mut self, node: NodeId) -> bool {
        self.owned.insert(node)
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) -> bool {
        self.owned.remove(&node)
    }

    pub(crate) fn take_owned(&mut self) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.owned)
    }

    pub(crate) fn set_initial_node(&mut self, node: NodeId) {
        self.initial_node = Some(node);
    }

    pub(crate) fn set_in_game(&mut self, in_game: bool) {
        self.in_game = in_game;
    }

    pub(crate) fn mark_eliminated(&mut self) {
        self.eliminated = true;
    }

    pub(crate) fn credit_bonus(&mut self, amount: Energy) {
        self.bonus_energy = self.bonus_energy.saturating_add(amount);
    }

    pub(crate) fn revoke_bonus(&mut self, amount: Energy) {
        self.bonus_energy = self.bonus_energy.saturating_sub(amount).max(Fixed64::ZERO);
    }
}

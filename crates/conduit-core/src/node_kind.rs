//! Node kinds and their per-kind combat constants.
//!
//! Every node carries a [`NodeKind`]. The kind never changes after the graph
//! is built; all kind-dependent numbers (emission cadence, multipliers, the
//! capture bonus) are looked up in a [`NodeKindTable`] owned by the game
//! configuration, so the combat math reads them from exactly one place.

use crate::fixed::{Energy, Fixed64, Seconds, as_f64};
use serde::{Deserialize, Serialize};

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Balanced node with no specialisation.
    Standard,
    /// Slow to attack, strong on defense.
    Fortress,
    /// Fast, hard-hitting emitter with weak defense.
    Amplifier,
    /// Ordinary combat stats but a large capture bonus.
    Reactor,
}

impl NodeKind {
    /// All kinds, in declaration order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Standard,
        NodeKind::Fortress,
        NodeKind::Amplifier,
        NodeKind::Reactor,
    ];
}

/// Combat constants for a single node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeKindStats {
    /// Seconds between two emissions from this node.
    #[serde(with = "as_f64")]
    pub attack_interval: Seconds,
    /// Seconds between two defense refreshes of this node.
    #[serde(with = "as_f64")]
    pub defense_interval: Seconds,
    /// Scales assigned energy into packet energy on emission.
    #[serde(with = "as_f64")]
    pub attack_multiplier: Fixed64,
    /// Scales free pool energy into defense energy.
    #[serde(with = "as_f64")]
    pub defense_multiplier: Fixed64,
    /// Bonus credited to whoever captures a node of this kind.
    #[serde(with = "as_f64")]
    pub energy_addition: Energy,
}

impl NodeKindStats {
    fn from_f64(
        attack_interval: f64,
        defense_interval: f64,
        attack_multiplier: f64,
        defense_multiplier: f64,
        energy_addition: f64,
    ) -> Self {
        Self {
            attack_interval: Fixed64::from_num(attack_interval),
            defense_interval: Fixed64::from_num(defense_interval),
            attack_multiplier: Fixed64::from_num(attack_multiplier),
            defense_multiplier: Fixed64::from_num(defense_multiplier),
            energy_addition: Fixed64::from_num(energy_addition),
        }
    }

    /// True when every interval and multiplier is strictly positive and the
    /// capture bonus is non-negative.
    pub fn is_valid(&self) -> bool {
        self.attack_interval > Fixed64::ZERO
            && self.defense_interval > Fixed64::ZERO
            && self.attack_multiplier > Fixed64::ZERO
            && self.defense_multiplier > Fixed64::ZERO
            && self.energy_addition >= Fixed64::ZERO
    }
}

/// Lookup table of constants, one entry per [`NodeKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeKindTable {
    pub standard: NodeKindStats,
    pub fortress: NodeKindStats,
    pub amplifier: NodeKindStats,
    pub reactor: NodeKindStats,
}

impl Default for NodeKindTable {
    fn default() -> Self {
        Self {
            standard: NodeKindStats::from_f64(1.0, 1.0, 1.0, 1.0, 10.0),
            fortress: NodeKindStats::from_f64(1.5, 0.5, 0.75, 1.5, 15.0),
            amplifier: NodeKindStats::from_f64(0.5, 1.0, 1.5, 0.75, 10.0),
            reactor: NodeKindStats::from_f64(1.0, 1.0, 1.0, 1.0, 30.0),
        }
    }
}

impl NodeKindTable {
    /// Constants for `kind`.
    pub fn get(&self, kind: NodeKind) -> &NodeKindStats {
        match kind {
            NodeKind::Standard => &self.standard,
            NodeKind::Fortress => &self.fortress,
            NodeKind::Amplifier => &self.amplifier,
            NodeKind::Reactor => &self.reactor,
        }
    }

    /// Mutable access, used by builders and data loaders to override a kind.
    pub fn get_mut(&mut self, kind: NodeKind) -> &mut NodeKindStats {
        match kind {
            NodeKind::Standard => &mut self.standard,
            NodeKind::Fortress => &mut self.fortress,
            NodeKind::Amplifier => &mut self.amplifier,
            NodeKind::Reactor => &mut self.reactor,
        }
    }

    /// The first kind whose constants are out of range, if any.
    pub fn first_invalid(&self) -> Option<NodeKind> {
        NodeKind::ALL
            .into_iter()
            .find(|&kind| !self.get(kind).is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert_eq!(NodeKindTable::default().first_invalid(), None);
    }

    #[test]
    fn lookup_matches_kind() {
        let table = NodeKindTable::default();
        assert_eq!(
            table.get(NodeKind::Fortress).defense_multiplier,
            Fixed64::from_num(1.5)
        );
        assert_eq!(
            table.get(NodeKind::Reactor).energy_addition,
            Fixed64::from_num(30)
        );
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let mut table = NodeKindTable::default();
        table.get_mut(NodeKind::Amplifier).defense_multiplier = Fixed64::ZERO;
        assert_eq!(table.first_invalid(), Some(NodeKind::Amplifier));
    }
}

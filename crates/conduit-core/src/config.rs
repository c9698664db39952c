//! Match configuration.
//!
//! [`GameConfig`] gathers every tunable of the engine. It deserializes from
//! data files (see the `conduit-data` crate) with all fields optional, and
//! [`GameConfig::validate`] rejects values that would break the tick math.

use crate::fixed::{Energy, Fixed64, Seconds, as_f64};
use crate::node_kind::{NodeKind, NodeKindTable};
use crate::sim::SimulationStrategy;
use serde::{Deserialize, Serialize};

/// Errors reported by [`GameConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("packet speed must be positive")]
    NonPositiveSpeed,
    #[error("collision threshold must be within [0, 1)")]
    CollisionThresholdOutOfRange,
    #[error("dominance threshold must be within 1..=100 percent, got {0}")]
    DominanceThresholdOutOfRange(u32),
    #[error("dominance duration must be positive")]
    NonPositiveDominanceDuration,
    #[error("time limit must be positive")]
    NonPositiveTimeLimit,
    #[error("starting energy must not be negative")]
    NegativeStartingEnergy,
    #[error("fixed timestep must be positive")]
    NonPositiveTimestep,
    #[error("constants for node kind {0:?} are out of range")]
    InvalidNodeKind(NodeKind),
}

/// Every tunable of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Edge-length units a packet covers per second.
    #[serde(with = "as_f64")]
    pub packet_speed: Fixed64,
    /// Two packets closer than this (in normalized edge position) collide.
    #[serde(with = "as_f64")]
    pub collision_threshold: Fixed64,
    /// Ownership share, in percent, at which a player starts dominating.
    pub dominance_threshold_percent: u32,
    /// Seconds of uninterrupted dominance needed to win.
    #[serde(with = "as_f64")]
    pub dominance_duration: Seconds,
    /// Seconds after which the match is decided on node count.
    #[serde(with = "as_f64")]
    pub time_limit: Seconds,
    /// Pool given to each player's initial node when it is claimed.
    #[serde(with = "as_f64")]
    pub starting_energy: Energy,
    /// Whether a repelled packet bounces back to its still-friendly origin.
    pub return_defeated_packets: bool,
    /// How `Engine::advance` turns frame time into ticks.
    pub strategy: SimulationStrategy,
    /// Ring-buffer capacity per event kind.
    pub event_capacity: usize,
    /// Per-kind node constants.
    pub node_kinds: NodeKindTable,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            packet_speed: Fixed64::ONE,
            collision_threshold: Fixed64::from_num(0.01),
            dominance_threshold_percent: 70,
            dominance_duration: Fixed64::from_num(10),
            time_limit: Fixed64::from_num(180),
            starting_energy: Fixed64::from_num(100),
            return_defeated_packets: true,
            strategy: SimulationStrategy::Variable,
            event_capacity: 1024,
            node_kinds: NodeKindTable::default(),
        }
    }
}

impl GameConfig {
    /// Check that every value is usable by the tick pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.packet_speed <= Fixed64::ZERO {
            return Err(ConfigError::NonPositiveSpeed);
        }
        if self.collision_threshold < Fixed64::ZERO || self.collision_threshold >= Fixed64::ONE {
            return Err(ConfigError::CollisionThresholdOutOfRange);
        }
        if !(1..=100).contains(&self.dominance_threshold_percent) {
            return Err(ConfigError::DominanceThresholdOutOfRange(
                self.dominance_threshold_percent,
            ));
        }
        if self.dominance_duration <= Fixed64::ZERO {
            return Err(ConfigError::NonPositiveDominanceDuration);
        }
        if self.time_limit <= Fixed64::ZERO {
            return Err(ConfigError::NonPositiveTimeLimit);
        }
        if self.starting_energy < Fixed64::ZERO {
            return Err(ConfigError::NegativeStartingEnergy);
        }
        if matches!(self.strategy, SimulationStrategy::Fixed { timestep } if timestep <= Fixed64::ZERO)
        {
            return Err(ConfigError::NonPositiveTimestep);
        }
        if let Some(kind) = self.node_kinds.first_invalid() {
            return Err(ConfigError::InvalidNodeKind(kind));
        }
        Ok(())
    }
}

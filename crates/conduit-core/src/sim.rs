//! Simulation strategy and state types.
//!
//! The engine is parameterized by a [`SimulationStrategy`] that determines how
//! frame time turns into ticks. Both strategies execute the same tick
//! pipeline; they differ only in the delta each tick receives and in how many
//! ticks run per `advance()` call.

use crate::fixed::{Fixed64, Seconds, Ticks, as_f64};
use crate::command::CommandReport;

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How the engine advances time. Chosen by the match configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SimulationStrategy {
    /// One tick per `advance(dt)` call, receiving `dt` verbatim.
    Variable,

    /// Accumulates frame time and runs as many ticks of `timestep` seconds
    /// as fit, carrying the remainder forward.
    Fixed {
        #[serde(with = "as_f64")]
        timestep: Seconds,
    },
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// Result of an `Engine::advance()` call.
#[derive(Debug, Default)]
pub struct AdvanceResult {
    /// Number of ticks actually executed.
    pub steps_run: u64,

    /// Outcomes of queued commands applied at the start of each tick.
    pub command_reports: Vec<CommandReport>,

    /// Per-tick reports, one entry per tick run.
    pub tick_reports: Vec<crate::tick::TickReport>,

    /// Set on the call during which the game ended.
    pub victory: Option<crate::victory::VictoryResult>,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of match state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a Fixed64 into the hash.
    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick counter and elapsed match time, advanced by the engine's bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimState {
    pub tick: Ticks,
    pub elapsed: Seconds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_fixed64(Fixed64::from_num(1.5));

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_fixed64(Fixed64::from_num(1.5));

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn sim_state_starts_at_zero() {
        let state = SimState::default();
        assert_eq!(state.tick, 0);
        assert_eq!(state.elapsed, Fixed64::ZERO);
    }
}

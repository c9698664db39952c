//! Dominance tracking and end-of-game detection.
//!
//! [`VictoryService::update`] is called once per tick after the pipeline. It
//! keeps its own elapsed-time accumulator and one dominance timer per player,
//! then checks, in order: last player standing, sustained dominance, time
//! limit. The first terminal state reached is final.

use crate::config::GameConfig;
use crate::fixed::{Fixed64, Seconds};
use crate::id::PlayerId;
use crate::state::GameState;
use serde::Serialize;
use slotmap::SecondaryMap;
use tracing::info;

/// Match progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryState {
    Running,
    EliminatedWin,
    DominanceWin,
    TimeoutWin,
    Draw,
}

impl VictoryState {
    pub fn is_terminal(self) -> bool {
        self != VictoryState::Running
    }
}

/// One player's standing when the game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStanding {
    pub player: PlayerId,
    pub owned_nodes: usize,
    pub eliminated: bool,
    pub dominance_time: Seconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VictoryStats {
    pub elapsed: Seconds,
    pub total_nodes: usize,
    pub standings: Vec<PlayerStanding>,
}

/// Handed to the orchestration layer once, when the game ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VictoryResult {
    pub game_ended: bool,
    pub winner: Option<PlayerId>,
    pub reason: VictoryState,
    pub stats: VictoryStats,
}

#[derive(Debug, Clone)]
pub struct VictoryService {
    threshold_percent: u32,
    dominance_duration: Seconds,
    time_limit: Seconds,
    elapsed: Seconds,
    dominance: SecondaryMap<PlayerId, Seconds>,
    state: VictoryState,
    result: Option<VictoryResult>,
}

impl VictoryService {
    pub fn new(threshold_percent: u32, dominance_duration: Seconds, time_limit: Seconds) -> Self {
        Self {
            threshold_percent,
            dominance_duration,
            time_limit,
            elapsed: Fixed64::ZERO,
            dominance: SecondaryMap::new(),
            state: VictoryState::Running,
            result: None,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.dominance_threshold_percent,
            config.dominance_duration,
            config.time_limit,
        )
    }

    pub fn state(&self) -> VictoryState {
        self.state
    }

    pub fn elapsed(&self) -> Seconds {
        self.elapsed
    }

    /// The final result, once the game has ended.
    pub fn result(&self) -> Option<&VictoryResult> {
        self.result.as_ref()
    }

    /// Seconds `player` has continuously held the dominance threshold.
    pub fn dominance_time(&self, player: PlayerId) -> Seconds {
        self.dominance.get(player).copied().unwrap_or(Fixed64::ZERO)
    }

    /// True when `owned` out of `total` nodes meets the threshold.
    pub fn is_dominating(&self, owned: usize, total: usize) -> bool {
        total > 0 && (owned as u64) * 100 >= u64::from(self.threshold_percent) * (total as u64)
    }

    /// Advance timers by `dt` and check for a terminal state. Returns the
    /// result only on the call that ends the game.
    pub fn update(&mut self, state: &GameState, dt: Seconds) -> Option<VictoryResult> {
        if self.state.is_terminal() {
            return None;
        }
        self.elapsed = self.elapsed.saturating_add(dt);

        let total = state.graph().node_count();
        for (id, player) in state.players() {
            let timer = if player.is_active() && self.is_dominating(player.owned_count(), total) {
                self.dominance_time(id).saturating_add(dt)
            } else {
                Fixed64::ZERO
            };
            self.dominance.insert(id, timer);
        }

        let (reason, winner) = self.check(state)?;
        self.state = reason;
        let result = VictoryResult {
            game_ended: true,
            winner,
            reason,
            stats: self.stats(state),
        };
        info!(?reason, ?winner, elapsed = %self.elapsed, "game ended");
        self.result = Some(result.clone());
        Some(result)
    }

    fn check(&self, state: &GameState) -> Option<(VictoryState, Option<PlayerId>)> {
        let active: Vec<PlayerId> = state.active_players().map(|(id, _)| id).collect();
        match active.as_slice() {
            [] => return Some((VictoryState::Draw, None)),
            [last] => return Some((VictoryState::EliminatedWin, Some(*last))),
            _ => {}
        }

        let mut dominant: Option<(PlayerId, Seconds)> = None;
        for &id in &active {
            let time = self.dominance_time(id);
            if time >= self.dominance_duration && dominant.is_none_or(|(_, best)| time > best) {
                dominant = Some((id, time));
            }
        }
        if let Some((id, _)) = dominant {
            return Some((VictoryState::DominanceWin, Some(id)));
        }

        if self.elapsed >= self.time_limit {
            let best = active
                .iter()
                .filter_map(|&id| state.player(id).map(|p| p.owned_count()))
                .max()
                .unwrap_or(0);
            let leaders: Vec<PlayerId> = active
                .iter()
                .copied()
                .filter(|&id| state.player(id).is_some_and(|p| p.owned_count() == best))
                .collect();
            return Some(match leaders.as_slice() {
                [winner] => (VictoryState::TimeoutWin, Some(*winner)),
                _ => (VictoryState::Draw, None),
            });
        }
        None
    }

    fn stats(&self, state: &GameState) -> VictoryStats {
        VictoryStats {
            elapsed: self.elapsed,
            total_nodes: state.graph().node_count(),
            standings: state
                .players()
                .map(|(id, player)| PlayerStanding {
                    player: id,
                    owned_nodes: player.owned_count(),
                    eliminated: player.is_eliminated(),
                    dominance_time: self.dominance_time(id),
                })
                .collect(),
        }
    }

    /// Back to `Running` with zeroed timers.
    pub fn reset(&mut self) {
        self.elapsed = Fixed64::ZERO;
        self.dominance.clear();
        self.state = VictoryState::Running;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureService;
    use crate::node_kind::NodeKind;
    use crate::test_utils::*;

    /// Ten nodes in a line, red on the first, blue on the last.
    fn ten() -> (GameState, Vec<crate::id::NodeId>, PlayerId, PlayerId) {
        let (mut state, nodes) = line_graph(10, NodeKind::Standard);
        let red = state.add_player("red");
        let blue = state.add_player("blue");
        let capture = CaptureService::new();
        capture
            .capture_initial_node(&mut state, red, nodes[0], energy(10))
            .unwrap();
        capture
            .capture_initial_node(&mut state, blue, nodes[9], energy(10))
            .unwrap();
        (state, nodes, red, blue)
    }

    fn give(state: &mut GameState, player: PlayerId, nodes: &[crate::id::NodeId]) {
        for &node in nodes {
            CaptureService::new()
                .capture_node(state, node, player, None)
                .unwrap();
        }
    }

    #[test]
    fn threshold_uses_integer_percent() {
        let service = VictoryService::new(70, fixed(10.0), fixed(180.0));
        assert!(service.is_dominating(7, 10));
        assert!(!service.is_dominating(6, 10));
        assert!(!service.is_dominating(0, 0));
    }

    #[test]
    fn dominance_timer_resets_when_share_drops() {
        let (mut state, nodes, red, blue) = ten();
        give(&mut state, red, &nodes[1..7]);
        let mut service = VictoryService::new(70, fixed(10.0), fixed(180.0));

        service.update(&state, fixed(1.0));
        service.update(&state, fixed(1.0));
        assert_eq!(service.dominance_time(red), fixed(2.0));

        CaptureService::new()
            .capture_node(&mut state, nodes[6], blue, Some(red))
            .unwrap();
        service.update(&state, fixed(1.0));
        assert_eq!(service.dominance_time(red), Fixed64::ZERO);
    }

    #[test]
    fn sustained_dominance_wins() {
        let (mut state, nodes, red, _) = ten();
        give(&mut state, red, &nodes[1..7]);
        let mut service = VictoryService::new(70, fixed(10.0), fixed(180.0));

        for _ in 0..9 {
            assert!(service.update(&state, Fixed64::ONE).is_none());
        }
        let result = service.update(&state, Fixed64::ONE).unwrap();
        assert_eq!(result.reason, VictoryState::DominanceWin);
        assert_eq!(result.winner, Some(red));
        assert!(result.game_ended);
    }

    #[test]
    fn last_player_standing_wins() {
        let (mut state, _, red, blue) = ten();
        CaptureService::new().eliminate_player(&mut state, blue).unwrap();
        let mut service = VictoryService::new(70, fixed(10.0), fixed(180.0));

        let result = service.update(&state, fixed(0.1)).unwrap();
        assert_eq!(result.reason, VictoryState::EliminatedWin);
        assert_eq!(result.winner, Some(red));
    }

    #[test]
    fn timeout_with_unique_leader() {
        let (mut state, nodes, red, _) = ten();
        give(&mut state, red, &nodes[1..3]);
        let mut service = VictoryService::new(70, fixed(10.0), fixed(5.0));

        let result = service.update(&state, fixed(5.0)).unwrap();
        assert_eq!(result.reason, VictoryState::TimeoutWin);
        assert_eq!(result.winner, Some(red));
        assert_eq!(result.stats.standings[0].owned_nodes, 3);
    }

    #[test]
    fn timeout_tie_is_draw() {
        let (state, _, _, _) = ten();
        let mut service = VictoryService::new(70, fixed(10.0), fixed(5.0));
        let result = service.update(&state, fixed(5.0)).unwrap();
        assert_eq!(result.reason, VictoryState::Draw);
        assert_eq!(result.winner, None);
    }

    #[test]
    fn result_is_reported_once() {
        let (state, _, _, _) = ten();
        let mut service = VictoryService::new(70, fixed(10.0), fixed(1.0));
        assert!(service.update(&state, fixed(1.0)).is_some());
        assert!(service.update(&state, fixed(1.0)).is_none());
        assert_eq!(service.state(), VictoryState::Draw);
        assert_eq!(service.elapsed(), fixed(1.0));

        service.reset();
        assert_eq!(service.state(), VictoryState::Running);
        assert!(service.result().is_none());
    }
}

//! The match engine: owns the game state and orchestrates each step.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`GameState`] (graph, players, packets)
//! - A [`TickClock`] (per-node timers, frame accumulator)
//! - A [`TickService`] and a [`VictoryService`]
//! - A [`CommandQueue`] for player input between ticks
//! - An [`EventBus`] for typed match events
//!
//! # Step Pipeline
//!
//! Each step runs:
//! 1. **Commands** -- apply queued commands, including those returned by
//!    reactive event handlers during the previous step
//! 2. **Tick** -- the five-phase tick pipeline
//! 3. **Victory** -- update dominance timers and check for a winner
//! 4. **Events** -- convert the tick report into events and deliver them
//! 5. **Bookkeeping** -- advance the tick counter and recompute the state hash
//!
//! Once the game has ended, `advance` and `step` do nothing.

use crate::capture::{CaptureError, CaptureResult};
use crate::collision::ArrivalOutcome;
use crate::command::{Command, CommandError, CommandOutcome, CommandQueue};
use crate::config::{ConfigError, GameConfig};
use crate::event::{Event, EventBus};
use crate::fixed::{Energy, Fixed64, Seconds, Ticks};
use crate::graph::GraphError;
use crate::id::{EdgeId, NodeId, PlayerId};
use crate::node_kind::NodeKind;
use crate::query::GameSnapshot;
use crate::sim::{AdvanceResult, SimState, SimulationStrategy};
use crate::state::GameState;
use crate::tick::{TickClock, TickError, TickReport, TickService};
use crate::victory::{VictoryResult, VictoryService};
use tracing::debug;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    config: GameConfig,
    state: GameState,
    clock: TickClock,
    sim_state: SimState,
    tick_service: TickService,
    victory: VictoryService,
    commands: CommandQueue,
    events: EventBus,
    last_state_hash: u64,
}

impl Engine {
    /// Create an engine with an empty graph. Fails if `config` does not
    /// validate.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = GameState::new(config.node_kinds.clone());
        let last_state_hash = state.state_hash();
        Ok(Self {
            tick_service: TickService::from_config(&config),
            victory: VictoryService::from_config(&config),
            events: EventBus::new(config.event_capacity),
            commands: CommandQueue::new(),
            clock: TickClock::new(),
            sim_state: SimState::default(),
            state,
            config,
            last_state_hash,
        })
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    pub fn add_node(&mut self, kind: NodeKind, energy: Energy) -> NodeId {
        self.state.add_node(kind, energy)
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId, length: Fixed64) -> Result<EdgeId, GraphError> {
        self.state.connect(a, b, length)
    }

    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        self.state.add_player(name)
    }

    /// Give `player` their starting node with the configured starting energy.
    pub fn claim_initial_node(
        &mut self,
        player: PlayerId,
        node: NodeId,
    ) -> Result<CaptureResult, CaptureError> {
        self.tick_service.capture().capture_initial_node(
            &mut self.state,
            player,
            node,
            self.config.starting_energy,
        )
    }

    /// Take `player` out of the match, as when they leave or forfeit. Their
    /// territory turns neutral and their packets vanish; commands they send
    /// afterwards fail with [`CommandError::NotInGame`]. The released nodes
    /// are published as `NodesDisconnected` with the next step's events.
    pub fn remove_player_from_game(
        &mut self,
        player: PlayerId,
    ) -> Result<Vec<NodeId>, CaptureError> {
        let released = self
            .tick_service
            .capture()
            .remove_player_from_game(&mut self.state, player)?;
        if !released.is_empty() {
            self.events.emit(Event::NodesDisconnected {
                player,
                nodes: released.clone(),
                tick: self.sim_state.tick,
            });
        }
        self.last_state_hash = self.state.state_hash();
        Ok(released)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the start of the next step.
    pub fn queue(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Apply a command right away. Only valid between steps.
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        command.apply(&mut self.state)
    }

    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandQueue {
        &mut self.commands
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Feed `dt` seconds of frame time through the configured strategy.
    pub fn advance(&mut self, dt: Seconds) -> Result<AdvanceResult, TickError> {
        let mut result = AdvanceResult::default();
        if self.is_game_over() {
            return Ok(result);
        }
        if dt < Fixed64::ZERO {
            return Err(TickError::NegativeDelta(dt));
        }

        match self.config.strategy {
            SimulationStrategy::Variable => self.run_step(dt, &mut result)?,
            SimulationStrategy::Fixed { timestep } => {
                self.clock.accumulator = self.clock.accumulator.saturating_add(dt);
                while self.clock.accumulator >= timestep && !self.is_game_over() {
                    self.clock.accumulator -= timestep;
                    self.run_step(timestep, &mut result)?;
                }
            }
        }
        Ok(result)
    }

    /// Run exactly one step with `dt`, whatever the strategy.
    pub fn step(&mut self, dt: Seconds) -> Result<AdvanceResult, TickError> {
        let mut result = AdvanceResult::default();
        if !self.is_game_over() {
            self.run_step(dt, &mut result)?;
        }
        Ok(result)
    }

    fn run_step(&mut self, dt: Seconds, result: &mut AdvanceResult) -> Result<(), TickError> {
        let tick = self.sim_state.tick;

        // Phase 1: commands
        result
            .command_reports
            .extend(self.commands.apply_all(&mut self.state, tick));

        // Phase 2: tick pipeline
        let report = self
            .tick_service
            .execute_tick(&mut self.state, &mut self.clock, dt)?;

        // Phase 3: victory
        let victory = self.victory.update(&self.state, dt);

        // Phase 4: events
        emit_tick_events(&mut self.events, &report, tick);
        if let Some(outcome) = &victory {
            self.events.emit(Event::GameEnded {
                winner: outcome.winner,
                reason: outcome.reason,
                tick,
            });
        }
        self.events.deliver();
        let reactions = self.events.drain_commands();
        if !reactions.is_empty() {
            debug!(tick, count = reactions.len(), "reactive commands queued");
            self.commands.push_batch(reactions);
        }

        // Phase 5: bookkeeping
        self.sim_state.tick += 1;
        self.sim_state.elapsed = self.sim_state.elapsed.saturating_add(dt);
        self.last_state_hash = self.state.state_hash();

        result.steps_run += 1;
        result.tick_reports.push(report);
        if victory.is_some() {
            result.victory = victory;
        }
        Ok(())
    }

    /// Clear timers, the victory tracker, queued commands and buffered
    /// events so the engine can host another game. The state is kept; use
    /// [`replace_state`](Self::replace_state) for a fresh board.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.victory.reset();
        self.sim_state = SimState::default();
        self.commands.clear();
        self.events.clear_all();
        self.last_state_hash = self.state.state_hash();
    }

    /// Install a new board and [`reset`](Self::reset), returning the old
    /// board. Timers are keyed by node and player ids, which a fresh board
    /// reuses.
    pub fn replace_state(&mut self, state: GameState) -> GameState {
        let old = std::mem::replace(&mut self.state, state);
        self.reset();
        old
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct state access for setup such as pool overrides.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn sim_state(&self) -> SimState {
        self.sim_state
    }

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    pub fn victory(&self) -> &VictoryService {
        &self.victory
    }

    pub fn outcome(&self) -> Option<&VictoryResult> {
        self.victory.result()
    }

    pub fn is_game_over(&self) -> bool {
        self.victory.state().is_terminal()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Hash of the state after the most recent step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.state, &self.victory, self.sim_state.tick)
    }
}

/// Translate one tick report into bus events.
fn emit_tick_events(bus: &mut EventBus, report: &TickReport, tick: Ticks) {
    for emission in &report.emissions {
        bus.emit(Event::PacketEmitted {
            node: emission.node,
            edge: emission.edge,
            player: emission.player,
            amount: emission.amount,
            tick,
        });
    }

    for (edge, collision) in &report.collisions {
        bus.emit(Event::PacketsCollided {
            edge: *edge,
            collisions: collision.collisions,
            destroyed: collision.packets_destroyed,
            survived: collision.packets_survived,
            tick,
        });
        for warning in &collision.waste_warnings {
            bus.emit(Event::EnergyWasted {
                player: warning.player,
                edge: warning.edge,
                amount: warning.amount_lost,
                tick,
            });
        }
    }

    for arrival in &report.arrivals {
        let event = match arrival.outcome {
            ArrivalOutcome::Integrated { energy } => Event::NodeReinforced {
                node: arrival.node,
                player: arrival.attacker,
                amount: energy,
                tick,
            },
            ArrivalOutcome::Captured {
                previous_owner,
                energy_integrated,
                ..
            } => Event::NodeCaptured {
                node: arrival.node,
                attacker: arrival.attacker,
                previous_owner,
                energy_integrated,
                bonus: arrival.energy_bonus,
                tick,
            },
            ArrivalOutcome::Neutralized { previous_owner, .. } => Event::NodeNeutralized {
                node: arrival.node,
                attacker: arrival.attacker,
                previous_owner,
                tick,
            },
            ArrivalOutcome::Defeated { pool_loss, .. } => Event::AttackRepelled {
                node: arrival.node,
                attacker: arrival.attacker,
                pool_loss,
                returned: arrival.returned.is_some(),
                tick,
            },
        };
        bus.emit(event);

        for (player, nodes) in &arrival.disconnected {
            bus.emit(Event::NodesDisconnected {
                player: *player,
                nodes: nodes.clone(),
                tick,
            });
        }
        if let Some(player) = arrival.eliminated {
            bus.emit(Event::PlayerEliminated { player, tick });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

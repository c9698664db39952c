//! Player commands and the queue that applies them at tick boundaries.
//!
//! The three command functions are the only way input and AI layers change
//! assignments or move pool energy. Each validates fully before touching
//! state, so a rejected command leaves nothing behind. Rejections are
//! ordinary [`CommandError`] values, not invariant violations.
//!
//! [`CommandQueue`] buffers [`Command`]s between ticks; the engine drains it
//! at the start of every step.

use crate::fixed::{Energy, Fixed64};
use crate::graph::Node;
use crate::id::{EdgeId, NodeId, PacketId, PlayerId};
use crate::state::GameState;
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown player {0:?}")]
    UnknownPlayer(PlayerId),
    #[error("player {0:?} is not in the game")]
    NotInGame(PlayerId),
    #[error("player {0:?} has been eliminated")]
    Eliminated(PlayerId),
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("player {player:?} does not own node {node:?}")]
    NotOwner { player: PlayerId, node: NodeId },
    #[error("edge {edge:?} does not touch node {node:?}")]
    EdgeNotConnected { node: NodeId, edge: EdgeId },
    #[error("nodes {from:?} and {to:?} are not adjacent")]
    NotAdjacent { from: NodeId, to: NodeId },
    #[error("node {node:?} is not held by player {player:?}")]
    NotAllied { player: PlayerId, node: NodeId },
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Energy),
    #[error("requested {requested} but only {available} is free")]
    InsufficientEnergy { available: Energy, requested: Energy },
    #[error("nothing is assigned to edge {edge:?} from node {node:?}")]
    NothingAssigned { node: NodeId, edge: EdgeId },
}

/// What an accepted command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// `total` is the edge's assignment after the command.
    Assigned { node: NodeId, edge: EdgeId, total: Energy },
    Removed {
        node: NodeId,
        edge: EdgeId,
        removed: Energy,
        remaining: Energy,
    },
    Transferred {
        from: NodeId,
        to: NodeId,
        packet: PacketId,
        amount: Energy,
    },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Player exists, is in the game, is not eliminated, and owns `node`.
fn owned_node<'a>(
    state: &'a GameState,
    player: PlayerId,
    node: NodeId,
) -> Result<&'a Node, CommandError> {
    let data = state
        .player(player)
        .ok_or(CommandError::UnknownPlayer(player))?;
    if !data.is_in_game() {
        return Err(CommandError::NotInGame(player));
    }
    if data.is_eliminated() {
        return Err(CommandError::Eliminated(player));
    }
    let found = state
        .graph()
        .node(node)
        .ok_or(CommandError::UnknownNode(node))?;
    if found.owner() != Some(player) || !data.owns(node) {
        return Err(CommandError::NotOwner { player, node });
    }
    Ok(found)
}

fn incident_edge(state: &GameState, node: NodeId, edge: EdgeId) -> Result<(), CommandError> {
    let touches = state.graph().edge(edge).is_some_and(|e| e.connects(node));
    if touches {
        Ok(())
    } else {
        Err(CommandError::EdgeNotConnected { node, edge })
    }
}

fn positive(amount: Energy) -> Result<(), CommandError> {
    if amount > Fixed64::ZERO {
        Ok(())
    } else {
        Err(CommandError::InvalidAmount(amount))
    }
}

fn affordable(node: &Node, amount: Energy) -> Result<(), CommandError> {
    let available = node.free_energy();
    if amount > available {
        return Err(CommandError::InsufficientEnergy {
            available,
            requested: amount,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commit `amount` more of `node`'s free pool to `edge`. The node emits
/// `assigned * attack_multiplier` along the edge every attack interval.
pub fn assign_energy_to_edge(
    state: &mut GameState,
    player: PlayerId,
    node: NodeId,
    edge: EdgeId,
    amount: Energy,
) -> Result<CommandOutcome, CommandError> {
    let source = owned_node(state, player, node)?;
    incident_edge(state, node, edge)?;
    positive(amount)?;
    affordable(source, amount)?;

    let total = source.assignment(edge).saturating_add(amount);
    if let Some(source) = state.graph.node_mut(node) {
        source.set_assignment(edge, total);
    }
    Ok(CommandOutcome::Assigned { node, edge, total })
}

/// Release up to `amount` of the assignment on `edge` back to the free
/// pool. Asking for more than is assigned releases everything.
pub fn remove_energy_from_edge(
    state: &mut GameState,
    player: PlayerId,
    node: NodeId,
    edge: EdgeId,
    amount: Energy,
) -> Result<CommandOutcome, CommandError> {
    let source = owned_node(state, player, node)?;
    incident_edge(state, node, edge)?;
    positive(amount)?;
    let current = source.assignment(edge);
    if current <= Fixed64::ZERO {
        return Err(CommandError::NothingAssigned { node, edge });
    }

    let removed = amount.min(current);
    let remaining = current - removed;
    if let Some(source) = state.graph.node_mut(node) {
        source.set_assignment(edge, remaining);
    }
    Ok(CommandOutcome::Removed {
        node,
        edge,
        removed,
        remaining,
    })
}

/// Send `amount` of free pool energy from `from` to the adjacent node `to`,
/// which must belong to the same player. The energy leaves the pool at once
/// and travels as a packet.
pub fn transfer_energy_between_allies(
    state: &mut GameState,
    player: PlayerId,
    from: NodeId,
    to: NodeId,
    amount: Energy,
) -> Result<CommandOutcome, CommandError> {
    let source = owned_node(state, player, from)?;
    let target = state
        .graph()
        .node(to)
        .ok_or(CommandError::UnknownNode(to))?;
    if target.owner() != Some(player) {
        return Err(CommandError::NotAllied { player, node: to });
    }
    let edge = state
        .graph()
        .edge_between(from, to)
        .ok_or(CommandError::NotAdjacent { from, to })?;
    positive(amount)?;
    affordable(source, amount)?;

    let packet = state
        .launch_packet(edge, player, from, amount)
        .ok_or(CommandError::NotAdjacent { from, to })?;
    if let Some(source) = state.graph.node_mut(from) {
        let pool = source.energy_pool();
        source.set_energy_pool(pool - amount);
    }
    Ok(CommandOutcome::Transferred {
        from,
        to,
        packet,
        amount,
    })
}

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A queued call to one of the command functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AssignEnergy {
        player: PlayerId,
        node: NodeId,
        edge: EdgeId,
        amount: Energy,
    },
    RemoveEnergy {
        player: PlayerId,
        node: NodeId,
        edge: EdgeId,
        amount: Energy,
    },
    TransferEnergy {
        player: PlayerId,
        from: NodeId,
        to: NodeId,
        amount: Energy,
    },
}

impl Command {
    pub fn player(&self) -> PlayerId {
        match *self {
            Command::AssignEnergy { player, .. }
            | Command::RemoveEnergy { player, .. }
            | Command::TransferEnergy { player, .. } => player,
        }
    }

    /// Run the command against `state`.
    pub fn apply(&self, state: &mut GameState) -> Result<CommandOutcome, CommandError> {
        match *self {
            Command::AssignEnergy {
                player,
                node,
                edge,
                amount,
            } => assign_energy_to_edge(state, player, node, edge, amount),
            Command::RemoveEnergy {
                player,
                node,
                edge,
                amount,
            } => remove_energy_from_edge(state, player, node, edge, amount),
            Command::TransferEnergy {
                player,
                from,
                to,
                amount,
            } => transfer_energy_between_allies(state, player, from, to, amount),
        }
    }
}

/// A command together with how it went: the `{success, error}` pair handed
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub command: Command,
    pub result: Result<CommandOutcome, CommandError>,
}

impl CommandReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary.
///
/// Supports optional history tracking for replay and debugging.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands: (tick, command).
    history: Vec<(u64, Command)>,
    /// 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that retains up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Take every pending command, recording them in history under `tick`.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();
        if self.max_history > 0 {
            self.history.extend(commands.iter().map(|&cmd| (tick, cmd)));
            let excess = self.history.len().saturating_sub(self.max_history);
            self.history.drain(..excess);
        }
        commands
    }

    /// Drain and apply every pending command in submission order.
    pub fn apply_all(&mut self, state: &mut GameState, tick: u64) -> Vec<CommandReport> {
        self.drain(tick)
            .into_iter()
            .map(|command| {
                let result = command.apply(state);
                if let Err(err) = &result {
                    warn!(player = ?command.player(), %err, "command rejected");
                }
                CommandReport { command, result }
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Drop pending commands and history.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.history.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

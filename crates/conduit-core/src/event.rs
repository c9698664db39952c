//! Typed match events with pre-allocated ring buffers.
//!
//! The engine turns each tick's [`TickReport`](crate::tick::TickReport) into
//! events after the pipeline has run, then delivers them in one batch. Each
//! event kind has its own [`EventBuffer`] ring buffer with a configurable
//! capacity.
//!
//! # Subscriber Types
//!
//! - **Passive listeners**: read-only, for UI updates, audio, analytics.
//! - **Reactive handlers**: return [`Command`]s to queue for the next tick,
//!   which is how an AI layer can react to what just happened.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::command::Command;
use crate::fixed::{Energy, Ticks};
use crate::id::*;
use crate::victory::VictoryState;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A match event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Packets --
    PacketEmitted {
        node: NodeId,
        edge: EdgeId,
        player: PlayerId,
        amount: Energy,
        tick: Ticks,
    },
    PacketsCollided {
        edge: EdgeId,
        collisions: usize,
        destroyed: usize,
        survived: usize,
        tick: Ticks,
    },
    EnergyWasted {
        player: PlayerId,
        edge: EdgeId,
        amount: Energy,
        tick: Ticks,
    },

    // -- Arrivals --
    NodeReinforced {
        node: NodeId,
        player: PlayerId,
        amount: Energy,
        tick: Ticks,
    },
    NodeCaptured {
        node: NodeId,
        attacker: PlayerId,
        previous_owner: Option<PlayerId>,
        energy_integrated: Energy,
        bonus: Energy,
        tick: Ticks,
    },
    NodeNeutralized {
        node: NodeId,
        attacker: PlayerId,
        previous_owner: Option<PlayerId>,
        tick: Ticks,
    },
    AttackRepelled {
        node: NodeId,
        attacker: PlayerId,
        pool_loss: Energy,
        returned: bool,
        tick: Ticks,
    },

    // -- Territory --
    NodesDisconnected {
        player: PlayerId,
        nodes: Vec<NodeId>,
        tick: Ticks,
    },
    PlayerEliminated {
        player: PlayerId,
        tick: Ticks,
    },
    GameEnded {
        winner: Option<PlayerId>,
        reason: VictoryState,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PacketEmitted,
    PacketsCollided,
    EnergyWasted,
    NodeReinforced,
    NodeCaptured,
    NodeNeutralized,
    AttackRepelled,
    NodesDisconnected,
    PlayerEliminated,
    GameEnded,
}

const EVENT_KIND_COUNT: usize = 10;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PacketEmitted { .. } => EventKind::PacketEmitted,
            Event::PacketsCollided { .. } => EventKind::PacketsCollided,
            Event::EnergyWasted { .. } => EventKind::EnergyWasted,
            Event::NodeReinforced { .. } => EventKind::NodeReinforced,
            Event::NodeCaptured { .. } => EventKind::NodeCaptured,
            Event::NodeNeutralized { .. } => EventKind::NodeNeutralized,
            Event::AttackRepelled { .. } => EventKind::AttackRepelled,
            Event::NodesDisconnected { .. } => EventKind::NodesDisconnected,
            Event::PlayerEliminated { .. } => EventKind::PlayerEliminated,
            Event::GameEnded { .. } => EventKind::GameEnded,
        }
    }

    pub fn tick(&self) -> Ticks {
        match *self {
            Event::PacketEmitted { tick, .. }
            | Event::PacketsCollided { tick, .. }
            | Event::EnergyWasted { tick, .. }
            | Event::NodeReinforced { tick, .. }
            | Event::NodeCaptured { tick, .. }
            | Event::NodeNeutralized { tick, .. }
            | Event::AttackRepelled { tick, .. }
            | Event::NodesDisconnected { tick, .. }
            | Event::PlayerEliminated { tick, .. }
            | Event::GameEnded { tick, .. } => tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten before they could be delivered.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |offset| {
            self.events[(start + offset) % self.capacity()].as_ref()
        })
    }

    pub fn clear(&mut self) {
        self.events.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Receives an event and returns commands to queue for the next tick.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<Command>>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

struct SubscriberEntry {
    subscriber: Subscriber,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.subscriber {
            Subscriber::Passive(_) => "Passive(<fn>)",
            Subscriber::Reactive(_) => "Reactive(<fn>)",
        };
        f.debug_struct("SubscriberEntry")
            .field("subscriber", &kind)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, subscriber lists, and suppression flags.
#[derive(Debug)]
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    /// Commands returned by reactive handlers, drained by the engine.
    pending_commands: Vec<Command>,
    default_capacity: usize,
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: std::array::from_fn(|_| Vec::new()),
            pending_commands: Vec::new(),
            default_capacity,
        }
    }

    /// Stop recording `kind`. Its buffer is dropped.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, None, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.on_reactive_filtered(kind, None, handler);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.subscribers[kind.index()].push(SubscriberEntry {
            subscriber: Subscriber::Passive(listener),
            filter,
        });
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) {
        self.subscribers[kind.index()].push(SubscriberEntry {
            subscriber: Subscriber::Reactive(handler),
            filter,
        });
    }

    /// Deliver every buffered event, kind by kind in declaration order, to
    /// subscribers in registration order. Buffers are cleared afterwards.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            if self.suppressed[idx] {
                continue;
            }
            let Some(buffer) = self.buffers[idx].as_ref() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if entry.filter.as_ref().is_some_and(|keep| !keep(event)) {
                        continue;
                    }
                    match &mut entry.subscriber {
                        Subscriber::Passive(listener) => listener(event),
                        Subscriber::Reactive(handler) => {
                            self.pending_commands.extend(handler(event));
                        }
                    }
                }
            }

            if let Some(buffer) = self.buffers[idx].as_mut() {
                buffer.clear();
            }
        }
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for `kind`, including dropped ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Clear buffers and pending commands. Subscribers and suppression stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
        self.pending_commands.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

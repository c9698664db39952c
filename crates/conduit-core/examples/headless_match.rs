//! Headless match: two greedy bots fight over a grid until one wins.
//!
//! Each simulated second, every bot looks at its nodes and assigns spare
//! energy to every edge that leads out of its territory. Events are logged
//! through `tracing`; set `RUST_LOG=conduit_core=debug` for per-tick detail.
//!
//! Run with: `cargo run -p conduit-core --example headless_match`

use conduit_core::command::Command;
use conduit_core::config::GameConfig;
use conduit_core::engine::Engine;
use conduit_core::event::{Event, EventKind};
use conduit_core::fixed::{Energy, Fixed64};
use conduit_core::id::*;
use conduit_core::node_kind::NodeKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SIDE: usize = 6;
const FRAME: f64 = 0.25;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GameConfig {
        time_limit: Fixed64::from_num(120),
        ..GameConfig::default()
    };
    let mut engine = Engine::new(config).expect("default config is valid");

    // --- Board: a grid with a fortress ring around the centre ---

    let mut nodes = Vec::with_capacity(SIDE * SIDE);
    for r in 0..SIDE {
        for c in 0..SIDE {
            let centre = (2..SIDE - 2).contains(&r) && (2..SIDE - 2).contains(&c);
            let kind = match (r + c) % 7 {
                _ if centre => NodeKind::Fortress,
                0 => NodeKind::Amplifier,
                3 => NodeKind::Reactor,
                _ => NodeKind::Standard,
            };
            nodes.push(engine.add_node(kind, Fixed64::ZERO));
        }
    }
    for r in 0..SIDE {
        for c in 0..SIDE {
            let here = nodes[r * SIDE + c];
            if c + 1 < SIDE {
                engine
                    .connect(here, nodes[r * SIDE + c + 1], Fixed64::ONE)
                    .expect("distinct nodes");
            }
            if r + 1 < SIDE {
                engine
                    .connect(here, nodes[(r + 1) * SIDE + c], Fixed64::from_num(1.5))
                    .expect("distinct nodes");
            }
        }
    }

    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, nodes[0]).expect("corner is neutral");
    engine
        .claim_initial_node(blue, nodes[SIDE * SIDE - 1])
        .expect("corner is neutral");

    // --- Listeners ---

    engine.events_mut().on_passive(
        EventKind::NodeCaptured,
        Box::new(|event| {
            if let Event::NodeCaptured {
                node,
                attacker,
                previous_owner,
                tick,
                ..
            } = event
            {
                info!(tick, ?node, ?attacker, ?previous_owner, "captured");
            }
        }),
    );
    engine.events_mut().on_passive(
        EventKind::NodesDisconnected,
        Box::new(|event| {
            if let Event::NodesDisconnected { player, nodes, tick } = event {
                info!(tick, ?player, lost = nodes.len(), "territory cut off");
            }
        }),
    );
    engine.events_mut().on_passive(
        EventKind::PlayerEliminated,
        Box::new(|event| info!(tick = event.tick(), ?event, "eliminated")),
    );

    // --- Run ---

    let frames_per_second = (1.0 / FRAME) as usize;
    let mut frame = 0usize;
    while !engine.is_game_over() {
        if frame % frames_per_second == 0 {
            for player in [red, blue] {
                for command in greedy_orders(&engine, player) {
                    engine.queue(command);
                }
            }
        }
        engine
            .advance(Fixed64::from_num(FRAME))
            .expect("frame time is positive");
        frame += 1;
    }

    // --- Report ---

    let snapshot = engine.snapshot();
    info!(outcome = ?snapshot.outcome, winner = ?snapshot.winner, elapsed = %snapshot.elapsed, "match over");
    for player in &snapshot.players {
        info!(
            name = %player.name,
            nodes = player.owned_nodes,
            share = %player.ownership_percent,
            energy = %player.total_energy,
            "final standing"
        );
    }
    match snapshot.to_json() {
        Ok(json) => info!(bytes = json.len(), "snapshot serialized"),
        Err(err) => info!(%err, "snapshot serialization failed"),
    }
}

/// Assign a slice of each node's free energy to every edge leaving the
/// player's territory.
fn greedy_orders(engine: &Engine, player: PlayerId) -> Vec<Command> {
    let Some(data) = engine.state().player(player) else {
        return Vec::new();
    };
    let graph = engine.state().graph();
    let mut orders = Vec::new();
    for &node in data.owned_nodes() {
        let Some(here) = graph.node(node) else {
            continue;
        };
        let frontier: Vec<EdgeId> = graph
            .neighbors(node)
            .filter(|&(edge, other)| {
                here.assignment(edge) == Fixed64::ZERO
                    && graph.node(other).and_then(|n| n.owner()) != Some(player)
            })
            .map(|(edge, _)| edge)
            .collect();
        if frontier.is_empty() {
            continue;
        }
        let share: Energy = here.free_energy() / Fixed64::from_num(frontier.len() as u32 + 1);
        if share < Fixed64::ONE {
            continue;
        }
        for edge in frontier {
            orders.push(Command::AssignEnergy {
                player,
                node,
                edge,
                amount: share,
            });
        }
    }
    orders
}

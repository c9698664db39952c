//! Integration tests for the Conduit engine.
//!
//! Each test builds a small board through the public API, drives it with
//! commands and `Engine::advance`, and checks the resulting state, events
//! and victory outcome.

use conduit_core::capture::CaptureService;
use conduit_core::command::Command;
use conduit_core::config::GameConfig;
use conduit_core::engine::Engine;
use conduit_core::event::{Event, EventKind};
use conduit_core::fixed::Fixed64;
use conduit_core::id::*;
use conduit_core::node_kind::NodeKind;
use conduit_core::sim::SimulationStrategy;
use conduit_core::test_utils::*;
use conduit_core::validation::validate_state;
use conduit_core::victory::{VictoryResult, VictoryState};
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Helpers
// ===========================================================================

/// Record every event of `kinds` delivered by the engine's bus.
fn record(engine: &mut Engine, kinds: &[EventKind]) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = Rc::clone(&log);
        engine
            .events_mut()
            .on_passive(kind, Box::new(move |event| sink.borrow_mut().push(event.clone())));
    }
    log
}

/// Advance in `dt` steps until the game ends or `max_steps` run out.
fn run_until_over(engine: &mut Engine, dt: Fixed64, max_steps: usize) -> Option<VictoryResult> {
    for _ in 0..max_steps {
        let result = engine.advance(dt).unwrap();
        assert!(validate_state(engine.state()).is_empty());
        if result.victory.is_some() {
            return result.victory;
        }
    }
    None
}

fn pool(engine: &Engine, node: NodeId) -> Fixed64 {
    engine.state().graph().node(node).unwrap().energy_pool()
}

fn assign(engine: &mut Engine, player: PlayerId, node: NodeId, edge: EdgeId, amount: i32) {
    engine
        .execute(Command::AssignEnergy {
            player,
            node,
            edge,
            amount: energy(amount),
        })
        .unwrap();
}

// ===========================================================================
// Combat
// ===========================================================================

#[test]
fn duel_ends_when_initial_node_falls() {
    let (mut engine, ids) = duel_engine(GameConfig::default());
    engine.state_mut().graph_mut().set_energy_pool(ids.b, energy(20)).unwrap();
    assign(&mut engine, ids.red, ids.a, ids.edge, 50);
    let log = record(
        &mut engine,
        &[EventKind::NodeCaptured, EventKind::PlayerEliminated, EventKind::GameEnded],
    );

    let victory = run_until_over(&mut engine, fixed(0.5), 20).expect("red wins");

    assert_eq!(victory.reason, VictoryState::EliminatedWin);
    assert_eq!(victory.winner, Some(ids.red));
    assert_eq!(engine.state().graph().node(ids.b).unwrap().owner(), Some(ids.red));
    assert!(engine.state().player(ids.blue).unwrap().is_eliminated());

    let kinds: Vec<EventKind> = log.borrow().iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec![EventKind::NodeCaptured, EventKind::PlayerEliminated, EventKind::GameEnded]
    );

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.outcome, VictoryState::EliminatedWin);
    assert_eq!(snapshot.winner, Some(ids.red));
    assert_eq!(snapshot.player(ids.red).unwrap().owned_nodes, 2);
    assert_eq!(snapshot.player(ids.red).unwrap().ownership_percent, fixed(100.0));
}

#[test]
fn capture_cuts_off_stranded_territory() {
    // r0 - r1 - r2, with blue's b0 also touching r1.
    let mut engine = Engine::new(GameConfig::default()).unwrap();
    let r0 = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let r1 = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let r2 = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let b0 = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    engine.connect(r0, r1, Fixed64::ONE).unwrap();
    engine.connect(r1, r2, Fixed64::ONE).unwrap();
    let front = engine.connect(b0, r1, Fixed64::ONE).unwrap();
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, r0).unwrap();
    engine.claim_initial_node(blue, b0).unwrap();
    let capture = CaptureService::new();
    capture.capture_node(engine.state_mut(), r1, red, None).unwrap();
    capture.capture_node(engine.state_mut(), r2, red, None).unwrap();
    engine.state_mut().graph_mut().set_energy_pool(r1, energy(5)).unwrap();
    assert!(capture.is_articulation_point(engine.state(), r1, red));
    assert_eq!(capture.nodes_at_risk(engine.state(), r1, red), vec![r2]);

    assign(&mut engine, blue, b0, front, 50);
    let log = record(&mut engine, &[EventKind::NodeCaptured, EventKind::NodesDisconnected]);

    for _ in 0..3 {
        engine.advance(fixed(0.5)).unwrap();
    }

    let graph = engine.state().graph();
    assert_eq!(graph.node(r1).unwrap().owner(), Some(blue));
    assert_eq!(graph.node(r2).unwrap().owner(), None);
    assert_eq!(graph.node(r0).unwrap().owner(), Some(red));
    assert!(engine.state().player(red).unwrap().is_active());
    assert!(!engine.is_game_over());
    assert!(validate_state(engine.state()).is_empty());

    let events = log.borrow();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::NodeCaptured { node, attacker, previous_owner: Some(prev), .. }
            if *node == r1 && *attacker == blue && *prev == red
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::NodesDisconnected { player, nodes, .. } if *player == red && *nodes == vec![r2]
    )));
}

#[test]
fn repelled_attack_returns_to_origin() {
    let (mut engine, ids) = duel_engine(GameConfig::default());
    assign(&mut engine, ids.red, ids.a, ids.edge, 10);
    let log = record(&mut engine, &[EventKind::AttackRepelled, EventKind::NodeReinforced]);

    // Emission happens at t = 1; withdraw the assignment right after.
    engine.advance(fixed(0.5)).unwrap();
    let result = engine.advance(fixed(0.5)).unwrap();
    assert_eq!(result.tick_reports[0].emissions.len(), 1);
    engine
        .execute(Command::RemoveEnergy {
            player: ids.red,
            node: ids.a,
            edge: ids.edge,
            amount: energy(10),
        })
        .unwrap();

    // Arrives at b at t = 1.5, bounces back to a by t = 2.5.
    for _ in 0..3 {
        engine.advance(fixed(0.5)).unwrap();
    }

    assert_eq!(pool(&engine, ids.b), energy(90));
    assert_eq!(pool(&engine, ids.a), energy(110));
    assert_eq!(engine.state().graph().packet_count(), 0);

    let events = log.borrow();
    assert!(matches!(
        events.as_slice(),
        [
            Event::AttackRepelled { returned: true, .. },
            Event::NodeReinforced { player, .. },
        ] if *player == ids.red
    ));
}

#[test]
fn friendly_packets_meeting_head_on_are_wasted() {
    let mut engine = Engine::new(GameConfig::default()).unwrap();
    let a = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let b = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let far = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let edge = engine.connect(a, b, Fixed64::ONE).unwrap();
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, a).unwrap();
    engine.claim_initial_node(blue, far).unwrap();
    CaptureService::new().capture_node(engine.state_mut(), b, red, None).unwrap();

    assign(&mut engine, red, a, edge, 5);
    assign(&mut engine, red, b, edge, 5);
    let log = record(&mut engine, &[EventKind::EnergyWasted]);

    engine.advance(fixed(0.5)).unwrap();
    let result = engine.advance(fixed(0.5)).unwrap();

    assert_eq!(result.tick_reports[0].collision_count(), 1);
    assert_eq!(engine.state().graph().packet_count(), 0);
    assert!(matches!(
        log.borrow().as_slice(),
        [Event::EnergyWasted { player, amount, .. }] if *player == red && *amount == energy(10)
    ));
}

#[test]
fn amplifier_multiplies_outgoing_packets() {
    let mut engine = Engine::new(GameConfig::default()).unwrap();
    let a = engine.add_node(NodeKind::Amplifier, Fixed64::ZERO);
    let b = engine.add_node(NodeKind::Standard, Fixed64::ZERO);
    let edge = engine.connect(a, b, fixed(4.0)).unwrap();
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, a).unwrap();
    engine.claim_initial_node(blue, b).unwrap();
    assign(&mut engine, red, a, edge, 10);

    // Amplifiers fire every half second.
    let result = engine.advance(fixed(0.5)).unwrap();
    let emissions = &result.tick_reports[0].emissions;
    assert_eq!(emissions.len(), 1);
    assert_eq!(emissions[0].amount, energy(15));
    assert_eq!(pool(&engine, a), energy(100));
}

// ===========================================================================
// Victory
// ===========================================================================

/// n0 - n1 - n2 with red on n0 and n1, blue on n2.
fn lopsided_line(config: GameConfig) -> (Engine, PlayerId, PlayerId) {
    let mut engine = Engine::new(config).unwrap();
    let nodes: Vec<NodeId> = (0..3)
        .map(|_| engine.add_node(NodeKind::Standard, Fixed64::ZERO))
        .collect();
    engine.connect(nodes[0], nodes[1], Fixed64::ONE).unwrap();
    engine.connect(nodes[1], nodes[2], Fixed64::ONE).unwrap();
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, nodes[0]).unwrap();
    engine.claim_initial_node(blue, nodes[2]).unwrap();
    CaptureService::new()
        .capture_node(engine.state_mut(), nodes[1], red, None)
        .unwrap();
    (engine, red, blue)
}

#[test]
fn sustained_dominance_wins() {
    let config = GameConfig {
        dominance_threshold_percent: 60,
        dominance_duration: fixed(2.0),
        ..GameConfig::default()
    };
    let (mut engine, red, _) = lopsided_line(config);

    let mut steps = 0;
    let victory = loop {
        steps += 1;
        if let Some(victory) = engine.advance(fixed(0.5)).unwrap().victory {
            break victory;
        }
        assert!(steps < 10);
    };

    assert_eq!(steps, 4);
    assert_eq!(victory.reason, VictoryState::DominanceWin);
    assert_eq!(victory.winner, Some(red));
    assert_eq!(engine.victory().dominance_time(red), fixed(2.0));
}

#[test]
fn timeout_goes_to_the_larger_territory() {
    let config = GameConfig {
        time_limit: fixed(3.0),
        ..GameConfig::default()
    };
    let (mut engine, red, _) = lopsided_line(config);

    let victory = run_until_over(&mut engine, fixed(0.5), 10).expect("time runs out");
    assert_eq!(victory.reason, VictoryState::TimeoutWin);
    assert_eq!(victory.winner, Some(red));
    assert_eq!(victory.stats.elapsed, fixed(3.0));
    assert_eq!(victory.stats.total_nodes, 3);
}

#[test]
fn timeout_with_equal_territory_is_a_draw() {
    let config = GameConfig {
        time_limit: fixed(2.0),
        ..GameConfig::default()
    };
    let (mut engine, _) = duel_engine(config);

    let victory = run_until_over(&mut engine, fixed(0.5), 10).expect("time runs out");
    assert_eq!(victory.reason, VictoryState::Draw);
    assert_eq!(victory.winner, None);
    assert_eq!(engine.outcome(), Some(&victory));
}

// ===========================================================================
// Determinism
// ===========================================================================

#[test]
fn fixed_timestep_ignores_frame_splits() {
    let config = GameConfig {
        strategy: SimulationStrategy::Fixed {
            timestep: fixed(0.125),
        },
        ..GameConfig::default()
    };
    let frames: [&[f64]; 3] = [&[0.125; 16], &[0.25; 8], &[1.0, 0.5, 0.5]];

    let hashes: Vec<u64> = frames
        .iter()
        .map(|split| {
            let (mut engine, ids) = duel_engine(config.clone());
            assign(&mut engine, ids.red, ids.a, ids.edge, 30);
            assign(&mut engine, ids.blue, ids.b, ids.edge, 20);
            for &dt in *split {
                engine.advance(fixed(dt)).unwrap();
            }
            assert_eq!(engine.tick(), 16);
            engine.state_hash()
        })
        .collect();

    assert_eq!(hashes[0], hashes[1]);
    assert_eq!(hashes[1], hashes[2]);
}

#[test]
fn grid_match_stays_consistent() {
    let (state, nodes) = grid_graph(5, 5);
    let mut engine = Engine::new(GameConfig::default()).unwrap();
    engine.replace_state(state);
    let red = engine.add_player("red");
    let blue = engine.add_player("blue");
    engine.claim_initial_node(red, nodes[0]).unwrap();
    engine.claim_initial_node(blue, nodes[24]).unwrap();

    // Each side pushes down both of its outgoing edges.
    for (player, home) in [(red, nodes[0]), (blue, nodes[24])] {
        let edges: Vec<EdgeId> = engine
            .state()
            .graph()
            .neighbors(home)
            .map(|(edge, _)| edge)
            .collect();
        for edge in edges {
            assign(&mut engine, player, home, edge, 20);
        }
    }

    for _ in 0..60 {
        if engine.is_game_over() {
            break;
        }
        engine.advance(fixed(0.25)).unwrap();
        let violations = validate_state(engine.state());
        assert!(violations.is_empty(), "{violations:?}");
    }

    let snapshot = engine.snapshot();
    let owned: usize = snapshot.players.iter().map(|p| p.owned_nodes).sum();
    assert!(owned > 2, "expansion captured neutral nodes");
}

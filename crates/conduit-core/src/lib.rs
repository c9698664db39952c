//! Conduit Core -- the tick simulation and combat engine for graph-territory
//! contests.
//!
//! Players own nodes of a weighted graph. Owned nodes generate energy, which
//! their owners route along edges as discrete packets to reinforce allies or
//! attack enemies. Ownership cascades through connectivity: a node cut off
//! from its owner's initial node is lost, and losing the initial node
//! eliminates the player.
//!
//! # Tick Pipeline
//!
//! Each call to [`tick::TickService::execute_tick`] runs five phases in
//! strict order:
//!
//! 1. **Defenses** -- refresh defense timers.
//! 2. **Emission** -- owned nodes emit packets along assigned edges.
//! 3. **Advance** -- packets move along their edges.
//! 4. **Collisions** -- packets meeting on an edge cancel each other.
//! 5. **Arrivals** -- packets reaching a node integrate, capture, neutralize
//!    or are repelled.
//!
//! [`engine::Engine`] wraps the pipeline with command application, victory
//! tracking, event delivery and state hashing.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Match orchestrator.
//! - [`state::GameState`] -- Graph plus players.
//! - [`collision::CollisionService`] -- Packet collisions and the exact
//!   three-way combat rule.
//! - [`capture::CaptureService`] -- Ownership changes, articulation cascades,
//!   elimination.
//! - [`victory::VictoryService`] -- Dominance timers and end-of-game checks.
//! - [`command`] -- The validated command surface for input and AI layers.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod capture;
pub mod collision;
pub mod command;
pub mod config;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod graph;
pub mod id;
pub mod node_kind;
pub mod player;
pub mod query;
pub mod sim;
pub mod state;
pub mod tick;
pub mod validation;
pub mod victory;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

//! # Battle Core
//!
//! Real-time tactical battle simulation for two armies on a square
//! battlefield: unit state machines, grid pathfinding, formations, melee and
//! ranged combat, AI pursuit and ambushes, and capture points.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No input decoding
//! - No system randomness (all draws come from a seeded RNG)
//!
//! This separation enables:
//! - Headless batch runs and balance sweeps
//! - Replaying a battle from its seed and order log
//! - Determinism testing via [`simulation::Simulation::state_hash`]
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Battle loop, phases and end conditions
//! - [`unit`] - Unit state machine
//! - [`command`] - Selection and player orders
//! - [`ai`] - AI controller for computer-driven teams
//! - [`pathfinding`] - Grid map and A*
//! - [`formation`] - Formation planner
//! - [`capture`] - Capture points
//! - [`config`] - Tuning values

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod archetype;
pub mod arena;
pub mod capture;
pub mod combat;
pub mod command;
pub mod config;
pub mod error;
pub mod formation;
pub mod math;
pub mod pathfinding;
pub mod simulation;
pub mod snapshot;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archetype::{Archetype, ArchetypeStats, Team};
    pub use crate::arena::UnitId;
    pub use crate::capture::CapturePoint;
    pub use crate::command::{CommandDispatcher, PlayerIntent};
    pub use crate::config::BattleConfig;
    pub use crate::error::{BattleError, Result};
    pub use crate::formation::{FormationKind, FormationOrder};
    pub use crate::math::Vec2;
    pub use crate::pathfinding::{GridMap, Obstacle};
    pub use crate::simulation::{Simulation, SquadSpec, TickEvents};
    pub use crate::snapshot::{
        BattleOutcome, BattlePhase, BattleStatus, CapturePointSnapshot, SelectionSummary,
        UnitSnapshot,
    };
    pub use crate::unit::{Unit, UnitState};
}

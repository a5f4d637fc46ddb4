//! Headless battle runner for AI testing and CI verification.
//!
//! Plays battles without rendering or input so they can be run in bulk:
//!
//! - **Balance sweeps**: many seeds of one scenario in parallel, summarised
//! - **CI verification**: replay a seed and compare final state hashes
//! - **Scenario authoring**: load RON scenarios and check they deploy
//!
//! # Example
//!
//! ```bash
//! # Play the built-in skirmish once
//! cargo run -p battle_headless -- run --scenario skirmish --seed 7
//!
//! # Balance sweep over 200 seeds
//! cargo run -p battle_headless -- batch --scenario scenarios/siege.ron --count 200
//!
//! # Verify determinism
//! cargo run -p battle_headless -- verify --scenario siege --seed 12345 --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, BattleMetrics, MetricsCollector};
pub use runner::{run_battle, verify_determinism, RunConfig, VerifyReport};
pub use scenario::{Scenario, ScenarioError, SquadSetup};

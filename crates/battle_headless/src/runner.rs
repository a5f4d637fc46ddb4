//! Single-battle runner and determinism verification.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BattleMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a single battle run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Random seed for determinism.
    pub seed: u64,
    /// Maximum ticks before timeout (0 = the scenario's limit).
    pub max_ticks: u64,
    /// Scenario to play.
    pub scenario: Scenario,
}

impl RunConfig {
    /// Run `scenario` with `seed` and the scenario's own tick limit.
    #[must_use]
    pub fn new(scenario: Scenario, seed: u64) -> Self {
        Self {
            seed,
            max_ticks: 0,
            scenario,
        }
    }

    /// Override the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    fn tick_limit(&self) -> u64 {
        if self.max_ticks == 0 {
            self.scenario.max_ticks
        } else {
            self.max_ticks
        }
    }
}

/// Play one battle to its end or its tick limit.
pub fn run_battle(config: &RunConfig) -> Result<BattleMetrics, ScenarioError> {
    let started = Instant::now();
    let max_ticks = config.tick_limit();
    info!(
        scenario = %config.scenario.name,
        seed = config.seed,
        max_ticks,
        "Starting battle"
    );

    let mut sim = config.scenario.build(config.seed)?;
    let mut collector = MetricsCollector::new(config.scenario.name.clone(), config.seed);
    while sim.tick_count() < max_ticks {
        let events = sim.tick();
        collector.record_tick(&sim, &events);
        if let Some(outcome) = events.outcome {
            debug!(tick = sim.tick_count(), ?outcome, "Battle decided");
            break;
        }
    }

    let metrics = collector.finish(&sim);
    if metrics.outcome.is_none() {
        warn!(
            scenario = %config.scenario.name,
            seed = config.seed,
            max_ticks,
            "Battle hit the tick limit undecided"
        );
    }
    info!(
        scenario = %metrics.scenario,
        seed = metrics.seed,
        duration_ticks = metrics.duration_ticks,
        duration_ms = started.elapsed().as_millis(),
        outcome = ?metrics.outcome,
        attackers_left = metrics.teams[0].survivors,
        defenders_left = metrics.teams[1].survivors,
        "Battle complete"
    );
    Ok(metrics)
}

/// Result of replaying one seed several times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed replayed.
    pub seed: u64,
    /// Final state hash of each run.
    pub hashes: Vec<u64>,
    /// Ticks of each run.
    pub ticks: Vec<u64>,
}

impl VerifyReport {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        let same = |values: &[u64]| values.windows(2).all(|w| w[0] == w[1]);
        same(&self.hashes) && same(&self.ticks)
    }
}

/// Replay `config` `runs` times and compare final state hashes.
pub fn verify_determinism(config: &RunConfig, runs: u32) -> Result<VerifyReport, ScenarioError> {
    let mut report = VerifyReport {
        scenario: config.scenario.name.clone(),
        seed: config.seed,
        hashes: Vec::with_capacity(runs as usize),
        ticks: Vec::with_capacity(runs as usize),
    };
    for run in 0..runs {
        let metrics = run_battle(config)?;
        debug!(run, hash = metrics.final_state_hash, "Verification run");
        report.hashes.push(metrics.final_state_hash);
        report.ticks.push(metrics.duration_ticks);
    }
    if !report.is_deterministic() {
        warn!(
            scenario = %report.scenario,
            seed = report.seed,
            hashes = ?report.hashes,
            "Replays diverged"
        );
    }
    Ok(report)
}

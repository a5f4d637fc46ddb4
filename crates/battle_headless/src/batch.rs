//! Batch battle runner for balance testing.
//!
//! Runs many seeds of one scenario in parallel using rayon and aggregates
//! the per-battle metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, BattleMetrics};
use crate::runner::{run_battle, RunConfig};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario name or path to a RON file
    pub scenario: String,
    /// Number of battles to run
    pub game_count: u32,
    /// Maximum parallel battles (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed; battle `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Maximum ticks per battle (0 = the scenario's limit)
    pub max_ticks: u64,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "skirmish".to_string(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual battle metrics, in seed order
    pub games: Vec<BattleMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run a batch of battles.
///
/// The scenario is resolved once up front; a scenario that cannot be loaded
/// fails the whole batch, while a failure inside one battle is recorded in
/// [`BatchResults::errors`].
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let start = Instant::now();
    let scenario = Scenario::resolve(&config.scenario)?;
    info!(
        games = config.game_count,
        scenario = %scenario.name,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let completed = AtomicU32::new(0);
    let report_every = (config.game_count / 10).max(1);
    let play = |index: u32| {
        let seed = config.seed_start + u64::from(index);
        let run = RunConfig::new(scenario.clone(), seed).with_max_ticks(config.max_ticks);
        let result = run_battle(&run).map_err(|e| BatchError {
            game_index: index,
            seed,
            message: e.to_string(),
        });
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % report_every == 0 {
            debug!(done, total = config.game_count, "Batch progress");
        }
        result
    };

    let seeds = 0..config.game_count;
    let outcomes: Vec<Result<BattleMetrics, BatchError>> =
        match thread_pool(config.parallel_games) {
            Some(pool) => pool.install(|| seeds.into_par_iter().map(&play).collect()),
            None => seeds.into_par_iter().map(&play).collect(),
        };

    let mut games = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(metrics) => games.push(metrics),
            Err(error) => {
                warn!(
                    game = error.game_index,
                    seed = error.seed,
                    error = %error.message,
                    "Battle failed"
                );
                errors.push(error);
            }
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        games = games.len(),
        failed = errors.len(),
        victory_rate = summary.victory_rate,
        timeouts = summary.timeouts,
        duration_secs = format!("{duration_seconds:.1}"),
        "Batch complete"
    );
    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    })
}

fn thread_pool(threads: u32) -> Option<rayon::ThreadPool> {
    if threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads as usize)
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(error = %e, threads, "Falling back to the global thread pool");
            None
        }
    }
}

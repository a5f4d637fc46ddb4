//! Headless battle runner.
//!
//! Runs battles without graphics. Reports go to stdout (or a file) as JSON;
//! logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run a single battle
//! cargo run -p battle_headless -- run --scenario skirmish --seed 3
//!
//! # Run batch balance test
//! cargo run -p battle_headless -- batch --scenario siege --count 500 --output results/
//!
//! # Verify determinism
//! cargo run -p battle_headless -- verify --scenario scenarios/skirmish.ron --runs 5
//! ```
//!
//! `RUST_LOG` overrides the log filter.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_headless::{
    batch::{run_batch, BatchConfig},
    runner::{run_battle, verify_determinism, RunConfig},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "battle-headless")]
#[command(about = "Headless battle runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle and print its metrics
    Run {
        /// Built-in scenario (skirmish, siege) or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Battle seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit (0 = the scenario's own)
        #[arg(long, default_value = "0")]
        max_ticks: u64,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Built-in scenario (skirmish, siege) or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of battles to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit per battle (0 = the scenario's own)
        #[arg(long, default_value = "0")]
        max_ticks: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running the same seed several times
    Verify {
        /// Built-in scenario (skirmish, siege) or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick limit per run (0 = the scenario's own)
        #[arg(long, default_value = "0")]
        max_ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            max_ticks,
            output,
        } => cmd_run(&scenario, seed, max_ticks, output),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            max_ticks,
            output,
        } => cmd_batch(scenario, count, parallel, seed, max_ticks, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
            max_ticks,
        } => cmd_verify(&scenario, seed, runs, max_ticks),
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!(error = %e, scenario = name, "Failed to load scenario");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single battle
fn cmd_run(scenario: &str, seed: u64, max_ticks: u64, output: Option<PathBuf>) {
    let config = RunConfig::new(load_scenario(scenario), seed).with_max_ticks(max_ticks);
    let metrics = match run_battle(&config) {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&metrics) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("FATAL: Failed to encode report: {e}");
            std::process::exit(1);
        }
    };
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("FATAL: Failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
            eprintln!("Report saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
}

/// Run a batch of battles for balance testing
fn cmd_batch(
    scenario: String,
    count: u32,
    parallel: u32,
    seed: u64,
    max_ticks: u64,
    output: PathBuf,
) {
    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig {
        scenario,
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
        max_ticks,
        output_dir: output.clone(),
    };
    let results = match run_batch(config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles played: {}", summary.games);
    if !results.errors.is_empty() {
        eprintln!("Battles FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Attacker wins: {:.1}%  defeats: {}  timeouts: {}",
        summary.victory_rate * 100.0,
        summary.defeats,
        summary.timeouts
    );
    eprintln!("Average length: {:.0} ticks", summary.avg_ticks);
    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Battle {} (seed {}): {}",
            error.game_index, error.seed, error.message
        );
    }
    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism by replaying one seed
fn cmd_verify(scenario: &str, seed: u64, runs: u32, max_ticks: u64) {
    let config = RunConfig::new(load_scenario(scenario), seed).with_max_ticks(max_ticks);
    let report = match verify_determinism(&config, runs) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    if report.is_deterministic() {
        eprintln!(
            "PASS: {} runs of '{}' seed {} ended in state {:#018x}",
            runs,
            report.scenario,
            seed,
            report.hashes.first().copied().unwrap_or_default()
        );
    } else {
        eprintln!("FAIL: runs diverged");
        for (i, (hash, ticks)) in report.hashes.iter().zip(&report.ticks).enumerate() {
            eprintln!("  run {i}: {hash:#018x} after {ticks} ticks");
        }
        std::process::exit(1);
    }
}

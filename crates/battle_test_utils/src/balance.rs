//! Balance testing utilities for headless simulation.
//!
//! Runs battles to completion and aggregates their results, and derives
//! nominal time-to-kill figures straight from the archetype table so tests
//! can catch a stats change that flips a matchup.

use battle_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of a simulated battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    /// How the battle ended (None if it timed out).
    pub outcome: Option<BattleOutcome>,
    /// Simulation ticks elapsed.
    pub ticks: u64,
    /// Units deployed per team.
    pub deployed: [usize; 2],
    /// Units still alive per team.
    pub survivors: [usize; 2],
    /// Kills credited per team.
    pub kills: [u32; 2],
}

impl BattleResult {
    /// Fraction of the winning side still standing, or 0 for a timeout.
    #[must_use]
    pub fn winner_survival(&self) -> f64 {
        let team = match self.outcome {
            Some(BattleOutcome::Victory) => Team::Attacker,
            Some(BattleOutcome::Defeat) => Team::Defender,
            None => return 0.0,
        };
        let deployed = self.deployed[team.index()];
        if deployed == 0 {
            return 0.0;
        }
        self.survivors[team.index()] as f64 / deployed as f64
    }
}

/// Run `sim` with fixed ticks until it finishes or `max_ticks` pass.
pub fn run_battle(sim: &mut Simulation, max_ticks: u64) -> BattleResult {
    for _ in 0..max_ticks {
        sim.tick();
        if sim.status().outcome().is_some() {
            break;
        }
    }
    let status = sim.status();
    debug!(
        outcome = ?status.outcome(),
        ticks = status.tick,
        attackers = status.alive(Team::Attacker),
        defenders = status.alive(Team::Defender),
        "battle run complete"
    );
    BattleResult {
        outcome: status.outcome(),
        ticks: status.tick,
        deployed: status.deployed,
        survivors: status.alive,
        kills: status.kills,
    }
}

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Attacker victories.
    pub victories: u32,
    /// Attacker defeats.
    pub defeats: u32,
    /// Battles that hit the tick limit.
    pub timeouts: u32,
    /// Average ticks to resolution.
    pub avg_ticks: f64,
    /// Average surviving fraction of the winning side.
    pub avg_winner_survival: f64,
}

impl BattleStats {
    /// Aggregate a set of results.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a BattleResult>) -> Self {
        let mut stats = Self::default();
        let mut ticks = 0.0;
        let mut survival = 0.0;
        for result in results {
            stats.total_battles += 1;
            match result.outcome {
                Some(BattleOutcome::Victory) => stats.victories += 1,
                Some(BattleOutcome::Defeat) => stats.defeats += 1,
                None => stats.timeouts += 1,
            }
            ticks += result.ticks as f64;
            survival += result.winner_survival();
        }
        if stats.total_battles > 0 {
            let n = f64::from(stats.total_battles);
            stats.avg_ticks = ticks / n;
            stats.avg_winner_survival = survival / n;
        }
        stats
    }

    /// Attacker win rate (0.0 to 1.0).
    #[must_use]
    pub fn victory_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.victories) / f64::from(self.total_battles)
    }

    /// Defender win rate (0.0 to 1.0).
    #[must_use]
    pub fn defeat_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.defeats) / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (attacker win rate within range).
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.victory_rate();
        rate >= min_rate && rate <= max_rate
    }
}

/// Hits `attacker` needs to kill a fresh `target` at the nominal damage factor.
#[must_use]
pub fn hits_to_kill(attacker: Archetype, target: Archetype) -> u32 {
    let power = attacker.stats().attack_power;
    if power <= 0.0 {
        return u32::MAX;
    }
    (target.stats().max_hp / power).ceil() as u32
}

/// Seconds for `attacker` to kill `target` 1v1, ignoring the first swing.
#[must_use]
pub fn time_to_kill(attacker: Archetype, target: Archetype) -> f32 {
    hits_to_kill(attacker, target) as f32 * attacker.stats().attack_cooldown
}

/// How much faster `attacker` kills `target` than the reverse; above 1 favours `attacker`.
#[must_use]
pub fn trade_ratio(attacker: Archetype, target: Archetype) -> f32 {
    time_to_kill(target, attacker) / time_to_kill(attacker, target)
}

/// Generate a TTK (time-to-kill) matrix for all archetype matchups.
#[must_use]
pub fn generate_ttk_matrix() -> Vec<(Archetype, Archetype, f32)> {
    let mut results = Vec::new();
    for attacker in Archetype::ALL {
        for target in Archetype::ALL {
            results.push((attacker, target, time_to_kill(attacker, target)));
        }
    }
    results
}

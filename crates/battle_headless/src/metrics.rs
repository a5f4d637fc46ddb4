//! Battle metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the events of every tick and folds them
//! into a [`BattleMetrics`] record; [`BatchSummary`] aggregates many records.

use battle_core::combat::Hit;
use battle_core::prelude::{Archetype, BattleOutcome, Simulation, TickEvents};
use serde::{Deserialize, Serialize};

/// Per-team figures, indexed by `Team::index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Units deployed.
    pub deployed: usize,
    /// Units alive at the end.
    pub survivors: usize,
    /// Enemy units killed.
    pub kills: u32,
    /// Damage dealt to enemy units.
    pub damage_dealt: f64,
    /// Hits landed.
    pub hits: u32,
    /// Units lost, per archetype (`Archetype as usize`).
    pub losses_by_archetype: [u32; 3],
}

impl TeamMetrics {
    /// Kills per loss; kills alone when nothing was lost.
    #[must_use]
    pub fn kd_ratio(&self) -> f64 {
        let losses = self.deployed.saturating_sub(self.survivors);
        if losses == 0 {
            return f64::from(self.kills);
        }
        f64::from(self.kills) / losses as f64
    }
}

/// Complete metrics for a single battle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Simulated seconds.
    pub duration_seconds: f64,
    /// How the battle ended (None = timeout).
    pub outcome: Option<BattleOutcome>,
    /// Attacker then defender.
    pub teams: [TeamMetrics; 2],
    /// Capture point ownership changes.
    pub capture_flips: u32,
    /// Tick of the first hit.
    pub first_blood_tick: Option<u64>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

/// Accumulates [`BattleMetrics`] across ticks.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: BattleMetrics,
}

impl MetricsCollector {
    /// Start collecting for one battle.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: BattleMetrics {
                scenario: scenario.into(),
                seed,
                ..Default::default()
            },
        }
    }

    /// Fold in the events of the tick that just ran.
    pub fn record_tick(&mut self, sim: &Simulation, events: &TickEvents) {
        let tick = sim.tick_count();
        for hit in &events.hits {
            self.record_hit(tick, hit);
        }
        for &id in &events.deaths {
            if let Ok(unit) = sim.unit(id) {
                self.metrics.teams[unit.team.index()].losses_by_archetype
                    [unit.archetype as usize] += 1;
            }
        }
        self.metrics.capture_flips += events.captures.len() as u32;
    }

    fn record_hit(&mut self, tick: u64, hit: &Hit) {
        let team = &mut self.metrics.teams[hit.attacker_team.index()];
        team.hits += 1;
        team.damage_dealt += f64::from(hit.damage);
        self.metrics.first_blood_tick.get_or_insert(tick);
    }

    /// Close the record with the battle's final status.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> BattleMetrics {
        let status = sim.status();
        self.metrics.duration_ticks = status.tick;
        self.metrics.duration_seconds = f64::from(status.elapsed);
        self.metrics.outcome = status.outcome();
        for (i, team) in self.metrics.teams.iter_mut().enumerate() {
            team.deployed = status.deployed[i];
            team.survivors = status.alive[i];
            team.kills = status.kills[i];
        }
        self.metrics.final_state_hash = sim.state_hash();
        self.metrics
    }
}

/// Aggregate statistics over a batch of battles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles summarised.
    pub games: u32,
    /// Attacker victories.
    pub victories: u32,
    /// Attacker defeats.
    pub defeats: u32,
    /// Battles that hit the tick limit.
    pub timeouts: u32,
    /// Attacker win rate over all battles.
    pub victory_rate: f64,
    /// Mean battle length in ticks.
    pub avg_ticks: f64,
    /// Mean survivors per team.
    pub avg_survivors: [f64; 2],
    /// Mean damage dealt per team.
    pub avg_damage: [f64; 2],
    /// Total units lost per archetype, both teams.
    pub losses_by_archetype: [u32; 3],
}

impl BatchSummary {
    /// Summarise a set of battles.
    #[must_use]
    pub fn from_games(games: &[BattleMetrics]) -> Self {
        let mut summary = Self::default();
        for game in games {
            summary.games += 1;
            match game.outcome {
                Some(BattleOutcome::Victory) => summary.victories += 1,
                Some(BattleOutcome::Defeat) => summary.defeats += 1,
                None => summary.timeouts += 1,
            }
            summary.avg_ticks += game.duration_ticks as f64;
            for (i, team) in game.teams.iter().enumerate() {
                summary.avg_survivors[i] += team.survivors as f64;
                summary.avg_damage[i] += team.damage_dealt;
                for archetype in Archetype::ALL {
                    summary.losses_by_archetype[archetype as usize] +=
                        team.losses_by_archetype[archetype as usize];
                }
            }
        }
        if summary.games > 0 {
            let n = f64::from(summary.games);
            summary.victory_rate = f64::from(summary.victories) / n;
            summary.avg_ticks /= n;
            for i in 0..2 {
                summary.avg_survivors[i] /= n;
                summary.avg_damage[i] /= n;
            }
        }
        summary
    }
}

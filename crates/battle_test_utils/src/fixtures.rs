//! Test fixtures and helpers.
//!
//! Pre-built battles for consistent testing. Every fixture uses a fixed seed
//! so the same fixture always plays out the same way.

use battle_core::pathfinding::Obstacle;
use battle_core::prelude::*;

/// Seed used by fixtures unless a test picks its own.
pub const FIXTURE_SEED: u64 = 0x5EED;

/// Config where no team is AI-driven.
#[must_use]
pub fn player_config() -> BattleConfig {
    BattleConfig::default()
        .with_seed(FIXTURE_SEED)
        .with_ai_teams(&[])
}

/// Config where both teams are AI-driven, for hands-off battles.
#[must_use]
pub fn all_ai_config(seed: u64) -> BattleConfig {
    BattleConfig::default()
        .with_seed(seed)
        .with_ai_teams(&Team::ALL)
}

/// Build a battle or panic; fixture configs are always valid.
///
/// # Panics
///
/// Panics if `config` fails validation.
#[must_use]
pub fn battle(config: BattleConfig) -> Simulation {
    Simulation::new(config).expect("fixture config must be valid")
}

/// Two lines of melee infantry facing each other `gap` apart, already active.
///
/// Attackers stand on `z = -gap / 2`, defenders on `z = gap / 2`, spaced one
/// unit apart along x with no jitter.
#[must_use]
pub fn melee_lines(per_side: usize, gap: f32, config: BattleConfig) -> Simulation {
    let mut sim = battle(config);
    for i in 0..per_side {
        let x = i as f32 - (per_side as f32 - 1.0) / 2.0;
        sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(x, -gap / 2.0), 1);
        sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(x, gap / 2.0), 2);
    }
    sim.begin_battle();
    sim
}

/// A mixed skirmish with every archetype on both sides, already active.
#[must_use]
pub fn mixed_skirmish(seed: u64) -> Simulation {
    let mut sim = battle(all_ai_config(seed));
    let squads = [
        (Archetype::Melee, 8, -8.0),
        (Archetype::Ranged, 6, 0.0),
        (Archetype::Mounted, 4, 8.0),
    ];
    for (i, (archetype, count, x)) in squads.into_iter().enumerate() {
        let squad = i as u32;
        sim.deploy_squad(&SquadSpec::new(
            Team::Attacker,
            archetype,
            count,
            Vec2::new(x, -20.0),
            squad,
        ));
        sim.deploy_squad(&SquadSpec::new(
            Team::Defender,
            archetype,
            count,
            Vec2::new(x, 16.0),
            squad + 10,
        ));
    }
    sim.begin_battle();
    sim
}

/// Obstacles forming a closed ring of blocked cells around `center`.
///
/// The cell at the centre stays passable but cannot be reached.
#[must_use]
pub fn walled_pocket(center: Vec2) -> Vec<Obstacle> {
    let mut ring = Vec::new();
    for dx in -1..=1 {
        for dy in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            ring.push(Obstacle {
                center: center + Vec2::new(dx as f32, dy as f32),
                radius: 0.4,
            });
        }
    }
    ring
}

/// Centre of the grid cell containing `pos` on a unit-cell map.
#[must_use]
pub fn cell_centre(pos: Vec2) -> Vec2 {
    pos.floor() + Vec2::splat(0.5)
}

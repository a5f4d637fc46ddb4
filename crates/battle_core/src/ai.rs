//! AI controller for computer-driven teams.
//!
//! Every tick each AI unit that is not already fighting a live enemy looks for
//! the nearest live enemy within its detection radius. Enemies in reach are
//! attacked; otherwise the unit chases, remembering the enemy as its pursuit
//! target so the path refresh can follow it.
//!
//! Now and then a chasing unit switches to ambush mode instead: it heads for a
//! point ahead of where its quarry is facing and only resumes the direct chase
//! once the ambush runs out or the quarry comes close.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arena::UnitId;
use crate::math::{forward, Vec2};
use crate::simulation::SimulationContext;
use crate::unit::{nearest_enemy, UnitState};

/// How an AI unit approaches its quarry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiMode {
    /// Chase the enemy's current position.
    #[default]
    Direct,
    /// Head for a point ahead of the enemy.
    Ambush,
}

/// Per-unit AI state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AiMind {
    /// Current approach.
    pub mode: AiMode,
    /// Seconds until the next ambush roll.
    pub ambush_cooldown: f32,
    /// Seconds left in the current ambush.
    pub ambush_remaining: f32,
}

/// Run one AI decision for the unit behind `id`.
///
/// Does nothing for dead units, units that are fighting a live enemy and
/// units whose team is player-driven.
pub fn decide(id: UnitId, ctx: &mut SimulationContext, dt: f32) {
    let Some(unit) = ctx.units.get(id) else {
        return;
    };
    if !unit.is_alive() || !ctx.config.is_ai(unit.team) {
        return;
    }
    if unit.state == UnitState::Attacking
        && unit
            .target_unit
            .and_then(|t| ctx.units.get(t))
            .is_some_and(|t| t.is_alive())
    {
        return;
    }

    let (team, position, reach, mut mind, pursuit) = (
        unit.team,
        unit.position,
        unit.attack_range + ctx.config.units.engage_slack,
        unit.ai,
        unit.pursuit,
    );
    let tuning = ctx.config.ai;
    let detection = tuning.detection_radius * ctx.config.difficulty;

    let Some((enemy, dist)) = nearest_enemy(&ctx.units, team, position, detection) else {
        return;
    };
    let Some(enemy_unit) = ctx.units.get(enemy) else {
        return;
    };
    let (enemy_pos, enemy_facing) = (enemy_unit.position, enemy_unit.facing);

    mind.ambush_cooldown -= dt;
    if mind.mode == AiMode::Ambush {
        mind.ambush_remaining -= dt;
        if mind.ambush_remaining <= 0.0 || dist <= tuning.ambush_min_distance {
            mind.mode = AiMode::Direct;
        }
    } else if mind.ambush_cooldown <= 0.0 {
        mind.ambush_cooldown = tuning.ambush_cooldown;
        if dist > reach.max(tuning.ambush_min_distance)
            && ctx.rng.gen::<f32>() < tuning.ambush_chance
        {
            mind.mode = AiMode::Ambush;
            mind.ambush_remaining = tuning.ambush_duration;
            debug!(unit = %id, quarry = %enemy, "AI unit sets an ambush");
            let point =
                ctx.clamp_to_field(ambush_point(enemy_pos, enemy_facing, tuning.ambush_lead));
            if let Some(unit) = ctx.units.get_mut(id) {
                unit.ai = mind;
                unit.order_move(point, None, unit.is_guarding);
            }
            return;
        }
    }

    let Some(unit) = ctx.units.get_mut(id) else {
        return;
    };
    unit.ai = mind;

    if dist <= reach {
        unit.state = UnitState::Attacking;
        unit.target_unit = Some(enemy);
        unit.pursuit = None;
        unit.path.clear();
        return;
    }

    if mind.mode == AiMode::Ambush {
        // Keep walking to the ambush point; go idle there and wait
        return;
    }

    if pursuit != Some(enemy) || unit.state != UnitState::Moving {
        unit.order_move(enemy_pos, None, unit.is_guarding);
        unit.pursuit = Some(enemy);
    }
}

/// Run AI decisions for every unit, in handle order.
pub fn run_ai(ctx: &mut SimulationContext, dt: f32) {
    for id in ctx.units.ids() {
        decide(id, ctx, dt);
    }
}

/// Where an ambusher should stand to meet a unit at `position` facing `facing`.
#[must_use]
pub fn ambush_point(position: Vec2, facing: f32, lead: f32) -> Vec2 {
    position + forward(facing) * lead
}

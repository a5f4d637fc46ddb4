//! Battle units and their per-tick state machine.
//!
//! ```text
//! Idle ──order/AI──▶ Moving ──arrive──▶ Idle
//!  │                   │
//!  └──enemy in reach──▶ Attacking ──target gone──▶ Idle
//!
//! any ──hp reaches 0──▶ Dead (terminal)
//! ```
//!
//! A unit only ever reads other units through its [`SimulationContext`]; the
//! loop moves the unit being updated out of the arena for the duration of its
//! step, so it can mutate itself and its target at the same time.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ai::AiMind;
use crate::archetype::{Archetype, Team};
use crate::arena::{Arena, UnitId};
use crate::combat::resolve_attack;
use crate::math::{heading, step_toward, turn_toward, Vec2};
use crate::pathfinding::{has_line_of_sight, GridMap};
use crate::simulation::{SimulationContext, TickEvents};

/// Arena holding every unit in a battle.
pub type UnitArena = Arena<Unit>;

/// Behavioural state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// Standing still, watching for enemies.
    #[default]
    Idle,
    /// Walking toward `target_position`.
    Moving,
    /// Fighting `target_unit`.
    Attacking,
    /// Killed. Never leaves this state.
    Dead,
}

/// A single combat unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Side this unit fights for.
    pub team: Team,
    /// Combat archetype.
    pub archetype: Archetype,
    /// Squad this unit was deployed with.
    pub squad_id: u32,
    /// Ground position.
    pub position: Vec2,
    /// Facing angle; `0` looks down `+z`.
    pub facing: f32,
    /// Where the current move order ends.
    pub target_position: Option<Vec2>,
    /// Facing to adopt once the current move order has arrived.
    pub rest_facing: Option<f32>,
    /// Current hit points, in `[0, max_hp]`.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Base damage per hit.
    pub attack_power: f32,
    /// Attack reach.
    pub attack_range: f32,
    /// Walking speed in world units per second.
    pub move_speed: f32,
    /// Seconds between hits.
    pub attack_cooldown: f32,
    /// Seconds until the next hit may land.
    pub attack_timer: f32,
    /// Behavioural state.
    pub state: UnitState,
    /// Enemy being fought. Weak: validated every time it is read.
    pub target_unit: Option<UnitId>,
    /// Enemy being chased by an AI move order.
    pub pursuit: Option<UnitId>,
    /// Whether the player has this unit selected.
    pub is_selected: bool,
    /// Guarding units hold their ground instead of chasing.
    pub is_guarding: bool,
    /// Remaining waypoints of the current route.
    pub path: VecDeque<Vec2>,
    /// Seconds until the route is planned again.
    pub path_timer: f32,
    /// Seconds since death, capped at the configured decay time.
    pub death_timer: f32,
    /// AI controller state; unused for player-driven units.
    pub ai: AiMind,
}

impl Unit {
    /// Create a full-health unit with its archetype's stats.
    #[must_use]
    pub fn new(team: Team, archetype: Archetype, position: Vec2, squad_id: u32) -> Self {
        let stats = archetype.stats();
        Self {
            team,
            archetype,
            squad_id,
            position,
            facing: team.deploy_facing(),
            target_position: None,
            rest_facing: None,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            attack_power: stats.attack_power,
            attack_range: stats.attack_range,
            move_speed: stats.move_speed,
            attack_cooldown: stats.attack_cooldown,
            attack_timer: 0.0,
            state: UnitState::Idle,
            target_unit: None,
            pursuit: None,
            is_selected: false,
            is_guarding: false,
            path: VecDeque::new(),
            path_timer: 0.0,
            death_timer: 0.0,
            ai: AiMind::default(),
        }
    }

    /// Whether the unit can still act.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Dead
    }

    /// Order the unit to walk to `target`.
    ///
    /// Any fight or chase in progress is dropped. The route is planned by the
    /// next path refresh.
    pub fn order_move(&mut self, target: Vec2, rest_facing: Option<f32>, keep_guard: bool) {
        if !self.is_alive() {
            return;
        }
        self.state = UnitState::Moving;
        self.target_position = Some(target);
        self.rest_facing = rest_facing;
        self.target_unit = None;
        self.pursuit = None;
        self.path.clear();
        self.path_timer = 0.0;
        if !keep_guard {
            self.is_guarding = false;
        }
    }

    /// Stop where the unit stands.
    pub fn hold(&mut self) {
        if !self.is_alive() {
            return;
        }
        self.state = UnitState::Idle;
        self.target_position = None;
        self.target_unit = None;
        self.pursuit = None;
        self.path.clear();
    }

    /// Switch guard mode. Toggling guard also halts the unit in place.
    pub fn set_guard(&mut self, guarding: bool) {
        if !self.is_alive() {
            return;
        }
        self.is_guarding = guarding;
        self.hold();
    }

    /// Subtract damage, clamping at zero. Returns `true` if this killed the unit.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.kill();
            true
        } else {
            false
        }
    }

    /// Put the unit into its terminal state.
    pub fn kill(&mut self) {
        self.hp = 0.0;
        self.state = UnitState::Dead;
        self.target_unit = None;
        self.pursuit = None;
        self.target_position = None;
        self.rest_facing = None;
        self.path.clear();
        self.is_selected = false;
        self.death_timer = 0.0;
    }

    /// Advance one tick of the state machine.
    pub(crate) fn step(
        &mut self,
        id: UnitId,
        ctx: &mut SimulationContext,
        dt: f32,
        events: &mut TickEvents,
    ) {
        if !self.is_alive() {
            self.death_timer = (self.death_timer + dt).min(ctx.config.units.death_decay);
            return;
        }

        if self.state == UnitState::Idle {
            self.step_idle(ctx, dt);
        }
        match self.state {
            UnitState::Moving => self.step_moving(ctx, dt),
            UnitState::Attacking => self.step_attacking(id, ctx, dt, events),
            UnitState::Idle | UnitState::Dead => {}
        }

        self.position = ctx.clamp_to_field(self.position);
    }

    fn step_idle(&mut self, ctx: &SimulationContext, dt: f32) {
        let tuning = &ctx.config.units;
        let slack = if self.is_guarding {
            tuning.guard_scan_slack
        } else {
            tuning.idle_scan_slack
        };
        if let Some((enemy, _)) =
            nearest_enemy(&ctx.units, self.team, self.position, self.attack_range + slack)
        {
            self.engage(enemy);
            return;
        }

        if let Some(rest) = self.rest_facing {
            self.facing = turn_toward(self.facing, rest, tuning.move_turn_rate, dt);
        }
    }

    fn step_moving(&mut self, ctx: &SimulationContext, dt: f32) {
        let tuning = &ctx.config.units;

        while self.path.len() > 1
            && self
                .path
                .front()
                .is_some_and(|wp| self.position.distance(*wp) < tuning.arrival_epsilon)
        {
            self.path.pop_front();
        }

        let Some(goal) = self.path.front().copied().or(self.target_position) else {
            self.state = UnitState::Idle;
            return;
        };

        if self.position.distance(goal) < tuning.arrival_epsilon {
            trace!(team = %self.team, "unit arrived");
            self.state = UnitState::Idle;
            self.target_position = None;
            self.pursuit = None;
            self.path.clear();
            return;
        }

        let travel = heading(self.position, goal);
        if !self.walk_toward(&ctx.grid, goal, dt) {
            self.path.clear();
            self.path_timer = 0.0;
        }
        self.facing = turn_toward(self.facing, travel, tuning.move_turn_rate, dt);

        if !self.is_guarding {
            if let Some((enemy, _)) = nearest_enemy(
                &ctx.units,
                self.team,
                self.position,
                self.attack_range + tuning.engage_slack,
            ) {
                self.engage(enemy);
            }
        }
    }

    fn step_attacking(
        &mut self,
        id: UnitId,
        ctx: &mut SimulationContext,
        dt: f32,
        events: &mut TickEvents,
    ) {
        let tuning = ctx.config.units;

        let target = self.target_unit.and_then(|t| {
            ctx.units
                .get(t)
                .filter(|u| u.is_alive())
                .map(|u| (t, u.position))
        });
        let Some((target_id, target_pos)) = target else {
            self.target_unit = None;
            self.state = UnitState::Idle;
            return;
        };

        let dist = self.position.distance(target_pos);
        self.facing = turn_toward(
            self.facing,
            heading(self.position, target_pos),
            tuning.attack_turn_rate,
            dt,
        );

        if self.is_guarding && dist > self.attack_range + tuning.guard_slack {
            self.target_unit = None;
            self.state = UnitState::Idle;
            return;
        }

        if dist > self.attack_range + tuning.engage_slack {
            if !self.is_guarding {
                self.step_chase(ctx, target_pos, dt);
            }
            return;
        }

        self.attack_timer -= dt;
        if self.attack_timer > 0.0 {
            return;
        }
        self.attack_timer = self.attack_cooldown;

        let Some(defender) = ctx.units.get_mut(target_id) else {
            return;
        };
        if let Ok(hit) = resolve_attack(id, self, target_id, defender, &tuning, &mut ctx.rng) {
            events.record_hit(hit);
        }
    }

    /// Close on a target that is out of reach.
    ///
    /// Follows the route kept by the path refresh. Without one the unit walks
    /// straight at the target only when nothing blocks the way, and otherwise
    /// waits for the next refresh.
    fn step_chase(&mut self, ctx: &SimulationContext, target_pos: Vec2, dt: f32) {
        let epsilon = ctx.config.units.arrival_epsilon;
        while self
            .path
            .front()
            .is_some_and(|wp| self.position.distance(*wp) < epsilon)
        {
            self.path.pop_front();
        }

        let goal = match self.path.front() {
            Some(&waypoint) => waypoint,
            None if has_line_of_sight(&ctx.grid, self.position, target_pos) => target_pos,
            None => return,
        };
        if !self.walk_toward(&ctx.grid, goal, dt) {
            // Stale route; replan on the next refresh
            self.path.clear();
            self.path_timer = 0.0;
        }
    }

    /// Step toward `goal` without entering blocked terrain.
    ///
    /// A step into a blocked cell slides along whichever axis stays clear.
    /// Returns `false` when the unit could not move at all.
    fn walk_toward(&mut self, grid: &GridMap, goal: Vec2, dt: f32) -> bool {
        let from = self.position;
        let next = step_toward(from, goal, self.move_speed * dt);
        let slides = [next, Vec2::new(next.x, from.y), Vec2::new(from.x, next.y)];
        match slides
            .into_iter()
            .find(|&to| to != from && grid.permits_step(from, to))
        {
            Some(to) => {
                self.position = to;
                true
            }
            None => false,
        }
    }

    fn engage(&mut self, enemy: UnitId) {
        self.state = UnitState::Attacking;
        self.target_unit = Some(enemy);
        self.pursuit = None;
        self.path.clear();
        self.path_timer = 0.0;
    }
}

/// Nearest live enemy of `team` strictly closer than `max_dist` to `from`.
///
/// Ties go to the enemy stored first.
#[must_use]
pub fn nearest_enemy(
    units: &UnitArena,
    team: Team,
    from: Vec2,
    max_dist: f32,
) -> Option<(UnitId, f32)> {
    let mut best: Option<(UnitId, f32)> = None;
    for (id, other) in units.iter() {
        if other.team != team.opponent() || !other.is_alive() {
            continue;
        }
        let d = from.distance(other.position);
        if d < max_dist && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((id, d));
        }
    }
    best
}

//! Core battle loop.
//!
//! A [`Simulation`] owns every unit, the terrain grid, the capture points and
//! the battle RNG, and advances them one tick at a time. Each tick runs the
//! same passes in the same order:
//!
//! 1. AI decisions (active phase only)
//! 2. path refresh for moving units whose refresh timer ran out
//! 3. per-unit state machine, including combat
//! 4. separation of crowded units
//! 5. capture point tally (active phase only)
//! 6. victory and defeat check (active phase only)
//!
//! # Determinism
//!
//! Given the same seed, configuration and sequence of orders, two battles
//! produce the same state on every tick:
//! - every random draw goes through the context's seeded [`ChaCha8Rng`]
//! - units are always visited in arena slot order
//! - nothing reads the wall clock; time only advances through `dt`
//!
//! [`Simulation::state_hash`] condenses the state into a single value for
//! comparing runs.
//!
//! # Example
//!
//! ```
//! use battle_core::prelude::*;
//!
//! let mut sim = Simulation::new(BattleConfig::default().with_seed(7))?;
//! sim.deploy_squad(&SquadSpec::new(Team::Attacker, Archetype::Melee, 5, Vec2::new(0.0, -20.0), 1));
//! sim.deploy_squad(&SquadSpec::new(Team::Defender, Archetype::Melee, 5, Vec2::new(0.0, 20.0), 2));
//! sim.begin_battle();
//!
//! for _ in 0..100 {
//!     sim.tick();
//! }
//! assert_eq!(sim.tick_count(), 100);
//! # Ok::<(), battle_core::error::BattleError>(())
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::run_ai;
use crate::archetype::{Archetype, Team};
use crate::arena::UnitId;
use crate::capture::{all_held_by_attackers, update_capture_points, CaptureEvent, CapturePoint};
use crate::combat::Hit;
use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::formation::deployment_slots;
use crate::math::Vec2;
use crate::pathfinding::{plan_route, GridMap, Obstacle, Route};
use crate::snapshot::{
    BattleOutcome, BattlePhase, BattleStatus, CapturePointSnapshot, UnitSnapshot,
};
use crate::unit::{Unit, UnitArena, UnitState};

/// Distance below which two units count as stacked on the same spot.
const COINCIDENT: f32 = 0.01;

/// Battle-wide state shared by every pass of a tick.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// Every unit, alive or dead.
    pub units: UnitArena,
    /// Contested zones, in scenario order.
    pub capture_points: Vec<CapturePoint>,
    /// Static terrain.
    pub grid: GridMap,
    /// Tuning values.
    pub config: BattleConfig,
    /// The battle's only source of randomness.
    pub rng: ChaCha8Rng,
}

impl SimulationContext {
    /// Create an empty context seeded from `config.seed`.
    #[must_use]
    pub fn new(config: BattleConfig, grid: GridMap) -> Self {
        Self {
            units: UnitArena::new(),
            capture_points: Vec::new(),
            grid,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Clamp a position into the playable part of the map.
    #[must_use]
    pub fn clamp_to_field(&self, pos: Vec2) -> Vec2 {
        let limit = self.config.half_extent() - self.config.units.edge_margin;
        pos.clamp(Vec2::splat(-limit), Vec2::splat(limit))
    }

    /// Live units of `team`.
    #[must_use]
    pub fn live_count(&self, team: Team) -> usize {
        self.units
            .iter()
            .filter(|(_, u)| u.team == team && u.is_alive())
            .count()
    }
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Resolved attacks, in the order they landed.
    pub hits: Vec<Hit>,
    /// Units killed this tick.
    pub deaths: Vec<UnitId>,
    /// Capture point ownership changes.
    pub captures: Vec<CaptureEvent>,
    /// Set on the tick the battle is decided.
    pub outcome: Option<BattleOutcome>,
}

impl TickEvents {
    pub(crate) fn record_hit(&mut self, hit: Hit) {
        if hit.killed {
            self.deaths.push(hit.defender);
        }
        self.hits.push(hit);
    }

    /// Whether nothing of note happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
            && self.deaths.is_empty()
            && self.captures.is_empty()
            && self.outcome.is_none()
    }
}

/// One squad to put on the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadSpec {
    /// Side the squad fights for.
    pub team: Team,
    /// Archetype of every unit in the squad.
    pub archetype: Archetype,
    /// Number of units.
    pub count: usize,
    /// Front-centre of the deployment grid.
    pub anchor: Vec2,
    /// Squad identifier used for selection cycling.
    pub squad_id: u32,
}

impl SquadSpec {
    /// Create a squad description.
    #[must_use]
    pub fn new(team: Team, archetype: Archetype, count: usize, anchor: Vec2, squad_id: u32) -> Self {
        Self {
            team,
            archetype,
            count,
            anchor,
            squad_id,
        }
    }
}

/// The battle simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    ctx: SimulationContext,
    phase: BattlePhase,
    tick: u64,
    elapsed: f32,
    kills: [u32; 2],
    deployed: [usize; 2],
}

impl Simulation {
    /// Create a battle on open ground.
    pub fn new(config: BattleConfig) -> Result<Self> {
        let grid = GridMap::for_map(config.map_size, config.cell_size)?;
        Self::with_grid(config, grid)
    }

    /// Create a battle on ground with circular obstacles.
    pub fn with_obstacles(config: BattleConfig, obstacles: &[Obstacle]) -> Result<Self> {
        let grid = GridMap::from_obstacles(config.map_size, config.cell_size, obstacles)?;
        Self::with_grid(config, grid)
    }

    /// Create a battle on a prepared grid.
    pub fn with_grid(config: BattleConfig, grid: GridMap) -> Result<Self> {
        config.validate()?;
        debug!(
            seed = config.seed,
            width = grid.width(),
            height = grid.height(),
            blocked = grid.blocked_count(),
            "Battle created"
        );
        Ok(Self {
            ctx: SimulationContext::new(config, grid),
            phase: BattlePhase::Deployment,
            tick: 0,
            elapsed: 0.0,
            kills: [0; 2],
            deployed: [0; 2],
        })
    }

    /// Shared battle state.
    #[must_use]
    pub const fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Mutable battle state, for tools and tests that stage situations directly.
    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.ctx.config
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Ticks simulated so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Look up a unit.
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.ctx.units.try_get(id)
    }

    /// Look up a unit mutably.
    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.ctx.units.try_get_mut(id)
    }

    /// Remove a unit from the battle entirely.
    ///
    /// Handles to it held elsewhere go stale and resolve to nothing.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.ctx.units.remove(id)
    }

    /// Put a single unit on the field.
    ///
    /// The attack timer starts at a random phase so a freshly deployed line
    /// does not swing in unison. AI units move faster on higher difficulty.
    pub fn spawn_unit(
        &mut self,
        team: Team,
        archetype: Archetype,
        position: Vec2,
        squad_id: u32,
    ) -> UnitId {
        let position = self.ctx.clamp_to_field(position);
        let mut unit = Unit::new(team, archetype, position, squad_id);

        let jitter = self.ctx.config.units.initial_attack_jitter;
        if jitter > 0.0 {
            unit.attack_timer = self.ctx.rng.gen_range(0.0..jitter);
        }
        if self.ctx.config.is_ai(team) {
            unit.move_speed *= self.ctx.config.difficulty;
        }

        self.deployed[team.index()] += 1;
        self.ctx.units.insert(unit)
    }

    /// Deploy a squad on a square grid around its anchor.
    pub fn deploy_squad(&mut self, squad: &SquadSpec) -> Vec<UnitId> {
        let tuning = self.ctx.config.formation;
        let slots = deployment_slots(squad.anchor, squad.count, tuning.deploy_spacing);
        let ids: Vec<UnitId> = slots
            .into_iter()
            .map(|slot| {
                let offset = if tuning.deploy_jitter > 0.0 {
                    let j = tuning.deploy_jitter;
                    Vec2::new(
                        self.ctx.rng.gen_range(-j..=j),
                        self.ctx.rng.gen_range(-j..=j),
                    )
                } else {
                    Vec2::ZERO
                };
                self.spawn_unit(squad.team, squad.archetype, slot + offset, squad.squad_id)
            })
            .collect();

        debug!(
            team = %squad.team,
            archetype = %squad.archetype,
            squad = squad.squad_id,
            count = ids.len(),
            "Squad deployed"
        );
        ids
    }

    /// Bring a fresh squad onto the field mid-battle.
    pub fn spawn_reinforcements(&mut self, squad: &SquadSpec) -> Result<Vec<UnitId>> {
        if let BattlePhase::Finished(_) = self.phase {
            return Err(BattleError::BattleFinished);
        }
        let ids = self.deploy_squad(squad);
        info!(
            tick = self.tick,
            team = %squad.team,
            count = ids.len(),
            "Reinforcements arrived"
        );
        Ok(ids)
    }

    /// Add a capture point held by the defenders. Returns its index.
    pub fn add_capture_point(&mut self, position: Vec2) -> usize {
        self.ctx.capture_points.push(CapturePoint::new(position));
        self.ctx.capture_points.len() - 1
    }

    /// End deployment and start the fight.
    pub fn begin_battle(&mut self) {
        if self.phase == BattlePhase::Deployment {
            self.phase = BattlePhase::Active;
            info!(
                attackers = self.ctx.live_count(Team::Attacker),
                defenders = self.ctx.live_count(Team::Defender),
                capture_points = self.ctx.capture_points.len(),
                "Battle started"
            );
        }
    }

    /// Advance by one maximum-length tick.
    pub fn tick(&mut self) -> TickEvents {
        let dt = self.ctx.config.max_tick_dt;
        self.update(dt)
    }

    /// Advance the battle by `dt` seconds.
    ///
    /// `dt` is clamped to `[0, max_tick_dt]`; a non-finite `dt` counts as zero.
    /// Once the battle is decided this does nothing.
    pub fn update(&mut self, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();
        if let BattlePhase::Finished(_) = self.phase {
            return events;
        }

        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.ctx.config.max_tick_dt)
        } else {
            0.0
        };
        let active = self.phase == BattlePhase::Active;

        if active {
            run_ai(&mut self.ctx, dt);
        }
        self.refresh_paths(dt);
        self.step_units(dt, &mut events);
        self.separate(dt);

        if active {
            events.captures = update_capture_points(
                &mut self.ctx.capture_points,
                &self.ctx.units,
                &self.ctx.config.capture,
                dt,
            );
            for capture in &events.captures {
                info!(point = capture.point, owner = %capture.owner, "Capture point changed hands");
            }

            if let Some(outcome) = self.check_outcome() {
                self.phase = BattlePhase::Finished(outcome);
                events.outcome = Some(outcome);
                info!(tick = self.tick, ?outcome, kills = ?self.kills, "Battle decided");
            }
        }

        self.tick += 1;
        self.elapsed += dt;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        #[cfg(feature = "debug-validation")]
        if let Err(err) = self.validate_invariants() {
            tracing::error!(tick = self.tick, %err, "Battle invariant broken");
            debug_assert!(false, "{err}");
        }

        events
    }

    /// Replan routes for moving and chasing units whose refresh timer ran out.
    fn refresh_paths(&mut self, dt: f32) {
        for id in self.ctx.units.ids() {
            match self.ctx.units.get(id).map(|u| u.state) {
                Some(UnitState::Moving) => self.refresh_move_path(id, dt),
                Some(UnitState::Attacking) => self.refresh_chase_path(id, dt),
                _ => {}
            }
        }
    }

    fn refresh_move_path(&mut self, id: UnitId, dt: f32) {
        let pathing = self.ctx.config.pathing;
        let Some(unit) = self.ctx.units.get(id) else {
            return;
        };
        let (from, target, pursuit) = (unit.position, unit.target_position, unit.pursuit);
        let chase = pursuit.map(|p| {
            self.ctx
                .units
                .get(p)
                .filter(|t| t.is_alive())
                .map(|t| t.position)
        });

        let Some(unit) = self.ctx.units.get_mut(id) else {
            return;
        };
        unit.path_timer -= dt;
        if unit.path_timer > 0.0 {
            return;
        }

        let goal = match (chase, target) {
            (Some(Some(quarry)), _) => {
                unit.target_position = Some(quarry);
                quarry
            }
            (Some(None), _) => {
                debug!(unit = %id, "Pursuit target lost");
                unit.hold();
                return;
            }
            (None, Some(target)) => target,
            (None, None) => {
                unit.hold();
                return;
            }
        };

        unit.path_timer = if pursuit.is_some() {
            pathing.pursuit_refresh
        } else {
            pathing.move_refresh
        };

        match plan_route(&self.ctx.grid, from, goal, pathing.smooth) {
            Route::Waypoints(waypoints) => {
                unit.path = waypoints.into();
            }
            Route::Unreachable => {
                debug!(unit = %id, goal = ?goal, "No route, holding position");
                unit.hold();
            }
        }
    }

    /// Keep a route to the target of a fighter that has to close distance.
    ///
    /// Guards never chase. A fighter whose target cannot be walked to drops it
    /// and holds where it stands.
    fn refresh_chase_path(&mut self, id: UnitId, dt: f32) {
        let pathing = self.ctx.config.pathing;
        let engage_slack = self.ctx.config.units.engage_slack;
        let Some(unit) = self.ctx.units.get(id) else {
            return;
        };
        if unit.is_guarding {
            return;
        }
        let (from, reach) = (unit.position, unit.attack_range + engage_slack);
        let quarry = unit
            .target_unit
            .and_then(|t| self.ctx.units.get(t))
            .filter(|t| t.is_alive())
            .map(|t| t.position);

        let Some(unit) = self.ctx.units.get_mut(id) else {
            return;
        };
        let Some(quarry) = quarry else {
            return;
        };
        if from.distance(quarry) <= reach {
            unit.path.clear();
            unit.path_timer = 0.0;
            return;
        }

        unit.path_timer -= dt;
        if unit.path_timer > 0.0 {
            return;
        }
        unit.path_timer = pathing.pursuit_refresh;

        match plan_route(&self.ctx.grid, from, quarry, pathing.smooth) {
            Route::Waypoints(waypoints) => {
                unit.path = waypoints.into();
            }
            Route::Unreachable => {
                debug!(unit = %id, quarry = ?quarry, "Target out of walking reach");
                unit.hold();
            }
        }
    }

    /// Run every unit's state machine.
    fn step_units(&mut self, dt: f32, events: &mut TickEvents) {
        for id in self.ctx.units.ids() {
            let Some(mut unit) = self.ctx.units.take(id) else {
                continue;
            };
            unit.step(id, &mut self.ctx, dt, events);
            if let Err(err) = self.ctx.units.restore(id, unit) {
                warn!(unit = %id, %err, "Failed to return unit after its step");
            }
        }

        for hit in events.hits.iter().filter(|h| h.killed) {
            self.kills[hit.attacker_team.index()] += 1;
        }
    }

    /// Push apart live units standing closer than the separation radius.
    ///
    /// Pushes are summed over all pairs before any unit moves, so the result
    /// does not depend on which unit of a pair is visited first.
    fn separate(&mut self, dt: f32) {
        let tuning = self.ctx.config.units;
        let step = tuning.separation_strength * dt;
        if step <= 0.0 {
            return;
        }

        let live: Vec<(UnitId, Vec2)> = self
            .ctx
            .units
            .iter()
            .filter(|(_, u)| u.is_alive())
            .map(|(id, u)| (id, u.position))
            .collect();
        let mut pushes = vec![Vec2::ZERO; live.len()];

        for (i, &(_, a)) in live.iter().enumerate() {
            for (j, &(_, b)) in live.iter().enumerate().skip(i + 1) {
                let delta = a - b;
                let d = delta.length();
                if d >= tuning.separation_radius {
                    continue;
                }
                // Stacked units split along x
                let dir = if d > COINCIDENT { delta / d } else { Vec2::X };
                pushes[i] += dir * step;
                pushes[j] -= dir * step;
            }
        }

        for ((id, pos), push) in live.into_iter().zip(pushes) {
            if push == Vec2::ZERO {
                continue;
            }
            let moved = self.ctx.clamp_to_field(pos + push);
            if let Some(unit) = self.ctx.units.get_mut(id) {
                unit.position = moved;
            }
        }
    }

    /// Decide the battle if either end condition holds.
    ///
    /// Defeat is checked first. With capture points the attackers win by
    /// holding every point while the defenders are nearly spent; without
    /// them only annihilation counts.
    fn check_outcome(&self) -> Option<BattleOutcome> {
        let attackers = self.ctx.live_count(Team::Attacker);
        let defenders = self.ctx.live_count(Team::Defender);

        if attackers == 0 {
            return Some(BattleOutcome::Defeat);
        }
        if self.ctx.capture_points.is_empty() {
            (defenders == 0).then_some(BattleOutcome::Victory)
        } else {
            (all_held_by_attackers(&self.ctx.capture_points)
                && defenders < self.ctx.config.capture.victory_threshold)
                .then_some(BattleOutcome::Victory)
        }
    }

    /// Aggregate status for HUDs and reports.
    #[must_use]
    pub fn status(&self) -> BattleStatus {
        BattleStatus {
            tick: self.tick,
            elapsed: self.elapsed,
            phase: self.phase,
            alive: Team::ALL.map(|team| self.ctx.live_count(team)),
            deployed: self.deployed,
            kills: self.kills,
            points_held: self
                .ctx
                .capture_points
                .iter()
                .filter(|p| p.owner == Some(Team::Attacker))
                .count(),
            points_total: self.ctx.capture_points.len(),
        }
    }

    /// Snapshot of every unit, dead ones included, in handle order.
    #[must_use]
    pub fn unit_snapshots(&self) -> Vec<UnitSnapshot> {
        self.ctx
            .units
            .iter()
            .map(|(id, unit)| UnitSnapshot::of(id, unit))
            .collect()
    }

    /// Snapshot of every capture point.
    #[must_use]
    pub fn capture_snapshots(&self) -> Vec<CapturePointSnapshot> {
        self.ctx
            .capture_points
            .iter()
            .enumerate()
            .map(|(index, point)| CapturePointSnapshot::of(index, point))
            .collect()
    }

    /// Compute a hash of the battle state.
    ///
    /// Two runs with the same seed and orders hash identically on every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.phase.hash(&mut hasher);

        let ids = self.ctx.units.ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(unit) = self.ctx.units.get(id) {
                id.hash(&mut hasher);
                unit.team.hash(&mut hasher);
                unit.state.hash(&mut hasher);
                unit.position.x.to_bits().hash(&mut hasher);
                unit.position.y.to_bits().hash(&mut hasher);
                unit.facing.to_bits().hash(&mut hasher);
                unit.hp.to_bits().hash(&mut hasher);
                unit.target_unit.hash(&mut hasher);
            }
        }

        for point in &self.ctx.capture_points {
            point.owner.hash(&mut hasher);
            point.progress.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Check the invariants every tick must preserve.
    ///
    /// - hit points stay within `[0, max_hp]`
    /// - a unit has zero hit points exactly when it is dead
    /// - positions are finite and inside the playable field
    /// - capture progress stays within `[0, 100]`
    pub fn validate_invariants(&self) -> Result<()> {
        let limit = self.ctx.config.half_extent() - self.ctx.config.units.edge_margin;

        for (id, unit) in self.ctx.units.iter() {
            if !(0.0..=unit.max_hp).contains(&unit.hp) {
                return Err(BattleError::InvariantViolation(format!(
                    "{id} has hp {} outside [0, {}]",
                    unit.hp, unit.max_hp
                )));
            }
            if (unit.hp == 0.0) != (unit.state == UnitState::Dead) {
                return Err(BattleError::InvariantViolation(format!(
                    "{id} has hp {} in state {:?}",
                    unit.hp, unit.state
                )));
            }
            let p = unit.position;
            if !p.is_finite() || p.x.abs() > limit + 1e-3 || p.y.abs() > limit + 1e-3 {
                return Err(BattleError::InvariantViolation(format!(
                    "{id} is off the field at {p}"
                )));
            }
        }

        for (index, point) in self.ctx.capture_points.iter().enumerate() {
            if !(0.0..=crate::capture::FULL_PROGRESS).contains(&point.progress) {
                return Err(BattleError::InvariantViolation(format!(
                    "capture point {index} has progress {}",
                    point.progress
                )));
            }
        }
        Ok(())
    }
}

//! Battle configuration.
//!
//! Every tuning value the simulation reads lives here. Defaults suit a
//! 120 m field with a few dozen units per side; scenario files override any
//! subset of fields from RON (missing fields fall back to the defaults).

use serde::{Deserialize, Serialize};

use crate::archetype::Team;
use crate::error::{BattleError, Result};

/// Top-level battle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Seed for the battle RNG. Same seed and inputs give the same battle.
    pub seed: u64,
    /// Side length of the square battlefield in world units, centred on the origin.
    pub map_size: f32,
    /// Side length of one grid cell in world units.
    pub cell_size: f32,
    /// Upper bound on the simulated time step in seconds.
    pub max_tick_dt: f32,
    /// Difficulty multiplier applied to AI unit speed and detection radius.
    pub difficulty: f32,
    /// Teams driven by the AI controller.
    pub ai_teams: Vec<Team>,
    /// Per-unit behaviour tuning.
    pub units: UnitTuning,
    /// Path refresh tuning.
    pub pathing: PathTuning,
    /// AI controller tuning.
    pub ai: AiTuning,
    /// Capture point tuning.
    pub capture: CaptureTuning,
    /// Formation spacing tuning.
    pub formation: FormationTuning,
    /// Deployment territory line.
    pub territory: TerritoryTuning,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            map_size: 120.0,
            cell_size: 1.0,
            max_tick_dt: 1.0 / 20.0,
            difficulty: 1.0,
            ai_teams: vec![Team::Defender],
            units: UnitTuning::default(),
            pathing: PathTuning::default(),
            ai: AiTuning::default(),
            capture: CaptureTuning::default(),
            formation: FormationTuning::default(),
            territory: TerritoryTuning::default(),
        }
    }
}

impl BattleConfig {
    /// Parse a configuration from a RON document and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| BattleError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set which teams the AI drives.
    #[must_use]
    pub fn with_ai_teams(mut self, teams: &[Team]) -> Self {
        self.ai_teams = teams.to_vec();
        self
    }

    /// Whether units of `team` are driven by the AI controller.
    #[must_use]
    pub fn is_ai(&self, team: Team) -> bool {
        self.ai_teams.contains(&team)
    }

    /// Half the map size; positions live in `[-half, half]` on both axes.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.map_size / 2.0
    }

    /// Reject values that would make the simulation meaningless.
    pub fn validate(&self) -> Result<()> {
        positive("map_size", self.map_size)?;
        positive("cell_size", self.cell_size)?;
        positive("max_tick_dt", self.max_tick_dt)?;
        positive("difficulty", self.difficulty)?;
        if self.map_size < self.cell_size {
            return Err(invalid("map_size", "smaller than one cell"));
        }
        if self.map_size <= 2.0 * self.units.edge_margin {
            return Err(invalid("units.edge_margin", "leaves no room inside the map"));
        }

        positive("units.separation_radius", self.units.separation_radius)?;
        positive("units.arrival_epsilon", self.units.arrival_epsilon)?;
        positive("units.damage_factor_min", self.units.damage_factor_min)?;
        if self.units.damage_factor_max < self.units.damage_factor_min {
            return Err(invalid("units.damage_factor_max", "below damage_factor_min"));
        }

        positive("pathing.pursuit_refresh", self.pathing.pursuit_refresh)?;
        positive("pathing.move_refresh", self.pathing.move_refresh)?;

        positive("ai.detection_radius", self.ai.detection_radius)?;
        if !(0.0..=1.0).contains(&self.ai.ambush_chance) {
            return Err(invalid("ai.ambush_chance", "must lie in [0, 1]"));
        }

        positive("capture.radius", self.capture.radius)?;
        non_negative("capture.attack_rate", self.capture.attack_rate)?;
        non_negative("capture.defend_rate", self.capture.defend_rate)?;

        positive("formation.spacing", self.formation.spacing)?;
        positive("formation.deploy_spacing", self.formation.deploy_spacing)?;
        if self.formation.max_drag_spacing < self.formation.min_drag_spacing {
            return Err(invalid("formation.max_drag_spacing", "below min_drag_spacing"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: &str) -> BattleError {
    BattleError::InvalidConfig {
        field,
        message: message.to_string(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, &format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, &format!("must not be negative, got {value}")))
    }
}

/// Per-unit behaviour tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitTuning {
    /// Extra reach beyond `attack_range` within which a unit counts as in range.
    pub engage_slack: f32,
    /// Extra radius beyond `attack_range` scanned by idle units.
    pub idle_scan_slack: f32,
    /// Extra radius beyond `attack_range` scanned by idle guarding units.
    pub guard_scan_slack: f32,
    /// Distance beyond `attack_range` at which a guarding unit lets its target go.
    pub guard_slack: f32,
    /// Distance below which a moving unit counts as arrived.
    pub arrival_epsilon: f32,
    /// Fraction of remaining turn covered per second while moving.
    pub move_turn_rate: f32,
    /// Fraction of remaining turn covered per second while attacking.
    pub attack_turn_rate: f32,
    /// Personal-space radius for the separation pass.
    pub separation_radius: f32,
    /// Separation push speed in world units per second.
    pub separation_strength: f32,
    /// Upper bound of the random initial attack-timer phase.
    pub initial_attack_jitter: f32,
    /// Seconds a corpse stays visible before the renderer may drop it.
    pub death_decay: f32,
    /// Lower bound of the damage random factor.
    pub damage_factor_min: f32,
    /// Upper bound of the damage random factor.
    pub damage_factor_max: f32,
    /// Distance kept between units and the map edge.
    pub edge_margin: f32,
}

impl Default for UnitTuning {
    fn default() -> Self {
        Self {
            engage_slack: 0.5,
            idle_scan_slack: 2.0,
            guard_scan_slack: 3.0,
            guard_slack: 4.0,
            arrival_epsilon: 0.3,
            move_turn_rate: 5.0,
            attack_turn_rate: 8.0,
            separation_radius: 0.8,
            separation_strength: 0.5,
            initial_attack_jitter: 0.5,
            death_decay: 4.0,
            damage_factor_min: 0.8,
            damage_factor_max: 1.2,
            edge_margin: 1.0,
        }
    }
}

/// Path refresh tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTuning {
    /// Seconds between path refreshes while chasing a unit.
    pub pursuit_refresh: f32,
    /// Seconds between path refreshes for plain move orders.
    pub move_refresh: f32,
    /// Drop waypoints that have a clear line of sight past them.
    pub smooth: bool,
}

impl Default for PathTuning {
    fn default() -> Self {
        Self {
            pursuit_refresh: 0.5,
            move_refresh: 2.0,
            smooth: true,
        }
    }
}

/// AI controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Radius within which AI units notice enemies, before the difficulty multiplier.
    pub detection_radius: f32,
    /// Chance of entering ambush mode when the ambush timer is ready.
    pub ambush_chance: f32,
    /// Seconds between ambush opportunities.
    pub ambush_cooldown: f32,
    /// Seconds an ambush lasts before direct pursuit resumes.
    pub ambush_duration: f32,
    /// How far ahead of the target's facing the ambush point is predicted.
    pub ambush_lead: f32,
    /// Ambushes are only considered when the target is at least this far away.
    pub ambush_min_distance: f32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            detection_radius: 1000.0,
            ambush_chance: 0.25,
            ambush_cooldown: 6.0,
            ambush_duration: 4.0,
            ambush_lead: 8.0,
            ambush_min_distance: 12.0,
        }
    }
}

/// Capture point tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureTuning {
    /// Radius within which a unit counts toward a point's tally.
    pub radius: f32,
    /// Progress per second per unit of attacker advantage.
    pub attack_rate: f32,
    /// Progress lost per second while defenders dominate.
    pub defend_rate: f32,
    /// Attackers win a capture battle once defenders number fewer than this.
    pub victory_threshold: usize,
}

impl Default for CaptureTuning {
    fn default() -> Self {
        Self {
            radius: 5.0,
            attack_rate: 10.0,
            defend_rate: 8.0,
            victory_threshold: 5,
        }
    }
}

/// Formation spacing tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationTuning {
    /// Default distance between formation slots.
    pub spacing: f32,
    /// Slot distance used when deploying armies.
    pub deploy_spacing: f32,
    /// Random jitter applied to deployment slots.
    pub deploy_jitter: f32,
    /// Smallest spacing a drag order can produce.
    pub min_drag_spacing: f32,
    /// Largest spacing a drag order can produce.
    pub max_drag_spacing: f32,
}

impl Default for FormationTuning {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            deploy_spacing: 1.5,
            deploy_jitter: 0.15,
            min_drag_spacing: 0.8,
            max_drag_spacing: 2.5,
        }
    }
}

/// Deployment territory line.
///
/// Attackers deploy on the `z < line_z` side, defenders on the other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryTuning {
    /// World z of the territory boundary.
    pub line_z: f32,
    /// Distance orders are kept away from the line during deployment.
    pub margin: f32,
}

impl Default for TerritoryTuning {
    fn default() -> Self {
        Self {
            line_z: -5.0,
            margin: 1.0,
        }
    }
}

impl TerritoryTuning {
    /// Clamp a world z to `team`'s side of the line.
    #[must_use]
    pub fn clamp_z(&self, team: Team, z: f32) -> f32 {
        match team {
            Team::Attacker => z.min(self.line_z - self.margin),
            Team::Defender => z.max(self.line_z + self.margin),
        }
    }
}

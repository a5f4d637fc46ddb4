//! Scenario loading and configuration.
//!
//! Scenarios define the starting state of a headless battle: tuning, terrain,
//! capture points and the squads each side deploys. They are written in RON;
//! any config field left out falls back to its default.

use std::path::Path;

use battle_core::prelude::{
    BattleConfig, BattleError, Obstacle, Simulation, SquadSpec, Team, Vec2,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario describes a battle the simulation rejects.
    #[error("Invalid scenario: {0}")]
    Battle(#[from] BattleError),
}

/// A squad as written in a scenario file.
///
/// Team and archetype are tags (`"attacker"`, `"archers"`, ...) so files can
/// use the legacy troop names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadSetup {
    /// Team tag.
    pub team: String,
    /// Archetype tag.
    pub archetype: String,
    /// Number of units.
    pub count: usize,
    /// Deployment anchor on the ground plane.
    pub anchor: Vec2,
    /// Squad id used for selection cycling.
    pub squad_id: u32,
}

impl SquadSetup {
    /// Create a squad setup.
    #[must_use]
    pub fn new(team: &str, archetype: &str, count: usize, anchor: Vec2, squad_id: u32) -> Self {
        Self {
            team: team.to_string(),
            archetype: archetype.to_string(),
            count,
            anchor,
            squad_id,
        }
    }

    /// Resolve the tags into a deployable squad.
    pub fn to_spec(&self) -> Result<SquadSpec, ScenarioError> {
        Ok(SquadSpec::new(
            self.team.parse()?,
            self.archetype.parse()?,
            self.count,
            self.anchor,
            self.squad_id,
        ))
    }
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Battle tuning; the seed is overridden per run.
    #[serde(default)]
    pub config: BattleConfig,
    /// Static terrain.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Capture point positions. Empty means an elimination battle.
    #[serde(default)]
    pub capture_points: Vec<Vec2>,
    /// Deployed squads.
    pub squads: Vec<SquadSetup>,
    /// Tick limit for a run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

fn default_max_ticks() -> u64 {
    // Ten minutes at the default step
    12_000
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        debug!(path = %path.display(), name = %scenario.name, "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// A built-in scenario by name, or a RON file at that path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "skirmish" => Ok(Self::skirmish()),
            "siege" => Ok(Self::siege()),
            path => Self::load(path),
        }
    }

    /// Check the config and every squad tag without building a battle.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        for squad in &self.squads {
            squad.to_spec()?;
        }
        Ok(())
    }

    /// Build an active battle from this scenario with `seed`.
    pub fn build(&self, seed: u64) -> Result<Simulation, ScenarioError> {
        let config = self.config.clone().with_seed(seed);
        let mut sim = Simulation::with_obstacles(config, &self.obstacles)?;
        for &position in &self.capture_points {
            sim.add_capture_point(position);
        }
        for squad in &self.squads {
            sim.deploy_squad(&squad.to_spec()?);
        }
        sim.begin_battle();
        info!(
            scenario = %self.name,
            seed,
            units = sim.status().deployed.iter().sum::<usize>(),
            capture_points = self.capture_points.len(),
            "Scenario deployed"
        );
        Ok(sim)
    }

    /// Open-field elimination battle with every archetype on both sides.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "skirmish".to_string(),
            description: "Open field, mixed armies, fight to the last unit".to_string(),
            config: BattleConfig::default().with_ai_teams(&Team::ALL),
            obstacles: Vec::new(),
            capture_points: Vec::new(),
            squads: vec![
                SquadSetup::new("attacker", "swordsmen", 12, Vec2::new(-8.0, -24.0), 0),
                SquadSetup::new("attacker", "archers", 8, Vec2::new(0.0, -30.0), 1),
                SquadSetup::new("attacker", "cavalry", 4, Vec2::new(12.0, -24.0), 2),
                SquadSetup::new("defender", "swordsmen", 12, Vec2::new(-8.0, 20.0), 10),
                SquadSetup::new("defender", "archers", 8, Vec2::new(0.0, 26.0), 11),
                SquadSetup::new("defender", "cavalry", 4, Vec2::new(12.0, 20.0), 12),
            ],
            max_ticks: default_max_ticks(),
        }
    }

    /// Attackers storm two capture points behind a broken wall.
    #[must_use]
    pub fn siege() -> Self {
        let wall = (-12..=12)
            .filter(|x| !(-2..=2).contains(x))
            .map(|x| Obstacle {
                center: Vec2::new(x as f32 * 2.0, 6.0),
                radius: 1.2,
            })
            .collect();
        Self {
            name: "siege".to_string(),
            description: "Two capture points held behind a wall with a single breach".to_string(),
            config: BattleConfig::default().with_ai_teams(&Team::ALL),
            obstacles: wall,
            capture_points: vec![Vec2::new(-10.0, 18.0), Vec2::new(10.0, 18.0)],
            squads: vec![
                SquadSetup::new("attacker", "melee", 16, Vec2::new(-6.0, -26.0), 0),
                SquadSetup::new("attacker", "ranged", 10, Vec2::new(6.0, -30.0), 1),
                SquadSetup::new("attacker", "mounted", 6, Vec2::new(0.0, -20.0), 2),
                SquadSetup::new("defender", "melee", 8, Vec2::new(-10.0, 16.0), 10),
                SquadSetup::new("defender", "ranged", 6, Vec2::new(10.0, 16.0), 11),
            ],
            max_ticks: default_max_ticks(),
        }
    }
}

//! Read-only views handed to renderers, HUDs and reports.

use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, Team};
use crate::arena::UnitId;
use crate::capture::CapturePoint;
use crate::math::Vec2;
use crate::unit::{Unit, UnitState};

/// Per-unit view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Handle of the unit.
    pub id: UnitId,
    /// Side.
    pub team: Team,
    /// Archetype.
    pub archetype: Archetype,
    /// Squad.
    pub squad_id: u32,
    /// Ground position.
    pub position: Vec2,
    /// Facing angle.
    pub facing: f32,
    /// Behavioural state.
    pub state: UnitState,
    /// Current hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Selected by the player.
    pub is_selected: bool,
    /// In guard mode.
    pub is_guarding: bool,
    /// Seconds the unit has been dead; zero while alive.
    pub death_timer: f32,
}

impl UnitSnapshot {
    /// Capture the view of one unit.
    #[must_use]
    pub fn of(id: UnitId, unit: &Unit) -> Self {
        Self {
            id,
            team: unit.team,
            archetype: unit.archetype,
            squad_id: unit.squad_id,
            position: unit.position,
            facing: unit.facing,
            state: unit.state,
            hp: unit.hp,
            max_hp: unit.max_hp,
            is_selected: unit.is_selected,
            is_guarding: unit.is_guarding,
            death_timer: unit.death_timer,
        }
    }
}

/// Capture point view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapturePointSnapshot {
    /// Index in the battle's point list.
    pub index: usize,
    /// Centre of the zone.
    pub position: Vec2,
    /// Owner, `None` when neutral.
    pub owner: Option<Team>,
    /// Attacker progress in `[0, 100]`.
    pub progress: f32,
}

impl CapturePointSnapshot {
    /// Capture the view of one point.
    #[must_use]
    pub fn of(index: usize, point: &CapturePoint) -> Self {
        Self {
            index,
            position: point.position,
            owner: point.owner,
            progress: point.progress,
        }
    }
}

/// How a battle ended, from the attacking side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// The attackers took the field.
    Victory,
    /// The attackers were wiped out.
    Defeat,
}

/// Battle lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Armies are being positioned. Units still walk and fight enemies that
    /// come within reach; the AI, capture points and end-of-battle checks wait
    /// for the start, and player moves stay on their own side of the
    /// territory line.
    #[default]
    Deployment,
    /// The battle is running.
    Active,
    /// The battle has been decided.
    Finished(BattleOutcome),
}

/// Aggregate battle status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleStatus {
    /// Ticks simulated so far.
    pub tick: u64,
    /// Simulated seconds so far.
    pub elapsed: f32,
    /// Lifecycle phase.
    pub phase: BattlePhase,
    /// Live units per team, indexed by [`Team::index`].
    pub alive: [usize; 2],
    /// All units ever deployed per team.
    pub deployed: [usize; 2],
    /// Kills credited per team.
    pub kills: [u32; 2],
    /// Capture points currently owned by the attackers.
    pub points_held: usize,
    /// Total capture points.
    pub points_total: usize,
}

impl BattleStatus {
    /// Live units of `team`.
    #[must_use]
    pub const fn alive(&self, team: Team) -> usize {
        self.alive[team.index()]
    }

    /// The outcome, once the battle is over.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Summary of the current selection for the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionSummary {
    /// Selected units.
    pub count: usize,
    /// Selected units per archetype, indexed by `Archetype as usize`.
    pub by_archetype: [usize; 3],
    /// Sum of current hit points.
    pub hp: f32,
    /// Sum of maximum hit points.
    pub max_hp: f32,
}

impl SelectionSummary {
    /// Build a summary from the selected units.
    pub fn from_units<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        let mut summary = Self::default();
        for unit in units {
            summary.count += 1;
            summary.by_archetype[unit.archetype as usize] += 1;
            summary.hp += unit.hp;
            summary.max_hp += unit.max_hp;
        }
        summary
    }

    /// Selected units of one archetype.
    #[must_use]
    pub const fn of(&self, archetype: Archetype) -> usize {
        self.by_archetype[archetype as usize]
    }
}

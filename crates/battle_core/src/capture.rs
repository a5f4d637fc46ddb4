//! Capture points.
//!
//! A capture point counts the live units of each team inside its radius every
//! tick. Attacker dominance pushes progress up toward 100 at a rate that
//! scales with the head-count difference; defender dominance pulls it down
//! toward 0 at a flat rate. Ownership only changes when progress reaches one
//! of the ends, so a point never drops back to neutral partway through.

use serde::{Deserialize, Serialize};

use crate::archetype::Team;
use crate::config::CaptureTuning;
use crate::math::Vec2;
use crate::unit::UnitArena;

/// Progress at which attackers take the point.
pub const FULL_PROGRESS: f32 = 100.0;

/// A contested zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePoint {
    /// Centre of the zone.
    pub position: Vec2,
    /// Current owner; `None` is neutral.
    pub owner: Option<Team>,
    /// Attacker capture progress in `[0, 100]`.
    pub progress: f32,
}

impl CapturePoint {
    /// A point held by the defenders with no attacker progress.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            owner: Some(Team::Defender),
            progress: 0.0,
        }
    }

    /// A point that starts with an explicit owner and progress.
    #[must_use]
    pub fn with_owner(position: Vec2, owner: Option<Team>, progress: f32) -> Self {
        Self {
            position,
            owner,
            progress: progress.clamp(0.0, FULL_PROGRESS),
        }
    }

    /// Live units per team inside `radius`, indexed by [`Team::index`].
    #[must_use]
    pub fn count_nearby(&self, units: &UnitArena, radius: f32) -> [usize; 2] {
        let mut counts = [0; 2];
        for (_, unit) in units.iter() {
            if unit.is_alive() && unit.position.distance(self.position) < radius {
                counts[unit.team.index()] += 1;
            }
        }
        counts
    }

    /// Advance progress for one tick given the head-count in the zone.
    ///
    /// Returns the new owner if ownership flipped this tick.
    pub fn tally(&mut self, counts: [usize; 2], tuning: &CaptureTuning, dt: f32) -> Option<Team> {
        let attackers = counts[Team::Attacker.index()];
        let defenders = counts[Team::Defender.index()];
        let before = self.owner;

        if attackers > defenders {
            let advantage = (attackers - defenders) as f32;
            self.progress = (self.progress + dt * tuning.attack_rate * advantage).min(FULL_PROGRESS);
            if self.progress >= FULL_PROGRESS {
                self.owner = Some(Team::Attacker);
            }
        } else if defenders > attackers {
            self.progress = (self.progress - dt * tuning.defend_rate).max(0.0);
            if self.progress <= 0.0 {
                self.owner = Some(Team::Defender);
            }
        }

        (self.owner != before).then_some(self.owner).flatten()
    }
}

/// Ownership change reported by the capture pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Index of the point in the battle's capture point list.
    pub point: usize,
    /// New owner.
    pub owner: Team,
}

/// Run the capture tally over every point.
pub fn update_capture_points(
    points: &mut [CapturePoint],
    units: &UnitArena,
    tuning: &CaptureTuning,
    dt: f32,
) -> Vec<CaptureEvent> {
    let mut flips = Vec::new();
    for (index, point) in points.iter_mut().enumerate() {
        let counts = point.count_nearby(units, tuning.radius);
        if let Some(owner) = point.tally(counts, tuning, dt) {
            flips.push(CaptureEvent {
                point: index,
                owner,
            });
        }
    }
    flips
}

/// Whether every point belongs to the attackers. False when there are no points.
#[must_use]
pub fn all_held_by_attackers(points: &[CapturePoint]) -> bool {
    !points.is_empty() && points.iter().all(|p| p.owner == Some(Team::Attacker))
}

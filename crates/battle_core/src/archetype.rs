//! Teams and unit archetypes.
//!
//! Archetypes form a closed set. Each maps to a static stats row in
//! [`ARCHETYPE_TABLE`]; string tags from scenario files are parsed into the
//! enum up front so an unknown tag is rejected before any unit exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BattleError;

/// The two sides of a battle.
///
/// The attacker is the player's side in campaign battles; capture points
/// start out owned by the defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// The side trying to take the field.
    Attacker,
    /// The side holding the field.
    Defender,
}

impl Team {
    /// Both teams, in a stable order.
    pub const ALL: [Self; 2] = [Self::Attacker, Self::Defender];

    /// The opposing team.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    /// Default facing for freshly deployed units of this team.
    ///
    /// Attackers deploy on the low-z side facing `+z`; defenders face back.
    #[must_use]
    pub const fn deploy_facing(self) -> f32 {
        match self {
            Self::Attacker => 0.0,
            Self::Defender => std::f32::consts::PI,
        }
    }

    /// Stable index for per-team arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Attacker => 0,
            Self::Defender => 1,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attacker => f.write_str("attacker"),
            Self::Defender => f.write_str("defender"),
        }
    }
}

impl FromStr for Team {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attacker" | "blue" | "player" => Ok(Self::Attacker),
            "defender" | "red" | "enemy" => Ok(Self::Defender),
            _ => Err(BattleError::UnknownTeam(s.to_string())),
        }
    }
}

/// Combat archetype of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Archetype {
    /// Sword-and-shield infantry.
    Melee,
    /// Archers; long range, fragile, slow to reload.
    Ranged,
    /// Cavalry; fast and hard-hitting.
    Mounted,
}

impl Archetype {
    /// All archetypes in table order.
    pub const ALL: [Self; 3] = [Self::Melee, Self::Ranged, Self::Mounted];

    /// Static stats for this archetype.
    #[must_use]
    pub fn stats(self) -> &'static ArchetypeStats {
        &ARCHETYPE_TABLE[self as usize]
    }

    /// Canonical tag used in scenario files and reports.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Ranged => "ranged",
            Self::Mounted => "mounted",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Archetype {
    type Err = BattleError;

    /// Parses canonical tags as well as the legacy troop names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "melee" | "swordsmen" | "infantry" => Ok(Self::Melee),
            "ranged" | "archers" => Ok(Self::Ranged),
            "mounted" | "cavalry" => Ok(Self::Mounted),
            _ => Err(BattleError::UnknownArchetype(s.to_string())),
        }
    }
}

/// Base combat stats for an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    /// Maximum (and starting) hit points.
    pub max_hp: f32,
    /// Damage per hit before the random factor.
    pub attack_power: f32,
    /// Reach of an attack in world units.
    pub attack_range: f32,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
}

impl ArchetypeStats {
    /// Check the row describes a unit that can exist and fight.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.max_hp > 0.0
            && self.attack_power >= 0.0
            && self.attack_range > 0.0
            && self.move_speed > 0.0
            && self.attack_cooldown > 0.0
    }
}

/// Stats rows indexed by `Archetype as usize`.
pub static ARCHETYPE_TABLE: [ArchetypeStats; 3] = [
    // Melee
    ArchetypeStats {
        max_hp: 100.0,
        attack_power: 14.0,
        attack_range: 1.8,
        move_speed: 3.8,
        attack_cooldown: 0.9,
    },
    // Ranged
    ArchetypeStats {
        max_hp: 80.0,
        attack_power: 10.0,
        attack_range: 14.0,
        move_speed: 3.0,
        attack_cooldown: 1.6,
    },
    // Mounted
    ArchetypeStats {
        max_hp: 140.0,
        attack_power: 20.0,
        attack_range: 1.8,
        move_speed: 7.0,
        attack_cooldown: 0.9,
    },
];

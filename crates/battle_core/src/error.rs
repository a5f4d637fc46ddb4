//! Error types for the battle simulation.
//!
//! The tick itself never fails: degenerate situations (stale targets,
//! unreachable goals, empty selections) are absorbed in place. These errors
//! surface only at the API boundary, where a caller hands the core a handle,
//! a tag or a configuration that cannot be honoured.

use thiserror::Error;

use crate::arena::UnitId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle simulation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BattleError {
    /// No unit lives in the slot addressed by this handle.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The slot was reused after the unit this handle referred to was removed.
    #[error("Stale unit handle: {0}")]
    StaleHandle(UnitId),

    /// An archetype tag that does not name a known archetype.
    #[error("Unknown archetype tag: '{0}'")]
    UnknownArchetype(String),

    /// A team tag that does not name a known team.
    #[error("Unknown team tag: '{0}'")]
    UnknownTeam(String),

    /// Grid dimensions that cannot describe a battlefield.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// A configuration value outside its allowed range.
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// Failed to parse a configuration document.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    /// Attacker and defender belong to the same team.
    #[error("Friendly fire rejected: {attacker} attacked teammate {defender}")]
    FriendlyFire {
        /// The unit that attempted the attack.
        attacker: UnitId,
        /// The teammate it targeted.
        defender: UnitId,
    },

    /// Control groups are numbered 1 to 9.
    #[error("Invalid control group: {0}")]
    InvalidControlGroup(u8),

    /// An attack involving a unit that is already dead.
    #[error("Unit {0} is dead")]
    UnitDead(UnitId),

    /// The battle has already been decided.
    #[error("Battle is already over")]
    BattleFinished,

    /// A simulation invariant was broken.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

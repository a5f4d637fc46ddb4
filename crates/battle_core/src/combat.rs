//! Damage exchange between two units.
//!
//! Damage is the attacker's power scaled by a random factor drawn from the
//! battle RNG:
//! - factor range comes from [`UnitTuning`] (0.8 to 1.2 by default)
//! - hit points never drop below zero
//! - the hit that takes a unit to zero kills it
//!
//! Cooldowns live on the attacker and are managed by the unit state machine;
//! this module only resolves a single swing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archetype::Team;
use crate::arena::UnitId;
use crate::config::UnitTuning;
use crate::error::{BattleError, Result};
use crate::unit::Unit;

/// Outcome of one resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Unit that swung.
    pub attacker: UnitId,
    /// Team of the attacker, for kill credit.
    pub attacker_team: Team,
    /// Unit that was struck.
    pub defender: UnitId,
    /// Hit points removed.
    pub damage: f32,
    /// Whether this hit killed the defender.
    pub killed: bool,
}

/// Roll the damage multiplier for one hit.
pub fn roll_damage_factor(tuning: &UnitTuning, rng: &mut impl Rng) -> f32 {
    if tuning.damage_factor_max > tuning.damage_factor_min {
        rng.gen_range(tuning.damage_factor_min..=tuning.damage_factor_max)
    } else {
        tuning.damage_factor_min
    }
}

/// Resolve one attack of `attacker` against `defender`.
///
/// Same-team attacks are refused with [`BattleError::FriendlyFire`] and leave
/// both units untouched; so are attacks involving a dead unit. The caller is
/// expected to never ask for either, so both are logged.
pub fn resolve_attack(
    attacker_id: UnitId,
    attacker: &Unit,
    defender_id: UnitId,
    defender: &mut Unit,
    tuning: &UnitTuning,
    rng: &mut impl Rng,
) -> Result<Hit> {
    if attacker.team == defender.team {
        warn!(
            attacker = %attacker_id,
            defender = %defender_id,
            team = %attacker.team,
            "Friendly fire rejected"
        );
        return Err(BattleError::FriendlyFire {
            attacker: attacker_id,
            defender: defender_id,
        });
    }
    if !attacker.is_alive() {
        warn!(attacker = %attacker_id, "Dead unit tried to attack");
        return Err(BattleError::UnitDead(attacker_id));
    }
    if !defender.is_alive() {
        warn!(defender = %defender_id, "Attack on a dead unit");
        return Err(BattleError::UnitDead(defender_id));
    }

    let damage = attacker.attack_power * roll_damage_factor(tuning, rng);
    let before = defender.hp;
    let killed = defender.apply_damage(damage);
    if killed {
        debug!(attacker = %attacker_id, defender = %defender_id, "Unit killed");
    }

    Ok(Hit {
        attacker: attacker_id,
        attacker_team: attacker.team,
        defender: defender_id,
        damage: before - defender.hp,
        killed,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::archetype::Archetype;
    use crate::arena::Arena;
    use crate::math::Vec2;
    use crate::unit::UnitState;

    fn pair() -> (UnitId, Unit, UnitId, Unit) {
        let mut ids = Arena::new();
        let a = ids.insert(());
        let d = ids.insert(());
        (
            a,
            Unit::new(Team::Attacker, Archetype::Melee, Vec2::ZERO, 0),
            d,
            Unit::new(Team::Defender, Archetype::Mounted, Vec2::new(1.0, 0.0), 0),
        )
    }

    #[test]
    fn test_damage_within_factor_bounds() {
        let tuning = UnitTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (a, attacker, d, mut defender) = pair();

        let hit = resolve_attack(a, &attacker, d, &mut defender, &tuning, &mut rng).unwrap();
        assert!(hit.damage >= 14.0 * 0.8 - 1e-3 && hit.damage <= 14.0 * 1.2 + 1e-3);
        assert!((defender.hp - (140.0 - hit.damage)).abs() < 1e-4);
        assert!(!hit.killed);
        assert_eq!(hit.attacker_team, Team::Attacker);
    }

    #[test]
    fn test_conservation_over_many_hits() {
        let tuning = UnitTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (a, attacker, d, mut defender) = pair();
        defender.max_hp = 10_000.0;
        defender.hp = 10_000.0;

        let hits = 50;
        for _ in 0..hits {
            resolve_attack(a, &attacker, d, &mut defender, &tuning, &mut rng).unwrap();
        }
        let lost = 10_000.0 - defender.hp;
        let n = hits as f32;
        assert!(lost >= 0.8 * n * 14.0 - 1e-2, "lost {lost}");
        assert!(lost <= 1.2 * n * 14.0 + 1e-2, "lost {lost}");
    }

    #[test]
    fn test_lethal_hit_clamps_to_zero() {
        let tuning = UnitTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let (a, attacker, d, mut defender) = pair();
        defender.hp = 2.0;

        let hit = resolve_attack(a, &attacker, d, &mut defender, &tuning, &mut rng).unwrap();
        assert!(hit.killed);
        assert_eq!(hit.damage, 2.0);
        assert_eq!(defender.hp, 0.0);
        assert_eq!(defender.state, UnitState::Dead);
    }

    #[test]
    fn test_friendly_fire_rejected() {
        let tuning = UnitTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (a, attacker, d, mut defender) = pair();
        defender.team = Team::Attacker;

        let err = resolve_attack(a, &attacker, d, &mut defender, &tuning, &mut rng).unwrap_err();
        assert_eq!(
            err,
            BattleError::FriendlyFire {
                attacker: a,
                defender: d
            }
        );
        assert_eq!(defender.hp, defender.max_hp);
    }

    #[test]
    fn test_dead_units_cannot_trade_blows() {
        let tuning = UnitTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (a, mut attacker, d, mut defender) = pair();

        defender.kill();
        let err = resolve_attack(a, &attacker, d, &mut defender, &tuning, &mut rng).unwrap_err();
        assert_eq!(err, BattleError::UnitDead(d));
        assert_eq!(defender.hp, 0.0);

        let (_, _, _, mut fresh) = pair();
        attacker.kill();
        let err = resolve_attack(a, &attacker, d, &mut fresh, &tuning, &mut rng).unwrap_err();
        assert_eq!(err, BattleError::UnitDead(a));
    }

    #[test]
    fn test_fixed_factor_when_range_collapses() {
        let tuning = UnitTuning {
            damage_factor_min: 1.0,
            damage_factor_max: 1.0,
            ..UnitTuning::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(roll_damage_factor(&tuning, &mut rng), 1.0);
    }
}

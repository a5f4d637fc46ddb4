//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle simulation produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A battle is replayable from its seed and order log only if nothing
//! outside those inputs leaks into the state. Sources of non-determinism
//! include:
//!
//! - **Unseeded randomness**: every draw must go through the battle's
//!   seeded RNG, never `thread_rng`.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always visited in arena slot order.
//!
//! - **Wall-clock time**: the loop only sees the `dt` it is handed.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual passes (movement, combat, capture)
//! 2. **Property tests**: random inputs must still produce deterministic outputs
//! 3. **Integration tests**: full battles are reproducible
//! 4. **Parallel tests**: N battles on N threads all match

use std::thread;

use battle_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one tick
/// * `hash` - Computes the state hash
///
/// # Example
///
/// ```
/// use battle_test_utils::determinism::verify_determinism;
/// use battle_test_utils::fixtures::mixed_skirmish;
///
/// let result = verify_determinism(
///     3,
///     50,
///     || mixed_skirmish(7),
///     |sim| {
///         sim.tick();
///     },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice from the same setup and compare final state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N battles on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two runs tick by tick and report the first tick where they differ.
///
/// Returns `None` if the runs agree for all `num_ticks` ticks. Tick `0` means
/// the setups already differ.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for battle inputs.
pub mod strategies {
    use battle_core::prelude::{Archetype, FormationKind, PlayerIntent, SquadSpec, Team, Vec2};
    use proptest::prelude::*;

    /// Any team.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::Attacker), Just(Team::Defender)]
    }

    /// Any archetype.
    pub fn arb_archetype() -> impl Strategy<Value = Archetype> {
        prop_oneof![
            Just(Archetype::Melee),
            Just(Archetype::Ranged),
            Just(Archetype::Mounted),
        ]
    }

    /// Any formation kind.
    pub fn arb_formation() -> impl Strategy<Value = FormationKind> {
        prop_oneof![
            Just(FormationKind::Line),
            Just(FormationKind::Wedge),
            Just(FormationKind::Square),
            Just(FormationKind::Circle),
        ]
    }

    /// A position inside a map of side `map_size` centred on the origin,
    /// keeping `margin` from the edge.
    pub fn arb_position(map_size: f32, margin: f32) -> impl Strategy<Value = Vec2> {
        let limit = map_size / 2.0 - margin;
        (-limit..limit, -limit..limit).prop_map(|(x, z)| Vec2::new(x, z))
    }

    /// Any facing angle.
    pub fn arb_facing() -> impl Strategy<Value = f32> {
        -std::f32::consts::PI..std::f32::consts::PI
    }

    /// A squad of 1 to `max_count` units somewhere on a 120-unit map.
    pub fn arb_squad(max_count: usize) -> impl Strategy<Value = SquadSpec> {
        (
            arb_team(),
            arb_archetype(),
            1..=max_count,
            arb_position(100.0, 5.0),
            0u32..8,
        )
            .prop_map(|(team, archetype, count, anchor, squad_id)| {
                SquadSpec::new(team, archetype, count, anchor, squad_id)
            })
    }

    /// Blocked cells on a `size` by `size` grid, as `(x, y)` pairs.
    pub fn arb_blocked_cells(size: u32, max: usize) -> impl Strategy<Value = Vec<(u32, u32)>> {
        proptest::collection::vec((0..size, 0..size), 0..max)
    }

    /// A player intent that needs no unit handles.
    pub fn arb_order_intent() -> impl Strategy<Value = PlayerIntent> {
        prop_oneof![
            (arb_position(100.0, 5.0), any::<bool>())
                .prop_map(|(target, keep_guard)| PlayerIntent::Move { target, keep_guard }),
            (arb_position(100.0, 5.0), arb_position(100.0, 5.0)).prop_map(|(start, end)| {
                PlayerIntent::DragMove {
                    start,
                    end,
                    keep_guard: false,
                }
            }),
            Just(PlayerIntent::Hold),
            Just(PlayerIntent::ToggleGuard),
            Just(PlayerIntent::SelectAll),
            Just(PlayerIntent::CycleSquad),
            Just(PlayerIntent::CycleFormation),
            Just(PlayerIntent::ClearSelection),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{melee_lines, mixed_skirmish, player_config};
    use battle_core::prelude::{BattleConfig, CommandDispatcher, Team};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_battle_determinism() {
        assert!(verify_simulation_determinism(
            || Simulation::new(BattleConfig::default()).unwrap(),
            100
        ));
    }

    #[test]
    fn test_skirmish_determinism() {
        let result = verify_determinism(
            4,
            300,
            || mixed_skirmish(99),
            |sim| {
                sim.tick();
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_no_divergence_in_melee() {
        let divergence = find_first_divergence(|| melee_lines(5, 2.0, player_config()), 400);
        assert!(divergence.is_none(), "diverged at tick {divergence:?}");
    }

    #[test]
    fn test_divergence_detected_for_different_seeds() {
        use std::cell::Cell;
        let calls = Cell::new(0u64);
        let divergence = find_first_divergence(
            || {
                calls.set(calls.get() + 1);
                mixed_skirmish(calls.get())
            },
            10,
        );
        // Different seeds jitter the deployment differently
        assert_eq!(divergence, Some(0));
    }

    #[test]
    fn test_parallel_runs_match() {
        run_parallel_simulations(|| mixed_skirmish(5), 4, 200).assert_deterministic();
    }

    #[test]
    fn test_seed_changes_outcome_hash() {
        let final_hash = |seed| {
            let mut sim = mixed_skirmish(seed);
            for _ in 0..100 {
                sim.tick();
            }
            sim.state_hash()
        };
        assert_ne!(final_hash(1), final_hash(2));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_random_orders_stay_deterministic(
            squads in proptest::collection::vec(arb_squad(6), 1..5),
            intents in proptest::collection::vec(arb_order_intent(), 0..12),
        ) {
            let setup = || {
                let mut sim = Simulation::new(BattleConfig::default().with_seed(3)).unwrap();
                for squad in &squads {
                    sim.deploy_squad(squad);
                }
                sim.begin_battle();
                sim
            };

            let run = || {
                let mut sim = setup();
                let mut cmd = CommandDispatcher::new(Team::Attacker);
                for intent in &intents {
                    cmd.dispatch(&mut sim, *intent).unwrap();
                    for _ in 0..5 {
                        sim.tick();
                    }
                }
                sim.state_hash()
            };

            prop_assert_eq!(run(), run());
        }
    }
}

//! End-to-end battle scenarios.
//!
//! These drive whole battles through the public API: armies are deployed,
//! orders go through the command dispatcher, and the simulation is ticked
//! until something observable happens.

use battle_core::prelude::*;
use battle_test_utils::balance::run_battle;
use battle_test_utils::determinism::{run_parallel_simulations, verify_simulation_determinism};
use battle_test_utils::fixtures::{
    all_ai_config, battle, cell_centre, melee_lines, mixed_skirmish, player_config,
    walled_pocket, FIXTURE_SEED,
};

// =============================================================================
// Combat
// =============================================================================

mod combat {
    use super::*;

    #[test]
    fn test_melee_lines_fight_to_a_wipe() {
        let mut sim = melee_lines(5, 2.0, all_ai_config(FIXTURE_SEED));
        let result = run_battle(&mut sim, 2_000);

        let wiped: Vec<usize> = result
            .survivors
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n == 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(wiped.len(), 1, "exactly one side should be wiped: {result:?}");

        let expected = if wiped[0] == Team::Attacker.index() {
            BattleOutcome::Defeat
        } else {
            BattleOutcome::Victory
        };
        assert_eq!(result.outcome, Some(expected));
    }

    #[test]
    fn test_idle_units_ignore_distant_enemies() {
        let mut sim = melee_lines(3, 30.0, player_config());
        for _ in 0..100 {
            sim.tick();
        }
        let status = sim.status();
        assert_eq!(status.alive, [3, 3]);
        assert_eq!(status.kills, [0, 0]);
        assert!(sim
            .context()
            .units
            .iter()
            .all(|(_, u)| u.state == UnitState::Idle));
    }

    #[test]
    fn test_ai_skirmish_resolves() {
        let mut sim = mixed_skirmish(FIXTURE_SEED);
        let result = run_battle(&mut sim, 20_000);
        assert!(result.outcome.is_some(), "skirmish timed out: {result:?}");

        let status = sim.status();
        let dead = (status.deployed[0] + status.deployed[1]) - (status.alive[0] + status.alive[1]);
        assert_eq!((status.kills[0] + status.kills[1]) as usize, dead);
    }

    #[test]
    fn test_hit_events_match_hp_loss() {
        let mut sim = melee_lines(2, 1.5, player_config());
        let before: f32 = sim.context().units.iter().map(|(_, u)| u.hp).sum();

        let mut dealt = 0.0;
        for _ in 0..40 {
            let events = sim.tick();
            dealt += events.hits.iter().map(|h| h.damage).sum::<f32>();
        }
        let after: f32 = sim.context().units.iter().map(|(_, u)| u.hp).sum();

        assert!(dealt > 0.0);
        assert!((before - after - dealt).abs() < 1e-2);
    }
}

// =============================================================================
// Movement and pathing
// =============================================================================

mod movement {
    use super::*;
    use battle_core::pathfinding::{Cell, CellType};

    /// A lone defender far away keeps the battle from ending on its own.
    fn with_sentinel(sim: &mut Simulation) {
        sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(-50.0, 50.0), 99);
    }

    #[test]
    fn test_move_into_walled_pocket_settles_idle() {
        let goal = cell_centre(Vec2::new(10.0, 10.0));
        let obstacles = walled_pocket(goal);
        let mut sim = Simulation::with_obstacles(player_config(), &obstacles).unwrap();
        with_sentinel(&mut sim);
        let id = sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(0.5, 0.5), 1);
        sim.begin_battle();

        let mut commands = CommandDispatcher::new(Team::Attacker);
        commands
            .dispatch(&mut sim, PlayerIntent::Select { unit: Some(id), additive: false })
            .unwrap();
        commands
            .dispatch(&mut sim, PlayerIntent::Move { target: goal, keep_guard: false })
            .unwrap();

        for _ in 0..60 {
            sim.tick();
        }
        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.state, UnitState::Idle);
        assert!(unit.path.is_empty());
        assert!(unit.position.distance(Vec2::new(0.5, 0.5)) < 0.5);
    }

    #[test]
    fn test_squad_reaches_formation_slots() {
        let mut sim = battle(player_config());
        with_sentinel(&mut sim);
        let ids = sim.deploy_squad(&SquadSpec::new(
            Team::Attacker,
            Archetype::Melee,
            6,
            Vec2::new(0.0, -20.0),
            1,
        ));
        sim.begin_battle();

        let mut commands = CommandDispatcher::new(Team::Attacker);
        commands.dispatch(&mut sim, PlayerIntent::SelectSquad(1)).unwrap();
        commands
            .dispatch(&mut sim, PlayerIntent::SetFormation(FormationKind::Square))
            .unwrap();
        let target = Vec2::new(5.0, 0.0);
        let preview = commands.preview_move(&sim, target);
        commands
            .dispatch(&mut sim, PlayerIntent::Move { target, keep_guard: false })
            .unwrap();

        for _ in 0..400 {
            sim.tick();
        }
        assert_eq!(preview.len(), ids.len());
        let positions: Vec<Vec2> = ids
            .iter()
            .map(|&id| {
                let unit = sim.unit(id).unwrap();
                assert_eq!(unit.state, UnitState::Idle);
                unit.position
            })
            .collect();
        for slot in preview {
            // Separation may nudge neighbours a little off their slot
            assert!(
                positions.iter().any(|p| p.distance(slot) < 1.0),
                "nobody reached {slot:?}"
            );
        }
    }

    /// Open map with a wall over `z` in `[-1, 1)`, optionally broken by a
    /// one-cell gap at cell column `gap`.
    fn walled_map(gap: Option<u32>) -> GridMap {
        let config = player_config();
        let mut grid = GridMap::for_map(config.map_size, config.cell_size).unwrap();
        for x in (0..grid.width()).filter(|&x| Some(x) != gap) {
            for y in [59, 60] {
                grid.set(Cell::new(x, y), CellType::Blocked);
            }
        }
        grid
    }

    fn in_wall(sim: &Simulation, id: UnitId) -> bool {
        let grid = &sim.context().grid;
        let pos = sim.unit(id).unwrap().position;
        grid.world_to_cell(pos).is_some_and(|c| !grid.is_passable(c))
    }

    #[test]
    fn test_fighter_does_not_chase_through_a_wall() {
        let mut sim = Simulation::with_grid(player_config(), walled_map(None)).unwrap();
        let attacker = sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(0.5, -2.0), 1);
        let runner = sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(0.5, 1.5), 2);
        sim.begin_battle();
        sim.unit_mut(runner)
            .unwrap()
            .order_move(Vec2::new(0.5, 30.0), None, false);

        let mut engaged = false;
        for tick in 0..60 {
            sim.tick();
            engaged |= sim.unit(attacker).unwrap().target_unit == Some(runner);
            assert!(!in_wall(&sim, attacker), "attacker inside the wall at tick {tick}");
        }
        assert!(engaged, "the attacker should have picked the runner as a target");
        assert!(sim.unit(attacker).unwrap().position.y < -1.0);
    }

    #[test]
    fn test_fighter_routes_through_a_breach() {
        let mut sim = Simulation::with_grid(player_config(), walled_map(Some(66))).unwrap();
        let attacker = sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(0.5, -2.5), 1);
        let guard = sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(0.5, 3.0), 2);
        sim.unit_mut(guard).unwrap().set_guard(true);
        sim.begin_battle();
        {
            let unit = sim.unit_mut(attacker).unwrap();
            unit.state = UnitState::Attacking;
            unit.target_unit = Some(guard);
        }

        let max_hp = sim.unit(guard).unwrap().max_hp;
        for tick in 0..400 {
            sim.tick();
            assert!(!in_wall(&sim, attacker), "attacker inside the wall at tick {tick}");
            if sim.unit(guard).unwrap().hp < max_hp {
                return;
            }
        }
        panic!(
            "attacker never reached the guard; stopped at {:?}",
            sim.unit(attacker).unwrap().position
        );
    }

    #[test]
    fn test_units_stay_on_the_field() {
        let mut sim = battle(player_config());
        with_sentinel(&mut sim);
        let id = sim.spawn_unit(Team::Attacker, Archetype::Mounted, Vec2::ZERO, 1);
        sim.begin_battle();
        sim.unit_mut(id)
            .unwrap()
            .order_move(Vec2::new(500.0, 0.0), None, false);

        for _ in 0..400 {
            sim.tick();
        }
        let limit = sim.config().half_extent();
        let pos = sim.unit(id).unwrap().position;
        assert!(pos.x.abs() <= limit && pos.y.abs() <= limit);
    }
}

// =============================================================================
// Capture points and victory
// =============================================================================

mod capture {
    use super::*;

    #[test]
    fn test_uncontested_point_is_captured() {
        let mut config = player_config();
        config.capture.attack_rate = 1_000.0;
        let mut sim = battle(config);
        let point = sim.add_capture_point(Vec2::new(0.0, 10.0));
        for i in 0..3 {
            sim.spawn_unit(
                Team::Attacker,
                Archetype::Melee,
                Vec2::new(i as f32 - 1.0, 10.0),
                1,
            );
        }
        sim.begin_battle();

        let mut flips = Vec::new();
        for _ in 0..10 {
            flips.extend(sim.tick().captures);
        }

        let snapshot = &sim.capture_snapshots()[point];
        assert_eq!(snapshot.owner, Some(Team::Attacker));
        assert_eq!(snapshot.progress, 100.0);
        assert_eq!(flips.len(), 1);
        assert_eq!(sim.status().outcome(), Some(BattleOutcome::Victory));
    }

    #[test]
    fn test_points_do_not_move_during_deployment() {
        let mut config = player_config();
        config.capture.attack_rate = 1_000.0;
        let mut sim = battle(config);
        sim.add_capture_point(Vec2::ZERO);
        sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::ZERO, 1);

        for _ in 0..10 {
            sim.tick();
        }
        let snapshot = &sim.capture_snapshots()[0];
        assert_eq!(snapshot.owner, Some(Team::Defender));
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(sim.phase(), BattlePhase::Deployment);
    }

    #[test]
    fn test_wiped_attackers_lose_even_holding_points() {
        let mut sim = battle(player_config());
        sim.add_capture_point(Vec2::ZERO);
        sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(30.0, 30.0), 2);
        sim.begin_battle();

        sim.tick();
        assert_eq!(sim.status().outcome(), Some(BattleOutcome::Defeat));
    }
}

// =============================================================================
// Reinforcements
// =============================================================================

mod reinforcements {
    use super::*;

    #[test]
    fn test_reinforcements_join_a_running_battle() {
        let mut sim = melee_lines(2, 30.0, all_ai_config(5));
        let added = sim
            .spawn_reinforcements(&SquadSpec::new(
                Team::Attacker,
                Archetype::Ranged,
                4,
                Vec2::new(0.0, -40.0),
                7,
            ))
            .unwrap();

        assert_eq!(added.len(), 4);
        let status = sim.status();
        assert_eq!(status.deployed, [6, 2]);
        assert_eq!(status.alive(Team::Attacker), 6);
    }

    #[test]
    fn test_reinforcements_rejected_once_decided() {
        let mut sim = battle(player_config());
        sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::ZERO, 1);
        sim.begin_battle();
        sim.tick();
        assert_eq!(sim.status().outcome(), Some(BattleOutcome::Victory));

        let err = sim
            .spawn_reinforcements(&SquadSpec::new(
                Team::Defender,
                Archetype::Melee,
                3,
                Vec2::new(0.0, 20.0),
                2,
            ))
            .unwrap_err();
        assert_eq!(err, BattleError::BattleFinished);
    }
}

// =============================================================================
// Determinism
// =============================================================================

mod determinism {
    use super::*;

    #[test]
    fn test_skirmish_replays_identically() {
        assert!(verify_simulation_determinism(|| mixed_skirmish(42), 600));
    }

    #[test]
    fn test_parallel_replays_agree() {
        let result = run_parallel_simulations(|| mixed_skirmish(9), 4, 300);
        result.assert_deterministic();
    }

    #[test]
    fn test_replayed_orders_reproduce_the_battle() {
        let play = || {
            let mut sim = mixed_skirmish(FIXTURE_SEED);
            sim.context_mut()
                .config
                .ai_teams
                .retain(|&team| team != Team::Attacker);
            let mut commands = CommandDispatcher::new(Team::Attacker);
            let orders = [
                PlayerIntent::SelectAll,
                PlayerIntent::SetFormation(FormationKind::Wedge),
                PlayerIntent::Move {
                    target: Vec2::new(0.0, 5.0),
                    keep_guard: false,
                },
            ];
            for order in orders {
                commands.dispatch(&mut sim, order).unwrap();
            }
            for _ in 0..500 {
                sim.tick();
            }
            sim.state_hash()
        };
        assert_eq!(play(), play());
    }
}

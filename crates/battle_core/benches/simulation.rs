//! Simulation benchmarks for battle_core.
//!
//! Run with: `cargo bench -p battle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use battle_core::pathfinding::{find_path, Cell, GridMap, Obstacle};
use battle_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn skirmish(per_side: usize) -> Simulation {
    let config = BattleConfig::default()
        .with_seed(7)
        .with_ai_teams(&[Team::Attacker, Team::Defender]);
    let mut sim = Simulation::new(config).expect("default config is valid");
    sim.deploy_squad(&SquadSpec::new(
        Team::Attacker,
        Archetype::Melee,
        per_side,
        Vec2::new(0.0, -15.0),
        1,
    ));
    sim.deploy_squad(&SquadSpec::new(
        Team::Defender,
        Archetype::Melee,
        per_side,
        Vec2::new(0.0, 15.0),
        2,
    ));
    sim.begin_battle();
    sim
}

/// Ticks of a running battle at several army sizes.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for per_side in [10, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(per_side), &per_side, |b, &n| {
            let sim = skirmish(n);
            b.iter_batched(
                || sim.clone(),
                |mut sim| {
                    for _ in 0..20 {
                        black_box(sim.tick());
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// A* across a map with scattered obstacles.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let obstacles: Vec<Obstacle> = (0..40)
        .map(|i| {
            let t = i as f32;
            Obstacle {
                center: Vec2::new((t * 7.3) % 100.0 - 50.0, (t * 13.1) % 100.0 - 50.0),
                radius: 3.0,
            }
        })
        .collect();
    let grid = GridMap::from_obstacles(120.0, 1.0, &obstacles).expect("grid fits");

    c.bench_function("find_path_across_map", |b| {
        b.iter(|| find_path(black_box(&grid), Cell::new(2, 2), Cell::new(117, 117)));
    });
}

criterion_group!(benches, tick_benchmark, pathfinding_benchmark);
criterion_main!(benches);

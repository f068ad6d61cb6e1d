//! Benchmarks for chain networks
//!
//! Measures:
//! - building a random network through the connection manager
//! - event-driven ticks after a source toggles
//! - backstop ticks that re-evaluate every node

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use redwire_core::{GridWorld, NetworkConfig, Position, Simulation};

fn random_simulation(nodes: usize, seed: u64) -> (Simulation<GridWorld>, Vec<Position>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let cfg = NetworkConfig {
        update_interval_ticks: 1_000_000,
        ..Default::default()
    };
    let mut sim = Simulation::new(cfg, GridWorld::new());
    let side = (nodes as f64).cbrt().ceil() as i32 * 8;
    let mut positions = Vec::with_capacity(nodes);
    while positions.len() < nodes {
        let pos = Position::new(
            rng.random_range(0..side),
            rng.random_range(0..side),
            rng.random_range(0..side),
        );
        if sim.place_chain(pos) {
            positions.push(pos);
        }
    }
    for _ in 0..nodes * 3 {
        let a = positions[rng.random_range(0..positions.len())];
        let b = positions[rng.random_range(0..positions.len())];
        let _ = sim.connect(a, b);
    }
    sim.tick();
    (sim, positions)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_network");
    for &n in &[100usize, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| random_simulation(black_box(n), 7))
        });
    }
    group.finish();
}

fn bench_event_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_tick");
    for &n in &[100usize, 1_000, 10_000] {
        let (mut sim, positions) = random_simulation(n, 11);
        let lever = positions[0].offset(0, 1, 0);
        let mut on = false;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                on = !on;
                sim.set_source(lever, if on { 15 } else { 0 });
                let report = sim.tick();
                sim.world_mut().drain_notifications();
                black_box(report)
            })
        });
    }
    group.finish();
}

fn bench_backstop_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("backstop_tick");
    for &n in &[100usize, 1_000, 10_000] {
        let (sim, _) = random_simulation(n, 13);
        let (network, world, _) = sim.into_parts();
        let cfg = NetworkConfig {
            update_interval_ticks: 1,
            ..*network.config()
        };
        let mut sim: Simulation<GridWorld> =
            Simulation::resume(redwire_core::load_region(cfg, network.records()).0, world, 0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let report = sim.tick();
                sim.world_mut().drain_notifications();
                black_box(report)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_event_tick, bench_backstop_tick);
criterion_main!(benches);

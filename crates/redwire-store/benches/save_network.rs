use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use redwire_core::{ChainNetwork, NetworkConfig, Position};
use redwire_store::Store;

fn random_network(nodes: usize) -> ChainNetwork {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut net = ChainNetwork::new(NetworkConfig::default());
    let mut positions = Vec::with_capacity(nodes);
    while positions.len() < nodes {
        let pos = Position::new(
            rng.random_range(-64..64),
            rng.random_range(0..128),
            rng.random_range(-64..64),
        );
        if net.place(pos) {
            positions.push(pos);
        }
    }
    for _ in 0..nodes * 2 {
        let a = positions[rng.random_range(0..positions.len())];
        let b = positions[rng.random_range(0..positions.len())];
        let _ = net.try_connect(a, b);
    }
    net
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_network");
    for &n in &[100usize, 1_000] {
        let net = random_network(n);
        let store = Store::open_in_memory().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| store.save_network(black_box(&net)).unwrap())
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_network");
    for &n in &[100usize, 1_000] {
        let net = random_network(n);
        let store = Store::open_in_memory().unwrap();
        store.save_network(&net).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| store.load_network(NetworkConfig::default()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);

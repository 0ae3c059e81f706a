//! Performance benchmarks for ECOTONE

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecotone::fear::FearNetwork;
use ecotone::genetics::TraitAllocator;
use ecotone::grid::Position;
use ecotone::memory::{MemoryContext, SpatialMemory};
use ecotone::{Config, Organism, Role, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn benchmark_world_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_update");

    for herbivores in [10, 50, 200].iter() {
        let mut config = Config::default();
        config.world.initial_herbivores = *herbivores;
        config.world.initial_carnivores = herbivores / 10;

        let mut world = World::new_with_seed(config, 42);

        // Warm up
        world.run(10);

        group.bench_with_input(BenchmarkId::new("herbivores", herbivores), herbivores, |b, _| {
            b.iter(|| {
                world.step();
            });
        });
    }

    group.finish();
}

fn benchmark_allocation(c: &mut Criterion) {
    let config = Config::default();
    let allocator = TraitAllocator::new(&config.genetics);
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let parent = allocator.founder(Role::Herbivore, 10, &mut rng).genome;

    c.bench_function("allocator_founder", |b| {
        b.iter(|| allocator.founder(black_box(Role::Carnivore), 10, &mut rng))
    });

    c.bench_function("allocator_inherit", |b| {
        b.iter(|| allocator.inherit(Role::Herbivore, black_box(&parent), &mut rng))
    });
}

fn benchmark_fear_propagation(c: &mut Criterion) {
    let config = Config::default();
    let allocator = TraitAllocator::new(&config.genetics);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut organisms: Vec<Organism> = (0..200)
        .map(|i| {
            let pos = Position::random(&mut rng, config.world.grid_size);
            Organism::founder(i, Role::Herbivore, pos, &allocator, &config, &mut rng)
        })
        .collect();
    if let Some(h) = organisms[0].herbivore_state_mut() {
        h.learn([1000]);
    }
    let network = FearNetwork::new(&config);

    c.bench_function("fear_propagate_200", |b| {
        b.iter(|| {
            let mut herd = organisms.clone();
            network.propagate(black_box(0), &mut herd)
        });
    });
}

fn benchmark_memory(c: &mut Criterion) {
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut memory = SpatialMemory::new(8);
    for i in 0..8u16 {
        memory.remember(Position::new(i, i), MemoryContext::new(0.1 * i as f64, i as usize), i as u64);
    }
    let current = MemoryContext::new(0.3, 2);

    c.bench_function("memory_retrieve", |b| {
        b.iter(|| memory.retrieve(black_box(&current), &config.memory, &mut rng))
    });
}

criterion_group!(
    benches,
    benchmark_world_update,
    benchmark_allocation,
    benchmark_fear_propagation,
    benchmark_memory,
);

criterion_main!(benches);

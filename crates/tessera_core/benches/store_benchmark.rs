//! # Component Store Benchmark
//!
//! REQUIREMENTS:
//! - Tens of thousands of entities per frame
//! - O(1) add / remove / has regardless of store size
//! - Intersection cost bounded by the smallest queried type
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs and never read component payloads
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{Component, ComponentStore, ComponentType, EntityId, IndexSet, ObjectPool};

/// Entities per simulated frame.
const ENTITY_COUNT: u64 = 50_000;

const TRANSFORM: ComponentType = ComponentType::new("Transform");
const VELOCITY: ComponentType = ComponentType::new("Velocity");

#[derive(Clone, Copy, Debug)]
enum BenchComponent {
    Transform([f32; 4]),
    Velocity([f32; 4]),
}

impl Component for BenchComponent {
    fn component_type(&self) -> ComponentType {
        match self {
            Self::Transform(_) => TRANSFORM,
            Self::Velocity(_) => VELOCITY,
        }
    }
}

fn populated_store(count: u64) -> ComponentStore<BenchComponent> {
    let store = ComponentStore::new();
    store
        .register_component_type(TRANSFORM, 64, || BenchComponent::Transform([0.0; 4]))
        .unwrap();
    store
        .register_component_type(VELOCITY, 64, || BenchComponent::Velocity([0.0; 4]))
        .unwrap();
    store.reserve(TRANSFORM, count as usize).unwrap();

    for raw in 1..=count {
        let entity = EntityId::new(raw);
        store
            .add_component(entity, BenchComponent::Transform([0.0; 4]))
            .unwrap();
        // Every tenth entity moves
        if raw % 10 == 0 {
            store
                .add_component(entity, BenchComponent::Velocity([1.0; 4]))
                .unwrap();
        }
    }
    store
}

/// Benchmark: raw IndexSet insert + swap-remove.
fn bench_index_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_set");

    for count in [1_000u64, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut set = IndexSet::with_capacity(count as usize);
                for raw in 1..=count {
                    set.insert(EntityId::new(raw)).unwrap();
                }
                for raw in (1..=count).step_by(2) {
                    set.remove(EntityId::new(raw)).unwrap();
                }
                black_box(set.len())
            });
        });
    }

    group.finish();
}

/// Benchmark: one frame of component churn.
fn bench_add_remove(c: &mut Criterion) {
    c.bench_function("add_remove_50K", |b| {
        let store = populated_store(0);
        b.iter(|| {
            for raw in 1..=ENTITY_COUNT {
                store
                    .add_component(EntityId::new(raw), BenchComponent::Transform([0.0; 4]))
                    .unwrap();
            }
            for raw in 1..=ENTITY_COUNT {
                black_box(store.remove_component(EntityId::new(raw), TRANSFORM).unwrap());
            }
        });
    });
}

/// Benchmark: membership checks against a full store.
fn bench_has_component(c: &mut Criterion) {
    let store = populated_store(ENTITY_COUNT);
    c.bench_function("has_component_50K", |b| {
        b.iter(|| {
            let mut hits = 0;
            for raw in 1..=ENTITY_COUNT {
                if store.has_component(EntityId::new(raw), VELOCITY) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
}

/// Benchmark: Transform x Velocity intersection (smallest set drives the scan).
fn bench_intersection(c: &mut Criterion) {
    let store = populated_store(ENTITY_COUNT);
    c.bench_function("intersection_50K", |b| {
        b.iter(|| black_box(store.get_entities_with_multiple_components(&[TRANSFORM, VELOCITY])));
    });
}

/// Benchmark: pooled acquire/release cycle.
fn bench_pool(c: &mut Criterion) {
    let mut pool = ObjectPool::new(TRANSFORM, 1024, || BenchComponent::Transform([0.0; 4])).unwrap();
    c.bench_function("pool_acquire_release_1K", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..1024).map(|_| pool.acquire().unwrap()).collect();
            for handle in handles {
                pool.release(handle).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_index_set,
    bench_add_remove,
    bench_has_component,
    bench_intersection,
    bench_pool,
);

criterion_main!(benches);

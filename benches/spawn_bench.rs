#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ecs_core::{ComponentSchema, FieldValue, ScalarType, World};

fn register_components(world: &mut World) -> (ecs_core::ComponentId, ecs_core::ComponentId, ecs_core::ComponentId) {
    let pos = world.register_component(ComponentSchema::new([
        ("x", ScalarType::F32),
        ("y", ScalarType::F32),
        ("z", ScalarType::F32),
    ]));
    let vel = world.register_component(ComponentSchema::new([
        ("x", ScalarType::F32),
        ("y", ScalarType::F32),
        ("z", ScalarType::F32),
    ]));
    let health = world.register_component(ComponentSchema::new([("amount", ScalarType::U32)]));
    (pos, vel, health)
}

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    group.bench_function("spawn_2_components_1k", |b| {
        let mut world = World::default();
        let (pos, vel, _health) = register_components(&mut world);
        b.iter(|| {
            for _ in 0..1000 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(1.0), FieldValue::F32(2.0), FieldValue::F32(3.0)]).unwrap();
                world.add_component(e, vel, &[FieldValue::F32(1.0), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                black_box(e);
            }
        });
    });

    group.bench_function("spawn_3_components_1k", |b| {
        let mut world = World::default();
        let (pos, vel, health) = register_components(&mut world);
        b.iter(|| {
            for _ in 0..1000 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(1.0), FieldValue::F32(2.0), FieldValue::F32(3.0)]).unwrap();
                world.add_component(e, vel, &[FieldValue::F32(1.0), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                world.add_component(e, health, &[FieldValue::U32(100)]).unwrap();
                black_box(e);
            }
        });
    });

    group.finish();
}

fn bench_spawn_large(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_large");

    for count in [1_000, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::new("spawn_with_3_components", count), count, |b, &count| {
            b.iter(|| {
                let mut world = World::default();
                let (pos, vel, health) = register_components(&mut world);
                for i in 0..count {
                    let e = world.spawn();
                    world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                    world.add_component(e, vel, &[FieldValue::F32(1.0), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                    world.add_component(e, health, &[FieldValue::U32(100)]).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_despawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("despawn");

    group.bench_function("despawn_1k_entities", |b| {
        b.iter_batched(
            || {
                let mut world = World::default();
                let (pos, _vel, health) = register_components(&mut world);
                let entities: Vec<_> = (0..1000)
                    .map(|i| {
                        let e = world.spawn();
                        world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                        world.add_component(e, health, &[FieldValue::U32(100)]).unwrap();
                        e
                    })
                    .collect();
                (world, entities)
            },
            |(mut world, entities)| {
                for entity in entities {
                    let _ = world.destroy(entity);
                }
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_archetype_segregation(c: &mut Criterion) {
    c.bench_function("archetype_segregation_1k", |b| {
        b.iter(|| {
            let mut world = World::default();
            let (pos, vel, health) = register_components(&mut world);

            for i in 0..250 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                world.add_component(e, vel, &[FieldValue::F32(1.0), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
            }
            for i in 0..250 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                world.add_component(e, health, &[FieldValue::U32(100)]).unwrap();
            }
            for i in 0..250 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                world.add_component(e, vel, &[FieldValue::F32(1.0), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
                world.add_component(e, health, &[FieldValue::U32(100)]).unwrap();
            }
            for i in 0..250 {
                let e = world.spawn();
                world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
            }
        });
    });
}

fn bench_entity_count(c: &mut Criterion) {
    c.bench_function("entity_count_10k", |b| {
        let mut world = World::default();
        let (pos, _vel, _health) = register_components(&mut world);
        for i in 0..10_000 {
            let e = world.spawn();
            world.add_component(e, pos, &[FieldValue::F32(i as f32), FieldValue::F32(0.0), FieldValue::F32(0.0)]).unwrap();
        }

        b.iter(|| {
            black_box(world.entity_count());
        });
    });
}

criterion_group!(
    benches,
    bench_spawn,
    bench_spawn_large,
    bench_despawn,
    bench_archetype_segregation,
    bench_entity_count
);
criterion_main!(benches);

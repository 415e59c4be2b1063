// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end scenarios exercising `World` across modules.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use ecs_core::{ComponentSchema, FieldValue, Phase, ScalarType, SystemConfig, World, WorldOptions};

fn pos_schema() -> ComponentSchema {
    ComponentSchema::new([("x", ScalarType::F64), ("y", ScalarType::F64)])
}

/// S1: registering one component and adding it to two entities produces
/// exactly the empty archetype plus one populated archetype, with both
/// entities' fields landing in the expected column order.
#[test]
fn signature_dedup_produces_one_new_archetype() {
    let mut world = World::default();
    let pos = world.register_component(pos_schema());

    let e1 = world.spawn();
    world.add_component(e1, pos, &[FieldValue::F64(1.0), FieldValue::F64(2.0)]).unwrap();
    let e2 = world.spawn();
    world.add_component(e2, pos, &[FieldValue::F64(3.0), FieldValue::F64(4.0)]).unwrap();

    let handle = world.query(&[pos]);
    let archetypes = handle.matching_archetypes();
    assert_eq!(archetypes.len(), 1);

    let arch = world.archetype(archetypes[0]).unwrap();
    assert_eq!(arch.len(), 2);
    assert_eq!(world.get_field(e1, pos, 0).unwrap(), FieldValue::F64(1.0));
    assert_eq!(world.get_field(e2, pos, 0).unwrap(), FieldValue::F64(3.0));
}

/// S2: a second entity following the same add-Pos-then-add-Vel path reuses
/// the cached edges, so no new archetype is created.
#[test]
fn edge_cache_is_reused_for_the_same_path() {
    let mut world = World::default();
    let pos = world.register_component(pos_schema());
    let vel = world.register_component(ComponentSchema::new([("dx", ScalarType::F64), ("dy", ScalarType::F64)]));

    let e1 = world.spawn();
    world.add_component(e1, pos, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();
    world.add_component(e1, vel, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();
    let count_before = world.query(&[pos, vel]).matching_archetypes().len();

    let e2 = world.spawn();
    world.add_component(e2, pos, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();
    world.add_component(e2, vel, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();
    let count_after = world.query(&[pos, vel]).matching_archetypes().len();

    assert_eq!(count_before, count_after);
}

/// S3: destroying the entity at row 0 swaps the tail entity into its place.
#[test]
fn destroy_swaps_tail_entity_into_freed_row() {
    let mut world = World::default();
    let pos = world.register_component(ComponentSchema::new([
        ("x", ScalarType::F64),
        ("y", ScalarType::F64),
        ("z", ScalarType::F64),
    ]));

    let e1 = world.spawn();
    world
        .add_component(e1, pos, &[FieldValue::F64(10.0), FieldValue::F64(20.0), FieldValue::F64(30.0)])
        .unwrap();
    let e2 = world.spawn();
    world
        .add_component(e2, pos, &[FieldValue::F64(100.0), FieldValue::F64(200.0), FieldValue::F64(300.0)])
        .unwrap();

    world.destroy(e1).unwrap();

    assert_eq!(world.get_field(e2, pos, 0).unwrap(), FieldValue::F64(100.0));
}

/// S4: a system deferring an add and a destroy on the same entity sees no
/// effect until the phase flushes.
#[test]
fn deferred_changes_are_invisible_until_flush() {
    let mut world = World::default();
    let pos = world.register_component(pos_schema());
    let vel = world.register_component(ComponentSchema::new([("dx", ScalarType::F64), ("dy", ScalarType::F64)]));

    let e1 = world.spawn();
    world.add_component(e1, pos, &[FieldValue::F64(1.0), FieldValue::F64(2.0)]).unwrap();

    world
        .register_system(
            Phase::Update,
            SystemConfig::new("defer_then_destroy", move |world, _dt| {
                world.deferred().add_component(e1, vel, [FieldValue::F64(0.0), FieldValue::F64(0.0)]);
                assert!(!world.has_component(e1, vel).unwrap());
                world.deferred().destroy(e1);
                Ok(())
            }),
        )
        .unwrap();

    world.update(1.0 / 60.0).unwrap();
    assert!(!world.is_alive(e1));
}

/// S5: a live query grows in place as a newly registered component creates a
/// matching archetype, without re-issuing the query.
#[test]
fn live_query_grows_as_archetypes_appear() {
    let mut world = World::default();
    let pos = world.register_component(pos_schema());
    let e1 = world.spawn();
    world.add_component(e1, pos, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();

    let handle = world.query(&[pos]);
    assert_eq!(handle.archetype_count(), 1);

    let vel = world.register_component(ComponentSchema::new([("dx", ScalarType::F64), ("dy", ScalarType::F64)]));
    let e2 = world.spawn();
    world.add_component(e2, pos, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();
    world.add_component(e2, vel, &[FieldValue::F64(0.0), FieldValue::F64(0.0)]).unwrap();

    assert_eq!(handle.archetype_count(), 2);
}

/// S6: a large `update` delta clamps `FIXED_UPDATE` to `max_fixed_steps`
/// iterations instead of a burst proportional to the stall.
#[test]
fn fixed_step_clamp_bounds_update_bursts() {
    let options = WorldOptions {
        fixed_timestep: Duration::from_secs_f32(1.0 / 60.0),
        max_fixed_steps: 4,
        ..WorldOptions::default()
    };
    let mut world = World::new(options);
    let counter = Rc::new(RefCell::new(0u32));
    let counted = counter.clone();

    world
        .register_system(
            Phase::FixedUpdate,
            SystemConfig::new("tick_counter", move |_world, _dt| {
                *counted.borrow_mut() += 1;
                Ok(())
            }),
        )
        .unwrap();

    world.update(100.0 / 60.0).unwrap();
    assert_eq!(*counter.borrow(), 4);
}

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

//! Deferred structural changes: three parallel-array buffers instead of
//! boxed closures, so a system can queue mutations while holding read access
//! to the world and have them applied in one fixed-order flush.

use smallvec::SmallVec;

use crate::component::{ComponentId, FieldValue};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::world::World;

const INLINE_VALUES: usize = 8;

struct PendingAdd {
    entity: EntityId,
    component: ComponentId,
    values: SmallVec<[FieldValue; INLINE_VALUES]>,
}

struct PendingRemove {
    entity: EntityId,
    component: ComponentId,
}

/// Buffers structural changes for later application via [`DeferredBuffers::flush`].
///
/// Entries are recorded in call order but applied phase-by-phase: every
/// pending add first, then every pending remove, then every pending
/// destroy. An entry whose entity has already died (by the time flush runs,
/// not by the time it was recorded) is silently dropped, never an error.
/// Systems queue commands against entities they believe are alive, and
/// another system's deferred destroy earlier in the same flush is allowed to
/// invalidate that belief.
#[derive(Default)]
pub struct DeferredBuffers {
    pending_add: Vec<PendingAdd>,
    pending_remove: Vec<PendingRemove>,
    pending_destroy: Vec<EntityId>,
}

impl DeferredBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `component` to be added to `entity` with `values` on next flush.
    /// If this entity already has a pending add for the same component, the
    /// later call's values win once both are applied (flush runs adds in
    /// insertion order, and applying an add to a component already present
    /// just overwrites its fields).
    pub fn add_component(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        values: impl IntoIterator<Item = FieldValue>,
    ) {
        self.pending_add.push(PendingAdd {
            entity,
            component,
            values: values.into_iter().collect(),
        });
    }

    /// Queue `component` to be removed from `entity` on next flush.
    pub fn remove_component(&mut self, entity: EntityId, component: ComponentId) {
        self.pending_remove.push(PendingRemove { entity, component });
    }

    /// Queue `entity` for destruction on next flush.
    pub fn destroy(&mut self, entity: EntityId) {
        self.pending_destroy.push(entity);
    }

    pub fn is_empty(&self) -> bool {
        self.pending_add.is_empty() && self.pending_remove.is_empty() && self.pending_destroy.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending_add.len() + self.pending_remove.len() + self.pending_destroy.len()
    }

    /// Apply every buffered change to `world` in add, remove, destroy order,
    /// then clear all three buffers (capacity is retained).
    pub fn flush(&mut self, world: &mut World) -> Result<()> {
        for pending in self.pending_add.drain(..) {
            match world.add_component(pending.entity, pending.component, &pending.values) {
                Ok(()) => {}
                Err(EcsError::EntityGone(_)) => {}
                Err(other) => return Err(other),
            }
        }
        for pending in self.pending_remove.drain(..) {
            match world.remove_component(pending.entity, pending.component) {
                Ok(()) => {}
                Err(EcsError::EntityGone(_)) => {}
                Err(other) => return Err(other),
            }
        }
        for entity in self.pending_destroy.drain(..) {
            match world.destroy(entity) {
                Ok(()) => {}
                Err(EcsError::EntityGone(_)) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Drop every buffered change without applying it.
    pub fn clear(&mut self) {
        self.pending_add.clear();
        self.pending_remove.clear();
        self.pending_destroy.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentSchema, ScalarType};
    use crate::world::{World, WorldOptions};

    fn world_with_position() -> (World, ComponentId) {
        let mut world = World::new(WorldOptions::default());
        let position = world.register_component(ComponentSchema::new([("x", ScalarType::F32)]));
        (world, position)
    }

    #[test]
    fn flush_applies_add_then_remove_then_destroy_in_order() {
        let (mut world, position) = world_with_position();
        let entity = world.spawn();

        let mut buffers = DeferredBuffers::new();
        buffers.add_component(entity, position, [FieldValue::F32(1.0)]);
        assert_eq!(buffers.len(), 1);
        buffers.flush(&mut world).unwrap();
        assert!(buffers.is_empty());
        assert!(world.has_component(entity, position).unwrap());
    }

    #[test]
    fn flush_silently_skips_dead_entity() {
        let (mut world, position) = world_with_position();
        let entity = world.spawn();
        world.destroy(entity).unwrap();

        let mut buffers = DeferredBuffers::new();
        buffers.add_component(entity, position, [FieldValue::F32(1.0)]);
        buffers.remove_component(entity, position);
        buffers.destroy(entity);

        assert!(buffers.flush(&mut world).is_ok());
        assert!(buffers.is_empty());
    }

    #[test]
    fn double_deferred_destroy_second_entry_is_skipped_silently() {
        let (mut world, _position) = world_with_position();
        let entity = world.spawn();

        let mut buffers = DeferredBuffers::new();
        buffers.destroy(entity);
        buffers.destroy(entity);
        assert!(buffers.flush(&mut world).is_ok());
    }

    #[test]
    fn clear_drops_buffered_changes_without_applying() {
        let (mut world, position) = world_with_position();
        let entity = world.spawn();

        let mut buffers = DeferredBuffers::new();
        buffers.add_component(entity, position, [FieldValue::F32(1.0)]);
        buffers.clear();
        assert!(buffers.is_empty());
        assert!(!world.has_component(entity, position).unwrap());
    }
}

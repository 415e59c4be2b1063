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

//! `World`: the public façade wiring the component registry, archetype
//! graph, entity directory, query registry, deferred buffers, and scheduler
//! into one owned, single-threaded engine instance.

use std::time::Duration;

#[cfg(feature = "profiling")]
use tracing::info_span;

use smallvec::SmallVec;

use crate::archetype::{Archetype, ArchetypeId};
use crate::bitset::BitSet;
use crate::command::DeferredBuffers;
use crate::component::{ComponentId, ComponentRegistry, ComponentSchema, FieldValue, INLINE_FIELDS};
use crate::directory::EntityDirectory;
use crate::entity::EntityId;
use crate::error::Result;
use crate::event_bus::{EventBus, EventId};
use crate::graph::ArchetypeGraph;
use crate::query::{QueryHandle, QueryRegistry};
use crate::resources::{ResourceId, ResourceRegistry};
use crate::schedule::Scheduler;
use crate::system::{Phase, SystemConfig, SystemId};
use crate::time::Time;

/// Construction-time configuration, a plain options struct, the convention
/// used for `Time`/`FixedTime` construction.
#[derive(Debug, Clone, Copy)]
pub struct WorldOptions {
    pub fixed_timestep: Duration,
    pub max_fixed_steps: usize,
    pub initial_column_capacity: usize,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            fixed_timestep: Duration::from_secs_f32(1.0 / 60.0),
            max_fixed_steps: 4,
            initial_column_capacity: 1024,
        }
    }
}

fn mask_of(components: &[ComponentId]) -> BitSet {
    let mut mask = BitSet::new();
    for component in components {
        mask.set(component.index());
    }
    mask
}

/// Central ECS world: owns every subsystem outright, no shared or global
/// state. Immediate structural operations move entities between archetypes
/// synchronously; deferred ones queue through [`World::deferred`] for a
/// later [`World::flush`].
pub struct World {
    registry: ComponentRegistry,
    graph: ArchetypeGraph,
    directory: EntityDirectory,
    queries: QueryRegistry,
    deferred: DeferredBuffers,
    scheduler: Scheduler,
    events: EventBus,
    resources: ResourceRegistry,
    time: Time,
    options: WorldOptions,
    entity_count: usize,
}

impl World {
    pub fn new(options: WorldOptions) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            graph: ArchetypeGraph::new(),
            directory: EntityDirectory::new(),
            queries: QueryRegistry::new(),
            deferred: DeferredBuffers::new(),
            scheduler: Scheduler::new(options.fixed_timestep, options.max_fixed_steps),
            events: EventBus::new(),
            resources: ResourceRegistry::new(),
            time: Time::new(),
            options,
            entity_count: 0,
        }
    }

    pub fn with_options(options: WorldOptions) -> Self {
        Self::new(options)
    }

    pub fn options(&self) -> WorldOptions {
        self.options
    }

    // ---- registration -------------------------------------------------

    pub fn register_component(&mut self, schema: ComponentSchema) -> ComponentId {
        self.registry.register(schema)
    }

    /// Register a tag: a component bound to the empty schema.
    pub fn register_tag(&mut self) -> ComponentId {
        self.registry.register(ComponentSchema::tag())
    }

    // ---- entities -------------------------------------------------------

    /// Create a fresh entity, homed in the empty archetype.
    pub fn spawn(&mut self) -> EntityId {
        #[cfg(feature = "profiling")]
        let _span = info_span!("world.spawn", archetype_count = self.graph.len()).entered();

        let id = self.directory.create().expect("entity index space exhausted");
        let row = self
            .graph
            .archetype_mut(ArchetypeGraph::EMPTY)
            .expect("empty archetype always exists")
            .add_entity(id);
        self.directory.set_location(id, ArchetypeGraph::EMPTY, row);
        self.entity_count += 1;
        id
    }

    /// Destroy `entity` immediately: swap-remove its row, relocate whichever
    /// entity was swapped into its place, recycle the slot.
    pub fn destroy(&mut self, entity: EntityId) -> Result<()> {
        #[cfg(feature = "profiling")]
        let _span = info_span!("world.destroy").entered();

        let location = self.directory.destroy(entity)?;
        let swapped = self
            .graph
            .archetype_mut(location.archetype_id)
            .expect("entity's archetype id is always valid")
            .remove_row(location.row);
        if let Some(swapped_entity) = swapped {
            self.directory.relocate_row(self.directory.index_of(swapped_entity), location.row);
        }
        self.entity_count -= 1;
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.directory.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    /// A handle for queuing structural changes that apply on the next
    /// [`World::flush`] instead of immediately.
    pub fn deferred(&mut self) -> &mut DeferredBuffers {
        &mut self.deferred
    }

    // ---- components -----------------------------------------------------

    pub fn has_component(&self, entity: EntityId, component: ComponentId) -> Result<bool> {
        let location = self.directory.location(entity)?;
        Ok(self
            .graph
            .archetype(location.archetype_id)
            .expect("entity's archetype id is always valid")
            .has_component(component))
    }

    pub fn get_field(&self, entity: EntityId, component: ComponentId, field: usize) -> Result<FieldValue> {
        let location = self.directory.location(entity)?;
        let archetype = self
            .graph
            .archetype(location.archetype_id)
            .expect("entity's archetype id is always valid");
        let column = archetype.get_column(component, field).ok_or_else(|| {
            crate::error::EcsError::InvalidOperation(format!(
                "entity does not carry field {field} of component {component:?}"
            ))
        })?;
        Ok(column.read(location.row))
    }

    pub fn set_field(&mut self, entity: EntityId, component: ComponentId, field: usize, value: FieldValue) -> Result<()> {
        let location = self.directory.location(entity)?;
        let archetype = self
            .graph
            .archetype_mut(location.archetype_id)
            .expect("entity's archetype id is always valid");
        let column = archetype.get_column_mut(component, field).ok_or_else(|| {
            crate::error::EcsError::InvalidOperation(format!(
                "entity does not carry field {field} of component {component:?}"
            ))
        })?;
        column.write(location.row, value)
    }

    /// Add `component` to `entity` with `values`, moving it to the target
    /// archetype. If the component is already present, overwrites its
    /// fields in place without a structural move.
    pub fn add_component(&mut self, entity: EntityId, component: ComponentId, values: &[FieldValue]) -> Result<()> {
        let location = self.directory.location(entity)?;
        let source = location.archetype_id;

        if self
            .graph
            .archetype(source)
            .expect("entity's archetype id is always valid")
            .has_component(component)
        {
            self.graph
                .archetype_mut(source)
                .expect("entity's archetype id is always valid")
                .write_fields(location.row, component, values)?;
            return Ok(());
        }

        #[cfg(feature = "profiling")]
        let _span = info_span!("world.add_component", component = component.index()).entered();

        let target = self.graph.resolve_add(source, component, &self.registry, &mut self.queries)?;
        let transition_map = self
            .graph
            .cached_add_edge(source, component)
            .and_then(|edge| edge.add_column_map.clone())
            .expect("resolve_add always caches add_column_map");

        let (new_row, swapped) = self.graph.move_row(source, target, location.row, entity, &transition_map);
        self.directory.set_location(entity, target, new_row);
        if let Some(swapped_entity) = swapped {
            self.directory.relocate_row(self.directory.index_of(swapped_entity), location.row);
        }

        self.graph
            .archetype_mut(target)
            .expect("resolve_add always returns a valid archetype")
            .write_fields(new_row, component, values)?;
        Ok(())
    }

    /// Add every entry in `entries` in one fused move: walks the add edges to
    /// compute the final target, then writes every new component's fields at
    /// the destination row.
    pub fn add_components(&mut self, entity: EntityId, entries: &[(ComponentId, &[FieldValue])]) -> Result<()> {
        let location = self.directory.location(entity)?;
        let source = location.archetype_id;

        let mut target = source;
        for (component, _) in entries {
            target = self.graph.resolve_add(target, *component, &self.registry, &mut self.queries)?;
        }

        if target == source {
            for (component, values) in entries {
                self.graph
                    .archetype_mut(source)
                    .expect("entity's archetype id is always valid")
                    .write_fields(location.row, *component, values)?;
            }
            return Ok(());
        }

        let transition_map = {
            let dst = self.graph.archetype(target).expect("resolved target is valid");
            let src = self.graph.archetype(source).expect("entity's archetype id is always valid");
            dst.build_transition_map(src)
        };
        let (new_row, swapped) = self.graph.move_row(source, target, location.row, entity, &transition_map);
        self.directory.set_location(entity, target, new_row);
        if let Some(swapped_entity) = swapped {
            self.directory.relocate_row(self.directory.index_of(swapped_entity), location.row);
        }

        for (component, values) in entries {
            self.graph
                .archetype_mut(target)
                .expect("resolved target is valid")
                .write_fields(new_row, *component, values)?;
        }
        Ok(())
    }

    /// Remove `component` from `entity`, moving it to the target archetype.
    /// A no-op if the component isn't present.
    pub fn remove_component(&mut self, entity: EntityId, component: ComponentId) -> Result<()> {
        let location = self.directory.location(entity)?;
        let source = location.archetype_id;

        if !self
            .graph
            .archetype(source)
            .expect("entity's archetype id is always valid")
            .has_component(component)
        {
            return Ok(());
        }

        #[cfg(feature = "profiling")]
        let _span = info_span!("world.remove_component", component = component.index()).entered();

        let target = self.graph.resolve_remove(source, component, &self.registry, &mut self.queries)?;
        let transition_map = self
            .graph
            .cached_remove_edge(source, component)
            .and_then(|edge| edge.remove_column_map.clone())
            .expect("resolve_remove always caches remove_column_map");

        let (new_row, swapped) = self.graph.move_row(source, target, location.row, entity, &transition_map);
        self.directory.set_location(entity, target, new_row);
        if let Some(swapped_entity) = swapped {
            self.directory.relocate_row(self.directory.index_of(swapped_entity), location.row);
        }
        Ok(())
    }

    /// Remove every component in `components` in one fused move. A component
    /// already absent is skipped when computing the target.
    pub fn remove_components(&mut self, entity: EntityId, components: &[ComponentId]) -> Result<()> {
        let location = self.directory.location(entity)?;
        let source = location.archetype_id;

        let mut target = source;
        for &component in components {
            target = self.graph.resolve_remove(target, component, &self.registry, &mut self.queries)?;
        }

        if target == source {
            return Ok(());
        }

        let transition_map = {
            let dst = self.graph.archetype(target).expect("resolved target is valid");
            let src = self.graph.archetype(source).expect("entity's archetype id is always valid");
            dst.build_transition_map(src)
        };
        let (new_row, swapped) = self.graph.move_row(source, target, location.row, entity, &transition_map);
        self.directory.set_location(entity, target, new_row);
        if let Some(swapped_entity) = swapped {
            self.directory.relocate_row(self.directory.index_of(swapped_entity), location.row);
        }
        Ok(())
    }

    /// Move every entity currently in `archetype` into the archetype formed
    /// by adding `component`, writing `values` on each. Implemented as
    /// repeated fused single-entity moves through [`World::add_component`]
    /// rather than a column-level bulk copy, since [`crate::archetype::Column`]
    /// exposes no vectorized extend primitive; each move is still O(columns),
    /// so the only cost given up versus a true bulk copy is a constant factor.
    pub fn batch_add_component(&mut self, archetype: ArchetypeId, component: ComponentId, values: &[FieldValue]) -> Result<()> {
        while let Some(&entity) = self.graph.archetype(archetype).and_then(|a| a.entities().first()) {
            self.add_component(entity, component, values)?;
        }
        Ok(())
    }

    /// Move every entity currently in `archetype` into the archetype formed
    /// by removing `component`. See [`World::batch_add_component`] for the
    /// implementation note.
    pub fn batch_remove_component(&mut self, archetype: ArchetypeId, component: ComponentId) -> Result<()> {
        while let Some(&entity) = self.graph.archetype(archetype).and_then(|a| a.entities().first()) {
            self.remove_component(entity, component)?;
        }
        Ok(())
    }

    // ---- queries ----------------------------------------------------------

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.graph.archetype(id)
    }

    pub fn query(&mut self, include: &[ComponentId]) -> QueryHandle {
        self.queries.get_or_create(mask_of(include), None, None, &self.graph)
    }

    pub fn query_filtered(&mut self, include: &[ComponentId], exclude: &[ComponentId], any_of: &[ComponentId]) -> QueryHandle {
        let exclude = if exclude.is_empty() { None } else { Some(mask_of(exclude)) };
        let any_of = if any_of.is_empty() { None } else { Some(mask_of(any_of)) };
        self.queries.get_or_create(mask_of(include), exclude, any_of, &self.graph)
    }

    pub fn and(&mut self, handle: &QueryHandle, extra_include: &[ComponentId]) -> QueryHandle {
        self.queries.and(handle, &mask_of(extra_include), &self.graph)
    }

    pub fn not(&mut self, handle: &QueryHandle, extra_exclude: &[ComponentId]) -> QueryHandle {
        self.queries.not(handle, &mask_of(extra_exclude), &self.graph)
    }

    pub fn any_of(&mut self, handle: &QueryHandle, extra_any_of: &[ComponentId]) -> QueryHandle {
        self.queries.any_of(handle, &mask_of(extra_any_of), &self.graph)
    }

    // ---- systems and scheduling --------------------------------------------

    /// Register `config` into `phase`, running its `on_added` hook (if any)
    /// immediately with full world access.
    pub fn register_system(&mut self, phase: Phase, config: SystemConfig) -> Result<SystemId> {
        let (id, on_added) = self.scheduler.add_system(phase, config)?;
        if let Some(mut hook) = on_added {
            hook(self)?;
        }
        Ok(id)
    }

    pub fn add_systems(&mut self, phase: Phase, configs: impl IntoIterator<Item = SystemConfig>) -> Result<Vec<SystemId>> {
        configs.into_iter().map(|config| self.register_system(phase, config)).collect()
    }

    /// Unregister `id`, running its `on_removed` hook (if any). A no-op if
    /// `id` isn't currently scheduled.
    pub fn remove_system(&mut self, id: SystemId) -> Result<()> {
        if let Some(mut hook) = self.scheduler.remove_system(id) {
            hook(self)?;
        }
        Ok(())
    }

    fn run_phase(&mut self, phase: Phase, dt: f32) -> Result<()> {
        let mut scheduler = std::mem::take(&mut self.scheduler);
        #[cfg(feature = "profiling")]
        let _span = info_span!("world.run_phase", phase = ?phase).entered();
        let result = scheduler.run_phase(phase, self, dt);
        self.scheduler = scheduler;
        result
    }

    /// Run `PRE_STARTUP`, `STARTUP`, `POST_STARTUP` in order, flushing
    /// deferred changes after each.
    pub fn startup(&mut self) -> Result<()> {
        for &phase in &Phase::STARTUP_ORDER {
            self.run_phase(phase, 0.0)?;
            self.flush()?;
        }
        Ok(())
    }

    /// Advance the fixed-timestep accumulator and run any `FIXED_UPDATE`
    /// iterations due, then `PRE_UPDATE`, `UPDATE`, `POST_UPDATE` with `dt`.
    /// Flushes deferred changes after every phase; clears event queues once
    /// at the end.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        self.time.update();

        let fixed_dt = self.scheduler.fixed_timestep().as_secs_f32();
        let steps = self.scheduler.fixed_steps_due(Duration::from_secs_f32(dt.max(0.0)));
        for _ in 0..steps {
            self.run_phase(Phase::FixedUpdate, fixed_dt)?;
            self.flush()?;
        }

        for &phase in &Phase::UPDATE_ORDER {
            self.run_phase(phase, dt)?;
            self.flush()?;
        }

        self.events.clear();
        Ok(())
    }

    /// Apply every buffered deferred change, in add-then-remove-then-destroy
    /// order.
    pub fn flush(&mut self) -> Result<()> {
        let mut deferred = std::mem::take(&mut self.deferred);
        let result = deferred.flush(self);
        self.deferred = deferred;
        result
    }

    /// `accumulator / fixed_dt`, for interpolating render state between
    /// fixed updates.
    pub fn fixed_alpha(&self) -> f32 {
        self.scheduler.fixed_alpha()
    }

    /// Run every remaining `dispose` hook across every phase, then every
    /// remaining `on_removed` hook, draining the scheduler in the process.
    pub fn dispose(&mut self) -> Result<()> {
        let mut scheduler = std::mem::take(&mut self.scheduler);
        let dispose_hooks = scheduler.drain_dispose_hooks();
        let removed_hooks = scheduler.drain_removed_hooks();
        self.scheduler = scheduler;

        for mut hook in dispose_hooks {
            hook(self)?;
        }
        for mut hook in removed_hooks {
            hook(self)?;
        }
        Ok(())
    }

    // ---- time ---------------------------------------------------------------

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut Time {
        &mut self.time
    }

    // ---- events and resources (external-collaborator channels) --------------

    pub fn register_event(&mut self, schema: ComponentSchema) -> EventId {
        self.events.register_event(schema)
    }

    pub fn emit_event(&mut self, event: EventId, values: impl IntoIterator<Item = FieldValue>) -> Result<()> {
        self.events.emit(event, values)
    }

    pub fn read_event(&self, event: EventId) -> &[SmallVec<[FieldValue; INLINE_FIELDS]>] {
        self.events.read(event)
    }

    pub fn register_resource(&mut self, schema: ComponentSchema, initial: impl IntoIterator<Item = FieldValue>) -> Result<ResourceId> {
        self.resources.register_resource(schema, initial)
    }

    pub fn resource(&self, resource: ResourceId) -> Result<&[FieldValue]> {
        self.resources.resource(resource)
    }

    pub fn set_resource(&mut self, resource: ResourceId, values: impl IntoIterator<Item = FieldValue>) -> Result<()> {
        self.resources.set_resource(resource, values)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldOptions::default())
    }
}

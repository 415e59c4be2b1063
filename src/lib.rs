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

//! Archetype ECS core - archetype-based Entity Component System engine.
//!
//! Columnar storage grouped by exact component signature, a cached
//! archetype graph for O(1)-amortized structural moves, live queries that
//! grow as new archetypes appear, deferred mutation buffers, and a
//! deterministic phase scheduler driving a fixed-timestep loop.

pub mod archetype;
pub mod bitset;
pub mod command;
pub mod component;
pub mod directory;
pub mod entity;
pub mod error;
pub mod event_bus;
pub mod graph;
pub mod query;
pub mod resources;
pub mod schedule;
pub mod system;
pub mod time;
pub mod world;

pub use archetype::{Archetype, ArchetypeId};
pub use bitset::BitSet;
pub use command::DeferredBuffers;
pub use component::{ComponentId, ComponentRegistry, ComponentSchema, FieldValue, ScalarType};
pub use directory::EntityDirectory;
pub use entity::{EntityId, EntityLocation};
pub use error::{EcsError, Result};
pub use event_bus::{EventBus, EventId};
pub use graph::ArchetypeGraph;
pub use query::{QueryHandle, QueryRegistry};
pub use resources::{ResourceId, ResourceRegistry};
pub use schedule::Scheduler;
pub use system::{Phase, SystemConfig, SystemId};
pub use time::{FixedTime, Time};
pub use world::{World, WorldOptions};

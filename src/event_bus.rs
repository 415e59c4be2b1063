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

//! A thin, dynamically-schemed event channel. An event type is a
//! [`ComponentSchema`] registered up front; emitted events queue until the
//! next `clear` (the world calls this once per `update`).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::component::{ComponentSchema, FieldValue, INLINE_FIELDS};
use crate::error::{EcsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u32);

type EventPayload = SmallVec<[FieldValue; INLINE_FIELDS]>;

#[derive(Default)]
pub struct EventBus {
    schemas: Vec<ComponentSchema>,
    queues: FxHashMap<EventId, Vec<EventPayload>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_event(&mut self, schema: ComponentSchema) -> EventId {
        let id = EventId(self.schemas.len() as u32);
        self.schemas.push(schema);
        self.queues.insert(id, Vec::new());
        id
    }

    fn schema_of(&self, event: EventId) -> Result<&ComponentSchema> {
        self.schemas
            .get(event.0 as usize)
            .ok_or(EcsError::InvalidOperation(format!("unknown event id {}", event.0)))
    }

    /// Queue an occurrence of `event` with `values` matching its schema's
    /// field order.
    pub fn emit(&mut self, event: EventId, values: impl IntoIterator<Item = FieldValue>) -> Result<()> {
        let schema = self.schema_of(event)?;
        let payload: EventPayload = values.into_iter().collect();
        if payload.len() != schema.field_count() {
            return Err(EcsError::InvalidOperation(format!(
                "event {} expects {} fields, got {}",
                event.0,
                schema.field_count(),
                payload.len()
            )));
        }
        self.queues.get_mut(&event).unwrap().push(payload);
        Ok(())
    }

    /// Every occurrence queued for `event` since the last clear.
    pub fn read(&self, event: EventId) -> &[EventPayload] {
        self.queues.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self, event: EventId) -> usize {
        self.read(event).len()
    }

    /// Drop every queued occurrence of every event. Called once per
    /// `World::update`.
    pub fn clear(&mut self) {
        for queue in self.queues.values_mut() {
            queue.clear();
        }
    }
}

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

//! Typed-singleton resources, generalizing the world's old
//! `AHashMap<TypeId, Box<dyn Any>>` to the dynamic field-schema model: a
//! resource is a named set of scalar fields registered once with an initial
//! value, then read or replaced wholesale.

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::component::{ComponentSchema, FieldValue, INLINE_FIELDS};
use crate::error::{EcsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u32);

type ResourceValues = SmallVec<[FieldValue; INLINE_FIELDS]>;

struct ResourceSlot {
    schema: ComponentSchema,
    values: ResourceValues,
}

#[derive(Default)]
pub struct ResourceRegistry {
    next_id: u32,
    slots: AHashMap<ResourceId, ResourceSlot>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with its schema and initial values, returning a
    /// handle for later reads/writes.
    pub fn register_resource(
        &mut self,
        schema: ComponentSchema,
        initial: impl IntoIterator<Item = FieldValue>,
    ) -> Result<ResourceId> {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        let values: ResourceValues = initial.into_iter().collect();
        if values.len() != schema.field_count() {
            return Err(EcsError::InvalidOperation(format!(
                "resource expects {} fields, got {}",
                schema.field_count(),
                values.len()
            )));
        }
        self.slots.insert(id, ResourceSlot { schema, values });
        Ok(id)
    }

    fn slot(&self, resource: ResourceId) -> Result<&ResourceSlot> {
        self.slots
            .get(&resource)
            .ok_or(EcsError::InvalidOperation(format!("unknown resource id {}", resource.0)))
    }

    pub fn resource(&self, resource: ResourceId) -> Result<&[FieldValue]> {
        Ok(&self.slot(resource)?.values)
    }

    pub fn set_resource(&mut self, resource: ResourceId, values: impl IntoIterator<Item = FieldValue>) -> Result<()> {
        let field_count = self.slot(resource)?.schema.field_count();
        let values: ResourceValues = values.into_iter().collect();
        if values.len() != field_count {
            return Err(EcsError::InvalidOperation(format!(
                "resource expects {} fields, got {}",
                field_count,
                values.len()
            )));
        }
        self.slots.get_mut(&resource).unwrap().values = values;
        Ok(())
    }

    pub fn field_index(&self, resource: ResourceId, name: &str) -> Result<Option<usize>> {
        Ok(self.slot(resource)?.schema.field_index(name))
    }
}

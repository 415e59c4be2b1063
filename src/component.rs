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

//! Component schema registry.
//!
//! Components here are not Rust types: a schema is registered at runtime as
//! an ordered list of named scalar fields. A schema with zero fields is a
//! tag; its presence shapes the archetype signature but stores no data.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{EcsError, Result};

/// Small inline capacity for a schema's field list; most components carry a
/// handful of scalars (position, velocity, color, ...).
pub const INLINE_FIELDS: usize = 8;

/// Scalar field type understood by the archetype's column storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    F32,
    F64,
    I8,
    I16,
    I32,
    U8,
    U16,
    U32,
}

/// A single scalar value, tagged by type, used when writing or reading a
/// component's fields by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    F32(f32),
    F64(f64),
    I8(i8),
    I16(i16),
    I32(i32),
    U8(u8),
    U16(u16),
    U32(u32),
}

impl FieldValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            FieldValue::F32(_) => ScalarType::F32,
            FieldValue::F64(_) => ScalarType::F64,
            FieldValue::I8(_) => ScalarType::I8,
            FieldValue::I16(_) => ScalarType::I16,
            FieldValue::I32(_) => ScalarType::I32,
            FieldValue::U8(_) => ScalarType::U8,
            FieldValue::U16(_) => ScalarType::U16,
            FieldValue::U32(_) => ScalarType::U32,
        }
    }
}

/// Dense, zero-based id assigned at registration. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An ordered list of (field_name, scalar_type) pairs. Zero fields means the
/// component is a tag.
#[derive(Debug, Clone)]
pub struct ComponentSchema {
    pub(crate) field_names: SmallVec<[Box<str>; INLINE_FIELDS]>,
    pub(crate) field_types: SmallVec<[ScalarType; INLINE_FIELDS]>,
    name_to_index: FxHashMap<Box<str>, usize>,
}

impl ComponentSchema {
    pub fn new(fields: impl IntoIterator<Item = (impl Into<Box<str>>, ScalarType)>) -> Self {
        let mut field_names = SmallVec::new();
        let mut field_types = SmallVec::new();
        let mut name_to_index = FxHashMap::default();
        for (i, (name, ty)) in fields.into_iter().enumerate() {
            let name: Box<str> = name.into();
            name_to_index.insert(name.clone(), i);
            field_names.push(name);
            field_types.push(ty);
        }
        Self {
            field_names,
            field_types,
            name_to_index,
        }
    }

    /// A schema with no fields: a tag component.
    pub fn tag() -> Self {
        Self::new(std::iter::empty::<(&str, ScalarType)>())
    }

    pub fn is_tag(&self) -> bool {
        self.field_names.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.field_names.len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn field_type(&self, index: usize) -> Option<ScalarType> {
        self.field_types.get(index).copied()
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.field_names.get(index).map(|b| b.as_ref())
    }
}

/// Registry of component schemas, indexed by dense `ComponentId`.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    schemas: Vec<ComponentSchema>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, returning its freshly allocated id. Ids are dense,
    /// zero-based, and never reused.
    pub fn register(&mut self, schema: ComponentSchema) -> ComponentId {
        let id = ComponentId(self.schemas.len() as u32);
        self.schemas.push(schema);
        id
    }

    pub fn schema_of(&self, id: ComponentId) -> Result<&ComponentSchema> {
        self.schemas
            .get(id.index())
            .ok_or(EcsError::UnknownComponent(id))
    }

    pub fn is_tag(&self, id: ComponentId) -> Result<bool> {
        Ok(self.schema_of(id)?.is_tag())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

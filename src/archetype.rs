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

//! Archetype storage: dense Structure-of-Arrays rows, keyed by signature.

use rustc_hash::FxHashMap;

use crate::bitset::BitSet;
use crate::component::{ComponentId, ComponentRegistry, FieldValue, ScalarType};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};

/// Index of an archetype within the graph's flat vector.
pub type ArchetypeId = usize;

/// Sentinel returned by `remove_row` when the removed row was the tail row
/// (no entity was swapped into its place).
pub const NO_SWAP: Option<EntityId> = None;

/// Cached transition to a neighboring archetype one component away.
#[derive(Debug, Clone, Default)]
pub struct Edge {
    pub target_on_add: Option<ArchetypeId>,
    pub target_on_remove: Option<ArchetypeId>,
    /// Column index in this archetype for each column of the add target, or
    /// `-1` if the column is new to the target.
    pub add_column_map: Option<Vec<isize>>,
    /// Column index in this archetype for each column of the remove target.
    pub remove_column_map: Option<Vec<isize>>,
}

/// A single typed, densely packed field column.
#[derive(Debug, Clone)]
pub enum Column {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

macro_rules! column_dispatch {
    ($self:expr, $var:ident => $body:expr) => {
        match $self {
            Column::F32($var) => $body,
            Column::F64($var) => $body,
            Column::I8($var) => $body,
            Column::I16($var) => $body,
            Column::I32($var) => $body,
            Column::U8($var) => $body,
            Column::U16($var) => $body,
            Column::U32($var) => $body,
        }
    };
}

impl Column {
    pub fn new(ty: ScalarType) -> Self {
        match ty {
            ScalarType::F32 => Column::F32(Vec::new()),
            ScalarType::F64 => Column::F64(Vec::new()),
            ScalarType::I8 => Column::I8(Vec::new()),
            ScalarType::I16 => Column::I16(Vec::new()),
            ScalarType::I32 => Column::I32(Vec::new()),
            ScalarType::U8 => Column::U8(Vec::new()),
            ScalarType::U16 => Column::U16(Vec::new()),
            ScalarType::U32 => Column::U32(Vec::new()),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Column::F32(_) => ScalarType::F32,
            Column::F64(_) => ScalarType::F64,
            Column::I8(_) => ScalarType::I8,
            Column::I16(_) => ScalarType::I16,
            Column::I32(_) => ScalarType::I32,
            Column::U8(_) => ScalarType::U8,
            Column::U16(_) => ScalarType::U16,
            Column::U32(_) => ScalarType::U32,
        }
    }

    pub fn len(&self) -> usize {
        column_dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push a zero value, growing the column by one row.
    pub fn push_zero(&mut self) {
        match self {
            Column::F32(v) => v.push(0.0),
            Column::F64(v) => v.push(0.0),
            Column::I8(v) => v.push(0),
            Column::I16(v) => v.push(0),
            Column::I32(v) => v.push(0),
            Column::U8(v) => v.push(0),
            Column::U16(v) => v.push(0),
            Column::U32(v) => v.push(0),
        }
    }

    /// Swap-remove `row` at the column level (mirrors `Vec::swap_remove`).
    pub fn swap_remove(&mut self, row: usize) {
        column_dispatch!(self, v => { v.swap_remove(row); })
    }

    pub fn write(&mut self, row: usize, value: FieldValue) -> Result<()> {
        match (self, value) {
            (Column::F32(v), FieldValue::F32(x)) => v[row] = x,
            (Column::F64(v), FieldValue::F64(x)) => v[row] = x,
            (Column::I8(v), FieldValue::I8(x)) => v[row] = x,
            (Column::I16(v), FieldValue::I16(x)) => v[row] = x,
            (Column::I32(v), FieldValue::I32(x)) => v[row] = x,
            (Column::U8(v), FieldValue::U8(x)) => v[row] = x,
            (Column::U16(v), FieldValue::U16(x)) => v[row] = x,
            (Column::U32(v), FieldValue::U32(x)) => v[row] = x,
            (col, value) => {
                return Err(EcsError::InvalidOperation(format!(
                    "field type mismatch: column is {:?}, value is {:?}",
                    col.scalar_type(),
                    value.scalar_type()
                )))
            }
        }
        Ok(())
    }

    pub fn read(&self, row: usize) -> FieldValue {
        match self {
            Column::F32(v) => FieldValue::F32(v[row]),
            Column::F64(v) => FieldValue::F64(v[row]),
            Column::I8(v) => FieldValue::I8(v[row]),
            Column::I16(v) => FieldValue::I16(v[row]),
            Column::I32(v) => FieldValue::I32(v[row]),
            Column::U8(v) => FieldValue::U8(v[row]),
            Column::U16(v) => FieldValue::U16(v[row]),
            Column::U32(v) => FieldValue::U32(v[row]),
        }
    }

    /// Copy the value at `src_row` of `src` into `row` of `self`. Only ever
    /// called on matched `(component, field)` pairs, so the scalar types
    /// line up.
    fn copy_from(&mut self, row: usize, src: &Column, src_row: usize) {
        match (self, src) {
            (Column::F32(dst), Column::F32(s)) => dst[row] = s[src_row],
            (Column::F64(dst), Column::F64(s)) => dst[row] = s[src_row],
            (Column::I8(dst), Column::I8(s)) => dst[row] = s[src_row],
            (Column::I16(dst), Column::I16(s)) => dst[row] = s[src_row],
            (Column::I32(dst), Column::I32(s)) => dst[row] = s[src_row],
            (Column::U8(dst), Column::U8(s)) => dst[row] = s[src_row],
            (Column::U16(dst), Column::U16(s)) => dst[row] = s[src_row],
            (Column::U32(dst), Column::U32(s)) => dst[row] = s[src_row],
            _ => unreachable!("copy_from called across mismatched scalar types"),
        }
    }
}

/// Where a component's fields begin within the flattened column list, and
/// how many columns it occupies.
#[derive(Debug, Clone, Copy)]
struct ComponentLayout {
    base: usize,
    field_count: usize,
}

/// Dense Structure-of-Arrays row store for every entity sharing a signature.
pub struct Archetype {
    signature: BitSet,
    entities: Vec<EntityId>,
    columns: Vec<Column>,
    layout: FxHashMap<ComponentId, ComponentLayout>,
    edges: FxHashMap<ComponentId, Edge>,
}

impl Archetype {
    /// Build an archetype for `signature`, allocating one column per
    /// non-tag field of every component in `components` (already the exact
    /// members of `signature`, in a stable order).
    pub fn new(
        signature: BitSet,
        components: &[ComponentId],
        registry: &ComponentRegistry,
    ) -> Result<Self> {
        let mut columns = Vec::new();
        let mut layout = FxHashMap::default();
        for &component in components {
            let schema = registry.schema_of(component)?;
            let base = columns.len();
            for i in 0..schema.field_count() {
                let ty = schema.field_type(i).expect("field index in range");
                columns.push(Column::new(ty));
            }
            layout.insert(
                component,
                ComponentLayout {
                    base,
                    field_count: schema.field_count(),
                },
            );
        }
        Ok(Self {
            signature,
            entities: Vec::new(),
            columns,
            layout,
            edges: FxHashMap::default(),
        })
    }

    pub fn signature(&self) -> &BitSet {
        &self.signature
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn has_component(&self, component: ComponentId) -> bool {
        self.layout.contains_key(&component)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Append `id`'s row, zero-initializing every column. Returns the row.
    pub fn add_entity(&mut self, id: EntityId) -> usize {
        let row = self.entities.len();
        self.entities.push(id);
        for column in &mut self.columns {
            column.push_zero();
        }
        row
    }

    /// Swap-and-pop `row`. Returns the entity swapped into `row`, if any.
    pub fn remove_row(&mut self, row: usize) -> Option<EntityId> {
        debug_assert!(row < self.entities.len());
        let last = self.entities.len() - 1;
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        if row == last {
            NO_SWAP
        } else {
            Some(self.entities[row])
        }
    }

    fn layout_of(&self, component: ComponentId) -> Option<ComponentLayout> {
        self.layout.get(&component).copied()
    }

    /// Store `values` into `component`'s fields at `row`, in schema field
    /// order. A no-op for tag components (zero fields).
    pub fn write_fields(
        &mut self,
        row: usize,
        component: ComponentId,
        values: &[FieldValue],
    ) -> Result<()> {
        let Some(layout) = self.layout_of(component) else {
            return Err(EcsError::InvalidOperation(format!(
                "component {component:?} is not present in this archetype"
            )));
        };
        if values.len() != layout.field_count {
            return Err(EcsError::InvalidOperation(format!(
                "component {component:?} expects {} fields, got {}",
                layout.field_count,
                values.len()
            )));
        }
        for (i, value) in values.iter().enumerate() {
            self.columns[layout.base + i].write(row, *value)?;
        }
        Ok(())
    }

    /// Direct view of a single field's column for a component present here.
    pub fn get_column(&self, component: ComponentId, field: usize) -> Option<&Column> {
        let layout = self.layout_of(component)?;
        if field >= layout.field_count {
            return None;
        }
        self.columns.get(layout.base + field)
    }

    pub fn get_column_mut(&mut self, component: ComponentId, field: usize) -> Option<&mut Column> {
        let layout = self.layout_of(component)?;
        if field >= layout.field_count {
            return None;
        }
        self.columns.get_mut(layout.base + field)
    }

    /// Copy every field of every component present in both archetypes from
    /// `src`'s `src_row` into `self`'s `dst_row`.
    pub fn copy_shared_from(&mut self, src: &Archetype, src_row: usize, dst_row: usize) {
        for (&component, &dst_layout) in &self.layout {
            let Some(src_layout) = src.layout.get(&component).copied() else {
                continue;
            };
            for i in 0..dst_layout.field_count.min(src_layout.field_count) {
                let src_col = &src.columns[src_layout.base + i];
                self.columns[dst_layout.base + i].copy_from(dst_row, src_col, src_row);
            }
        }
    }

    /// Fused move: append a new row to `self`, populate it from `src` using
    /// `transition_map` (one entry per column of `self`; `-1` means "new,
    /// leave zero"), then remove `src_row` from `src`.
    ///
    /// Returns `(new_row, swapped_entity)`.
    pub fn move_from(
        &mut self,
        src: &mut Archetype,
        src_row: usize,
        id: EntityId,
        transition_map: &[isize],
    ) -> (usize, Option<EntityId>) {
        let new_row = self.add_entity(id);
        for (j, column) in self.columns.iter_mut().enumerate() {
            let src_index = transition_map[j];
            if src_index >= 0 {
                let src_col = &src.columns[src_index as usize];
                column.copy_from(new_row, src_col, src_row);
            }
        }
        let swapped = src.remove_row(src_row);
        (new_row, swapped)
    }

    /// Build the transition map from `src` to `self`: for each of `self`'s
    /// columns, the matching column index in `src`, or `-1` if new.
    pub fn build_transition_map(&self, src: &Archetype) -> Vec<isize> {
        let mut map = vec![-1isize; self.columns.len()];
        for (&component, &dst_layout) in &self.layout {
            if let Some(src_layout) = src.layout.get(&component).copied() {
                for i in 0..dst_layout.field_count.min(src_layout.field_count) {
                    map[dst_layout.base + i] = (src_layout.base + i) as isize;
                }
            }
        }
        map
    }

    pub fn get_edge(&self, component: ComponentId) -> Option<&Edge> {
        self.edges.get(&component)
    }

    pub fn set_edge(&mut self, component: ComponentId, edge: Edge) {
        self.edges.insert(component, edge);
    }

    pub fn edge_or_default(&mut self, component: ComponentId) -> &mut Edge {
        self.edges.entry(component).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentSchema, ScalarType};

    fn make_registry() -> (ComponentRegistry, ComponentId, ComponentId) {
        let mut reg = ComponentRegistry::new();
        let pos = reg.register(ComponentSchema::new([
            ("x", ScalarType::F32),
            ("y", ScalarType::F32),
        ]));
        let tag = reg.register(ComponentSchema::tag());
        (reg, pos, tag)
    }

    #[test]
    fn add_entity_zero_initializes_columns() {
        let (reg, pos, _tag) = make_registry();
        let mut sig = BitSet::new();
        sig.set(pos.index());
        let mut arch = Archetype::new(sig, &[pos], &reg).unwrap();
        let e = EntityId::pack(0, 0).unwrap();
        let row = arch.add_entity(e);
        assert_eq!(row, 0);
        assert_eq!(
            arch.get_column(pos, 0).unwrap().read(0),
            FieldValue::F32(0.0)
        );
    }

    #[test]
    fn write_and_read_fields() {
        let (reg, pos, _tag) = make_registry();
        let mut sig = BitSet::new();
        sig.set(pos.index());
        let mut arch = Archetype::new(sig, &[pos], &reg).unwrap();
        let e = EntityId::pack(0, 0).unwrap();
        let row = arch.add_entity(e);
        arch.write_fields(row, pos, &[FieldValue::F32(1.0), FieldValue::F32(2.0)])
            .unwrap();
        assert_eq!(
            arch.get_column(pos, 0).unwrap().read(row),
            FieldValue::F32(1.0)
        );
        assert_eq!(
            arch.get_column(pos, 1).unwrap().read(row),
            FieldValue::F32(2.0)
        );
    }

    #[test]
    fn remove_row_swaps_tail_in() {
        let (reg, pos, _tag) = make_registry();
        let mut sig = BitSet::new();
        sig.set(pos.index());
        let mut arch = Archetype::new(sig, &[pos], &reg).unwrap();
        let e0 = EntityId::pack(0, 0).unwrap();
        let e1 = EntityId::pack(1, 0).unwrap();
        let e2 = EntityId::pack(2, 0).unwrap();
        arch.add_entity(e0);
        arch.add_entity(e1);
        arch.add_entity(e2);

        let swapped = arch.remove_row(0);
        assert_eq!(swapped, Some(e2));
        assert_eq!(arch.entities(), &[e2, e1]);
    }

    #[test]
    fn remove_tail_row_reports_no_swap() {
        let (reg, pos, _tag) = make_registry();
        let mut sig = BitSet::new();
        sig.set(pos.index());
        let mut arch = Archetype::new(sig, &[pos], &reg).unwrap();
        let e0 = EntityId::pack(0, 0).unwrap();
        arch.add_entity(e0);
        assert_eq!(arch.remove_row(0), NO_SWAP);
    }

    #[test]
    fn move_from_uses_transition_map_and_leaves_new_fields_zero() {
        let mut reg = ComponentRegistry::new();
        let pos = reg.register(ComponentSchema::new([("x", ScalarType::F32)]));
        let vel = reg.register(ComponentSchema::new([("dx", ScalarType::F32)]));

        let mut src_sig = BitSet::new();
        src_sig.set(pos.index());
        let mut src = Archetype::new(src_sig, &[pos], &reg).unwrap();

        let mut dst_sig = BitSet::new();
        dst_sig.set(pos.index());
        dst_sig.set(vel.index());
        let mut dst = Archetype::new(dst_sig, &[pos, vel], &reg).unwrap();

        let e = EntityId::pack(0, 0).unwrap();
        let row = src.add_entity(e);
        src.write_fields(row, pos, &[FieldValue::F32(9.0)]).unwrap();

        let map = dst.build_transition_map(&src);
        let (new_row, swapped) = dst.move_from(&mut src, row, e, &map);
        assert_eq!(new_row, 0);
        assert_eq!(swapped, NO_SWAP);
        assert_eq!(
            dst.get_column(pos, 0).unwrap().read(0),
            FieldValue::F32(9.0)
        );
        assert_eq!(
            dst.get_column(vel, 0).unwrap().read(0),
            FieldValue::F32(0.0)
        );
        assert!(src.is_empty());
    }

    #[test]
    fn tag_only_archetype_has_no_columns() {
        let (reg, _pos, tag) = make_registry();
        let mut sig = BitSet::new();
        sig.set(tag.index());
        let arch = Archetype::new(sig, &[tag], &reg).unwrap();
        assert_eq!(arch.column_count(), 0);
    }
}

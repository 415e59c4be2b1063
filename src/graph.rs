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

//! The archetype graph: every archetype created so far, deduplicated by
//! signature, plus cached add/remove edges between neighbors one component
//! apart.

use ahash::AHashMap;
use rustc_hash::FxHashMap;

use crate::archetype::{Archetype, ArchetypeId, Edge};
use crate::bitset::BitSet;
use crate::component::{ComponentId, ComponentRegistry};
use crate::entity::EntityId;
use crate::error::Result;
use crate::query::QueryRegistry;

/// Owns every archetype ever created. Archetypes are never removed, even
/// when emptied, because cached edges reference them by id.
pub struct ArchetypeGraph {
    archetypes: Vec<Archetype>,
    by_signature: AHashMap<BitSet, ArchetypeId>,
    /// Inverted index: component -> every archetype whose signature contains it.
    by_component: FxHashMap<ComponentId, Vec<ArchetypeId>>,
}

impl Default for ArchetypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchetypeGraph {
    /// A fresh graph with only the always-present empty archetype.
    pub fn new() -> Self {
        let empty = Archetype::new(BitSet::new(), &[], &ComponentRegistry::new())
            .expect("empty signature never fails to build");
        let mut by_signature = AHashMap::new();
        by_signature.insert(BitSet::new(), 0);
        Self {
            archetypes: vec![empty],
            by_signature,
            by_component: FxHashMap::default(),
        }
    }

    pub const EMPTY: ArchetypeId = 0;

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id)
    }

    pub fn archetype_mut(&mut self, id: ArchetypeId) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the empty archetype always exists
    }

    fn components_of(signature: &BitSet) -> Vec<ComponentId> {
        signature.ones().map(|i| ComponentId(i as u32)).collect()
    }

    /// Look up or allocate the archetype for `signature`, notifying every
    /// registered query the moment it's created.
    pub fn get_or_create(
        &mut self,
        signature: BitSet,
        components: &[ComponentId],
        registry: &ComponentRegistry,
        queries: &mut QueryRegistry,
    ) -> Result<ArchetypeId> {
        if let Some(&id) = self.by_signature.get(&signature) {
            return Ok(id);
        }
        let archetype = Archetype::new(signature.clone(), components, registry)?;
        let id = self.archetypes.len();
        self.archetypes.push(archetype);
        self.by_signature.insert(signature.clone(), id);
        for &component in components {
            self.by_component.entry(component).or_default().push(id);
        }
        queries.notify_new_archetype(id, &signature);
        Ok(id)
    }

    fn two_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b);
        if a < b {
            let (left, right) = self.archetypes.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    /// The archetype reached from `arch` by adding `component`, resolving
    /// and caching the edge on first use.
    pub fn resolve_add(
        &mut self,
        arch: ArchetypeId,
        component: ComponentId,
        registry: &ComponentRegistry,
        queries: &mut QueryRegistry,
    ) -> Result<ArchetypeId> {
        if self.archetypes[arch].has_component(component) {
            return Ok(arch);
        }
        if let Some(edge) = self.archetypes[arch].get_edge(component) {
            if let Some(target) = edge.target_on_add {
                return Ok(target);
            }
        }

        let target_signature = self.archetypes[arch].signature().union(&{
            let mut b = BitSet::new();
            b.set(component.index());
            b
        });
        let target_components = Self::components_of(&target_signature);
        let target = self.get_or_create(target_signature, &target_components, registry, queries)?;

        let (add_map, remove_map) = {
            let (src, dst) = self.two_mut(arch, target);
            (dst.build_transition_map(src), src.build_transition_map(dst))
        };

        self.archetypes[arch].edge_or_default(component).target_on_add = Some(target);
        self.archetypes[arch].edge_or_default(component).add_column_map = Some(add_map);
        self.archetypes[target].edge_or_default(component).target_on_remove = Some(arch);
        self.archetypes[target].edge_or_default(component).remove_column_map = Some(remove_map);

        Ok(target)
    }

    /// The archetype reached from `arch` by removing `component`.
    pub fn resolve_remove(
        &mut self,
        arch: ArchetypeId,
        component: ComponentId,
        registry: &ComponentRegistry,
        queries: &mut QueryRegistry,
    ) -> Result<ArchetypeId> {
        if !self.archetypes[arch].has_component(component) {
            return Ok(arch);
        }
        if let Some(edge) = self.archetypes[arch].get_edge(component) {
            if let Some(target) = edge.target_on_remove {
                return Ok(target);
            }
        }

        let target_signature = self.archetypes[arch].signature().difference(&{
            let mut b = BitSet::new();
            b.set(component.index());
            b
        });
        let target_components = Self::components_of(&target_signature);
        let target = self.get_or_create(target_signature, &target_components, registry, queries)?;

        let (remove_map, add_map) = {
            let (src, dst) = self.two_mut(arch, target);
            (dst.build_transition_map(src), src.build_transition_map(dst))
        };

        self.archetypes[arch].edge_or_default(component).target_on_remove = Some(target);
        self.archetypes[arch].edge_or_default(component).remove_column_map = Some(remove_map);
        self.archetypes[target].edge_or_default(component).target_on_add = Some(arch);
        self.archetypes[target].edge_or_default(component).add_column_map = Some(add_map);

        Ok(target)
    }

    /// Apply a fused move of `id` from row `from_row` of `from` to `to`,
    /// using a transition map already resolved by `resolve_add`/
    /// `resolve_remove`. Exists so callers outside this module never need
    /// `two_mut`'s disjoint-borrow trick directly.
    pub fn move_row(
        &mut self,
        from: ArchetypeId,
        to: ArchetypeId,
        from_row: usize,
        id: EntityId,
        transition_map: &[isize],
    ) -> (usize, Option<EntityId>) {
        let (src, dst) = self.two_mut(from, to);
        dst.move_from(src, from_row, id, transition_map)
    }

    /// Get the add-edge's cached transition map and target, if already
    /// resolved. Used by `World` to apply a fused `move_from` without
    /// recomputing anything.
    pub fn cached_add_edge(&self, arch: ArchetypeId, component: ComponentId) -> Option<&Edge> {
        self.archetypes.get(arch)?.get_edge(component)
    }

    pub fn cached_remove_edge(&self, arch: ArchetypeId, component: ComponentId) -> Option<&Edge> {
        self.archetypes.get(arch)?.get_edge(component)
    }

    /// Archetypes matching `(include, exclude?, any_of?)`.
    pub fn matching_archetypes(
        &self,
        include: &BitSet,
        exclude: Option<&BitSet>,
        any_of: Option<&BitSet>,
    ) -> Vec<ArchetypeId> {
        let predicate = |id: &ArchetypeId| {
            let signature = self.archetypes[*id].signature();
            if !include.is_subset(signature) {
                return false;
            }
            if let Some(exclude) = exclude {
                if signature.intersects(exclude) {
                    return false;
                }
            }
            if let Some(any_of) = any_of {
                if !signature.intersects(any_of) {
                    return false;
                }
            }
            true
        };

        if include.is_empty() {
            return (0..self.archetypes.len()).filter(predicate).collect();
        }

        let smallest = include
            .ones()
            .filter_map(|bit| self.by_component.get(&ComponentId(bit as u32)))
            .min_by_key(|candidates| candidates.len());

        match smallest {
            Some(candidates) => candidates.iter().copied().filter(predicate).collect(),
            None => Vec::new(),
        }
    }
}

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

//! Live, cached queries over the archetype graph.
//!
//! A query's matching-archetype list is a shared mutable object: the graph
//! pushes onto it the moment a newly created archetype satisfies the query's
//! masks, instead of the query lazily catching up on next iteration.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::archetype::ArchetypeId;
use crate::bitset::BitSet;
use crate::graph::ArchetypeGraph;

struct QueryState {
    include: BitSet,
    exclude: Option<BitSet>,
    any_of: Option<BitSet>,
    archetypes: RefCell<Vec<ArchetypeId>>,
}

impl QueryState {
    fn matches(&self, signature: &BitSet) -> bool {
        if !self.include.is_subset(signature) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if signature.intersects(exclude) {
                return false;
            }
        }
        if let Some(any_of) = &self.any_of {
            if !signature.intersects(any_of) {
                return false;
            }
        }
        true
    }
}

/// A handle to a registered, live-updating query.
///
/// Cloning a handle is cheap (it clones the `Rc`); clones refer to the same
/// underlying archetype list.
#[derive(Clone)]
pub struct QueryHandle {
    state: Rc<QueryState>,
}

impl QueryHandle {
    /// Total archetypes currently matched, including empty ones.
    pub fn archetype_count(&self) -> usize {
        self.state.archetypes.borrow().len()
    }

    /// Matched archetypes with at least one row, in registration order.
    pub fn iter_matching(&self, graph: &ArchetypeGraph) -> Vec<ArchetypeId> {
        self.state
            .archetypes
            .borrow()
            .iter()
            .copied()
            .filter(|&id| graph.archetype(id).map(|a| a.len() > 0).unwrap_or(false))
            .collect()
    }

    /// All matched archetypes, including empty ones.
    pub fn matching_archetypes(&self) -> Vec<ArchetypeId> {
        self.state.archetypes.borrow().clone()
    }
}

/// Hashes the three masks together with distinct multipliers (xor-combine)
/// so that equal mask triples land in the same bucket and an exact match is
/// resolved by `Eq` on collision, the same probing a `HashMap` already does
/// internally, just with an explicit combining rule for the compound key.
#[derive(Clone, PartialEq, Eq)]
struct QueryKey {
    include: BitSet,
    exclude: Option<BitSet>,
    any_of: Option<BitSet>,
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        const EXCLUDE_MULTIPLIER: u64 = 0x9E3779B97F4A7C15;
        const ANY_OF_MULTIPLIER: u64 = 0xC2B2AE3D27D4EB4F;

        let mut combined = {
            let mut h = rustc_hash::FxHasher::default();
            self.include.hash(&mut h);
            h.finish()
        };
        if let Some(exclude) = &self.exclude {
            let mut h = rustc_hash::FxHasher::default();
            exclude.hash(&mut h);
            combined ^= h.finish().wrapping_mul(EXCLUDE_MULTIPLIER);
        }
        if let Some(any_of) = &self.any_of {
            let mut h = rustc_hash::FxHasher::default();
            any_of.hash(&mut h);
            combined ^= h.finish().wrapping_mul(ANY_OF_MULTIPLIER);
        }
        combined.hash(state);
    }
}

/// Registry of every live query, keyed by its mask triple so repeated or
/// composed requests for the same masks return the same handle.
#[derive(Default)]
pub struct QueryRegistry {
    cache: FxHashMap<QueryKey, Rc<QueryState>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a query for the given masks, creating and seeding it on
    /// first request.
    pub fn get_or_create(
        &mut self,
        include: BitSet,
        exclude: Option<BitSet>,
        any_of: Option<BitSet>,
        graph: &ArchetypeGraph,
    ) -> QueryHandle {
        let key = QueryKey {
            include: include.clone(),
            exclude: exclude.clone(),
            any_of: any_of.clone(),
        };
        if let Some(existing) = self.cache.get(&key) {
            return QueryHandle {
                state: existing.clone(),
            };
        }

        let seeded = graph.matching_archetypes(&include, exclude.as_ref(), any_of.as_ref());
        let state = Rc::new(QueryState {
            include,
            exclude,
            any_of,
            archetypes: RefCell::new(seeded),
        });
        self.cache.insert(key, state.clone());
        QueryHandle { state }
    }

    /// Called by the archetype graph immediately after a new archetype is
    /// created: push it onto every query it satisfies.
    pub fn notify_new_archetype(&mut self, id: ArchetypeId, signature: &BitSet) {
        for state in self.cache.values() {
            if state.matches(signature) {
                state.archetypes.borrow_mut().push(id);
            }
        }
    }

    /// Return a handle matching `handle`'s masks plus an extra include bit.
    pub fn and(&mut self, handle: &QueryHandle, extra_include: &BitSet, graph: &ArchetypeGraph) -> QueryHandle {
        let include = handle.state.include.union(extra_include);
        self.get_or_create(
            include,
            handle.state.exclude.clone(),
            handle.state.any_of.clone(),
            graph,
        )
    }

    /// Return a handle matching `handle`'s masks plus an extra exclude bit.
    pub fn not(&mut self, handle: &QueryHandle, extra_exclude: &BitSet, graph: &ArchetypeGraph) -> QueryHandle {
        let exclude = match &handle.state.exclude {
            Some(existing) => existing.union(extra_exclude),
            None => extra_exclude.clone(),
        };
        self.get_or_create(
            handle.state.include.clone(),
            Some(exclude),
            handle.state.any_of.clone(),
            graph,
        )
    }

    /// Return a handle matching `handle`'s masks plus an extra any-of bit.
    pub fn any_of(&mut self, handle: &QueryHandle, extra_any_of: &BitSet, graph: &ArchetypeGraph) -> QueryHandle {
        let any_of = match &handle.state.any_of {
            Some(existing) => existing.union(extra_any_of),
            None => extra_any_of.clone(),
        };
        self.get_or_create(
            handle.state.include.clone(),
            handle.state.exclude.clone(),
            Some(any_of),
            graph,
        )
    }
}

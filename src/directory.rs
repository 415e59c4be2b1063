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

//! Entity directory: maps an entity index to its current archetype/row and
//! tracks liveness via a per-slot generation counter.

use crate::entity::{EntityId, EntityLocation, MAX_GENERATION, MAX_INDEX, UNASSIGNED};
use crate::error::{EcsError, Result};

/// The archetype id every fresh entity starts in before any component is
/// added. Mirrors `ArchetypeGraph::EMPTY`; kept as a bare constant here so
/// the directory doesn't need to depend on the graph module.
const EMPTY_ARCHETYPE: usize = 0;

/// Three parallel arrays indexed by entity index, plus a LIFO free list.
#[derive(Default)]
pub struct EntityDirectory {
    generation: Vec<u32>,
    archetype_id: Vec<usize>,
    row: Vec<usize>,
    free_list: Vec<u32>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id: reuse a freed slot if any, else grow the
    /// high-water mark. The new id is homed in the empty archetype with an
    /// unassigned row until the caller places it.
    pub fn create(&mut self) -> Result<EntityId> {
        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                let index = self.generation.len() as u32;
                if index > MAX_INDEX {
                    return Err(EcsError::Capacity(format!(
                        "entity index {index} exceeds {MAX_INDEX}"
                    )));
                }
                self.generation.push(0);
                self.archetype_id.push(EMPTY_ARCHETYPE);
                self.row.push(UNASSIGNED);
                index
            }
        };
        let generation = self.generation[index as usize];
        let id = EntityId::pack(index, generation)?;
        self.archetype_id[index as usize] = EMPTY_ARCHETYPE;
        self.row[index as usize] = UNASSIGNED;
        Ok(id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let index = id.index() as usize;
        self.generation
            .get(index)
            .is_some_and(|&g| g == id.generation())
    }

    fn ensure_alive(&self, id: EntityId) -> Result<usize> {
        if self.is_alive(id) {
            Ok(id.index() as usize)
        } else {
            Err(EcsError::EntityGone(id))
        }
    }

    pub fn location(&self, id: EntityId) -> Result<EntityLocation> {
        let index = self.ensure_alive(id)?;
        Ok(EntityLocation {
            archetype_id: self.archetype_id[index],
            row: self.row[index],
        })
    }

    pub fn archetype_of(&self, id: EntityId) -> Option<usize> {
        let index = id.index() as usize;
        self.is_alive(id).then(|| self.archetype_id[index])
    }

    pub fn row_of(&self, id: EntityId) -> Option<usize> {
        let index = id.index() as usize;
        self.is_alive(id).then(|| self.row[index])
    }

    /// Record that `id` now lives at `(archetype_id, row)`, e.g. after a
    /// structural move.
    pub fn set_location(&mut self, id: EntityId, archetype_id: usize, row: usize) {
        let index = id.index() as usize;
        self.archetype_id[index] = archetype_id;
        self.row[index] = row;
    }

    /// Update only the row for `index` (not a packed id), used when a
    /// swap-remove in some other entity's archetype relocates this one.
    pub fn relocate_row(&mut self, index: u32, row: usize) {
        self.row[index as usize] = row;
    }

    pub fn index_of(&self, id: EntityId) -> u32 {
        id.index()
    }

    /// Verify, clear, and recycle `id`'s slot. Returns the location it
    /// occupied just before destruction so the caller can remove its row
    /// from the owning archetype.
    pub fn destroy(&mut self, id: EntityId) -> Result<EntityLocation> {
        let index = self.ensure_alive(id)?;
        let location = EntityLocation {
            archetype_id: self.archetype_id[index],
            row: self.row[index],
        };
        self.archetype_id[index] = UNASSIGNED;
        self.row[index] = UNASSIGNED;
        self.generation[index] = (self.generation[index] + 1) % (MAX_GENERATION + 1);
        self.free_list.push(index as u32);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_starts_in_empty_archetype() {
        let mut dir = EntityDirectory::new();
        let id = dir.create().unwrap();
        assert!(dir.is_alive(id));
        assert_eq!(dir.archetype_of(id), Some(EMPTY_ARCHETYPE));
        assert_eq!(dir.row_of(id), Some(UNASSIGNED));
    }

    #[test]
    fn destroy_then_recreate_bumps_generation() {
        let mut dir = EntityDirectory::new();
        let id = dir.create().unwrap();
        dir.destroy(id).unwrap();
        assert!(!dir.is_alive(id));

        let recreated = dir.create().unwrap();
        assert_eq!(recreated.index(), id.index());
        assert_eq!(recreated.generation(), id.generation() + 1);
        assert!(!dir.is_alive(id));
        assert!(dir.is_alive(recreated));
    }

    #[test]
    fn destroy_dead_entity_is_entity_gone() {
        let mut dir = EntityDirectory::new();
        let id = dir.create().unwrap();
        dir.destroy(id).unwrap();
        let err = dir.destroy(id).unwrap_err();
        assert!(matches!(err, EcsError::EntityGone(_)));
    }

    #[test]
    fn generation_wraps_without_error() {
        let mut dir = EntityDirectory::new();
        let mut id = dir.create().unwrap();
        for _ in 0..=MAX_GENERATION + 5 {
            dir.destroy(id).unwrap();
            id = dir.create().unwrap();
        }
        assert!(dir.is_alive(id));
    }

    #[test]
    fn set_location_and_relocate_row() {
        let mut dir = EntityDirectory::new();
        let id = dir.create().unwrap();
        dir.set_location(id, 3, 5);
        assert_eq!(dir.location(id).unwrap(), EntityLocation {
            archetype_id: 3,
            row: 5,
        });
        dir.relocate_row(id.index(), 9);
        assert_eq!(dir.row_of(id), Some(9));
    }
}

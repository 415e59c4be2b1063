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

//! Entity identifiers and location metadata.
//!
//! An [`EntityId`] packs a slot index and a generation counter into a single
//! `u32` so identity and liveness travel together without a side table.

use crate::error::{EcsError, Result};

const INDEX_BITS: u32 = 20;
const GENERATION_BITS: u32 = 11;
pub(crate) const MAX_INDEX: u32 = (1 << INDEX_BITS) - 1;
pub(crate) const MAX_GENERATION: u32 = (1 << GENERATION_BITS) - 1;

/// Sentinel row/archetype value meaning "not placed yet".
pub const UNASSIGNED: usize = usize::MAX;

/// Packed (index, generation) entity identifier.
///
/// Two ids are equal iff both fields are equal. Liveness is external to the
/// id itself: `World`/`EntityDirectory` decides whether a given id's
/// generation still matches the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

impl EntityId {
    /// Pack `index` and `generation` into a single id.
    ///
    /// Fails with [`EcsError::Capacity`] if either field overflows its bit
    /// width (index ≥ 2^20 or generation ≥ 2^11).
    pub fn pack(index: u32, generation: u32) -> Result<Self> {
        if index > MAX_INDEX {
            return Err(EcsError::Capacity(format!(
                "entity index {index} exceeds {MAX_INDEX}"
            )));
        }
        if generation > MAX_GENERATION {
            return Err(EcsError::Capacity(format!(
                "entity generation {generation} exceeds {MAX_GENERATION}"
            )));
        }
        Ok(Self((generation << INDEX_BITS) | index))
    }

    /// Unpack into `(index, generation)`.
    pub fn unpack(self) -> (u32, u32) {
        (self.index(), self.generation())
    }

    /// The slot index component.
    pub fn index(self) -> u32 {
        self.0 & MAX_INDEX
    }

    /// The generation component.
    pub fn generation(self) -> u32 {
        self.0 >> INDEX_BITS
    }

    /// The raw packed representation, for logging and external identity.
    pub fn to_bits(self) -> u32 {
        self.0
    }
}

/// Entity location within an archetype: which archetype and which row.
///
/// A freshly created entity has no row until it is first placed (the
/// empty archetype is recorded immediately, so `archetype_id` is set but
/// `row` may briefly be `UNASSIGNED` on creation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: usize,
    pub row: usize,
}

impl EntityLocation {
    pub const UNASSIGNED: EntityLocation = EntityLocation {
        archetype_id: UNASSIGNED,
        row: UNASSIGNED,
    };
}

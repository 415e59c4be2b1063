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

//! Error types

use std::fmt;

use crate::component::ComponentId;
use crate::entity::EntityId;
use crate::system::SystemId;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// EntityId out of range, unregistered id lookup, unknown field name, or
    /// a component accessed on an entity that doesn't carry it.
    InvalidOperation(String),

    /// Operation targeted an id whose generation no longer matches the
    /// directory (the entity was destroyed, possibly reusing the slot).
    EntityGone(EntityId),

    /// Entity-index or entity-generation slot space exhausted.
    Capacity(String),

    /// Same system descriptor added to the same phase twice.
    DuplicateRegistration(SystemId),

    /// Topological sort could not place every system in a phase.
    SchedulingCycle(Vec<SystemId>),

    /// Requested component has no registered schema.
    UnknownComponent(ComponentId),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            EcsError::EntityGone(id) => write!(f, "entity {id:?} is no longer alive"),
            EcsError::Capacity(msg) => write!(f, "capacity exceeded: {msg}"),
            EcsError::DuplicateRegistration(id) => {
                write!(f, "system {id:?} already registered in this phase")
            }
            EcsError::SchedulingCycle(unscheduled) => {
                write!(f, "system dependency cycle among {unscheduled:?}")
            }
            EcsError::UnknownComponent(id) => write!(f, "component {id:?} is not registered"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

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

//! System descriptors and the phases they run in.

use crate::error::Result;
use crate::world::World;

/// Opaque id assigned to a system when it's added to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub(crate) u32);

/// The seven named execution stages a system can be scheduled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreStartup,
    Startup,
    PostStartup,
    FixedUpdate,
    PreUpdate,
    Update,
    PostUpdate,
}

impl Phase {
    pub const STARTUP_ORDER: [Phase; 3] = [Phase::PreStartup, Phase::Startup, Phase::PostStartup];
    pub const UPDATE_ORDER: [Phase; 3] = [Phase::PreUpdate, Phase::Update, Phase::PostUpdate];
}

/// The function a system runs: world access plus the delta time for this call.
pub type RunFn = Box<dyn FnMut(&mut World, f32) -> Result<()>>;
pub(crate) type HookFn = Box<dyn FnMut(&mut World) -> Result<()>>;

/// A system queued for registration: its run closure, name, and scheduling
/// constraints. Constraints naming a system in a different phase are ignored
/// by the scheduler.
pub struct SystemConfig {
    pub(crate) name: String,
    pub(crate) run: RunFn,
    pub(crate) before: Vec<String>,
    pub(crate) after: Vec<String>,
    pub(crate) on_added: Option<HookFn>,
    pub(crate) on_removed: Option<HookFn>,
    pub(crate) dispose: Option<HookFn>,
}

impl SystemConfig {
    pub fn new(name: impl Into<String>, run: impl FnMut(&mut World, f32) -> Result<()> + 'static) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
            before: Vec::new(),
            after: Vec::new(),
            on_added: None,
            on_removed: None,
            dispose: None,
        }
    }

    pub fn before(mut self, system: impl Into<String>) -> Self {
        self.before.push(system.into());
        self
    }

    pub fn after(mut self, system: impl Into<String>) -> Self {
        self.after.push(system.into());
        self
    }

    /// Run once when the system is added, before any phase executes it.
    pub fn on_added(mut self, hook: impl FnMut(&mut World) -> Result<()> + 'static) -> Self {
        self.on_added = Some(Box::new(hook));
        self
    }

    /// Run once when the system is unregistered or the world is disposed.
    pub fn on_removed(mut self, hook: impl FnMut(&mut World) -> Result<()> + 'static) -> Self {
        self.on_removed = Some(Box::new(hook));
        self
    }

    /// Run once at world shutdown, before `on_removed`.
    pub fn dispose(mut self, hook: impl FnMut(&mut World) -> Result<()> + 'static) -> Self {
        self.dispose = Some(Box::new(hook));
        self
    }
}

/// A registered system: the runnable closure plus its resolved constraints.
/// Lives inside the scheduler once added to a phase.
pub(crate) struct ScheduledSystem {
    pub(crate) id: SystemId,
    pub(crate) name: String,
    pub(crate) run: RunFn,
    pub(crate) before: Vec<String>,
    pub(crate) after: Vec<String>,
    pub(crate) on_removed: Option<HookFn>,
    pub(crate) dispose: Option<HookFn>,
}

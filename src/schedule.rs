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

//! Per-phase system scheduling: topological sort by explicit `before`/`after`
//! constraints, with insertion order breaking ties, and the fixed-timestep
//! loop that drives `FIXED_UPDATE`.

use std::collections::VecDeque;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::error::{EcsError, Result};
use crate::system::{HookFn, Phase, ScheduledSystem, SystemConfig, SystemId};
use crate::time::FixedTime;
use crate::world::World;

const PHASE_COUNT: usize = 7;

fn phase_slot(phase: Phase) -> usize {
    match phase {
        Phase::PreStartup => 0,
        Phase::Startup => 1,
        Phase::PostStartup => 2,
        Phase::FixedUpdate => 3,
        Phase::PreUpdate => 4,
        Phase::Update => 5,
        Phase::PostUpdate => 6,
    }
}

#[derive(Default)]
struct PhaseSchedule {
    systems: Vec<ScheduledSystem>,
    name_to_index: FxHashMap<String, usize>,
    sorted: Option<Vec<usize>>,
}

impl PhaseSchedule {
    fn invalidate(&mut self) {
        self.sorted = None;
    }

    /// Kahn's algorithm over explicit before/after edges local to this
    /// phase; constraints naming a system not present here are ignored.
    /// Ties break by insertion order (lower index first).
    fn topological_sort(&self) -> Result<Vec<usize>> {
        let n = self.systems.len();
        let mut before_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];

        for (i, system) in self.systems.iter().enumerate() {
            for name in &system.after {
                if let Some(&j) = self.name_to_index.get(name) {
                    before_edges[j].push(i);
                    in_degree[i] += 1;
                }
            }
            for name in &system.before {
                if let Some(&j) = self.name_to_index.get(name) {
                    before_edges[i].push(j);
                    in_degree[j] += 1;
                }
            }
        }

        // (0..n) is already ascending, so the initial ready set needs no sort.
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();

        let mut result = Vec::with_capacity(n);
        while let Some(next) = pop_lowest_ready(&mut ready) {
            result.push(next);
            for &dependent in &before_edges[next] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    insert_sorted(&mut ready, dependent);
                }
            }
        }

        if result.len() != n {
            let unscheduled = (0..n)
                .filter(|i| !result.contains(i))
                .map(|i| self.systems[*i].id)
                .collect();
            return Err(EcsError::SchedulingCycle(unscheduled));
        }

        Ok(result)
    }
}

fn pop_lowest_ready(ready: &mut VecDeque<usize>) -> Option<usize> {
    ready.pop_front()
}

fn insert_sorted(ready: &mut VecDeque<usize>, index: usize) {
    let pos = ready.iter().position(|&i| i > index).unwrap_or(ready.len());
    ready.insert(pos, index);
}

/// Owns every registered system, grouped by phase, and drives startup/update.
pub struct Scheduler {
    phases: [PhaseSchedule; PHASE_COUNT],
    fixed_time: FixedTime,
    max_fixed_steps: usize,
    next_id: u32,
}

impl Scheduler {
    pub fn new(fixed_timestep: Duration, max_fixed_steps: usize) -> Self {
        Self {
            phases: Default::default(),
            fixed_time: FixedTime::from_duration(fixed_timestep),
            max_fixed_steps,
            next_id: 0,
        }
    }

    /// `fixed_alpha = accumulator / fixed_dt`, for interpolating render state
    /// between fixed updates.
    pub fn fixed_alpha(&self) -> f32 {
        self.fixed_time.fixed_alpha()
    }

    /// Register `config` into `phase`. Returns the new id and the
    /// `on_added` hook, if any, for the caller to run with full `&mut World`
    /// access (the scheduler itself never holds a world reference).
    pub fn add_system(&mut self, phase: Phase, config: SystemConfig) -> Result<(SystemId, Option<HookFn>)> {
        let slot = &mut self.phases[phase_slot(phase)];
        if slot.name_to_index.contains_key(&config.name) {
            let existing = slot.systems[slot.name_to_index[&config.name]].id;
            return Err(EcsError::DuplicateRegistration(existing));
        }

        let id = SystemId(self.next_id);
        self.next_id += 1;
        let index = slot.systems.len();
        slot.name_to_index.insert(config.name.clone(), index);
        slot.systems.push(ScheduledSystem {
            id,
            name: config.name,
            run: config.run,
            before: config.before,
            after: config.after,
            on_removed: config.on_removed,
            dispose: config.dispose,
        });
        slot.invalidate();
        Ok((id, config.on_added))
    }

    /// Unregister `id` from every phase (a no-op if not found) and return its
    /// `on_removed` hook for the caller to run.
    pub fn remove_system(&mut self, id: SystemId) -> Option<HookFn> {
        for slot in &mut self.phases {
            if let Some(pos) = slot.systems.iter().position(|s| s.id == id) {
                let removed = slot.systems.remove(pos);
                slot.name_to_index.remove(&removed.name);
                for (i, system) in slot.systems.iter().enumerate() {
                    slot.name_to_index.insert(system.name.clone(), i);
                }
                slot.invalidate();
                return removed.on_removed;
            }
        }
        None
    }

    /// Every `dispose` hook across every phase, in phase order then
    /// insertion order, draining the scheduler in the process.
    pub(crate) fn drain_dispose_hooks(&mut self) -> Vec<HookFn> {
        let mut hooks = Vec::new();
        for slot in &mut self.phases {
            for system in &mut slot.systems {
                if let Some(hook) = system.dispose.take() {
                    hooks.push(hook);
                }
            }
        }
        hooks
    }

    fn ensure_sorted(&mut self, phase: Phase) -> Result<()> {
        let slot = &mut self.phases[phase_slot(phase)];
        if slot.sorted.is_none() {
            slot.sorted = Some(slot.topological_sort()?);
        }
        Ok(())
    }

    /// Run every system in `phase`, in topologically sorted order, against
    /// `world`. `world` must not itself contain `self`.
    pub fn run_phase(&mut self, phase: Phase, world: &mut World, dt: f32) -> Result<()> {
        self.ensure_sorted(phase)?;
        let order = self.phases[phase_slot(phase)].sorted.clone().unwrap_or_default();
        for index in order {
            let run = &mut self.phases[phase_slot(phase)].systems[index].run;
            (run)(world, dt)?;
        }
        Ok(())
    }

    /// Advance the fixed-timestep accumulator by `dt` and return how many
    /// `FIXED_UPDATE` iterations are due this call (clamped to
    /// `max_fixed_steps`).
    pub fn fixed_steps_due(&mut self, dt: Duration) -> usize {
        self.fixed_time.tick(dt, self.max_fixed_steps)
    }

    pub fn fixed_timestep(&self) -> Duration {
        self.fixed_time.timestep()
    }

    /// Every `on_removed` hook still registered across every phase, in phase
    /// order then insertion order, draining the scheduler in the process.
    /// Called during `World::dispose`, strictly after `drain_dispose_hooks`.
    pub(crate) fn drain_removed_hooks(&mut self) -> Vec<HookFn> {
        let mut hooks = Vec::new();
        for slot in &mut self.phases {
            for system in &mut slot.systems {
                if let Some(hook) = system.on_removed.take() {
                    hooks.push(hook);
                }
            }
        }
        hooks
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs_f32(1.0 / 60.0), 4)
    }
}

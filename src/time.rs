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

//! Frame timing and the fixed-timestep accumulator the scheduler drives
//! `FIXED_UPDATE` from.

use std::time::Duration;

/// Wall-clock timing, exposed as a resource for host code; not consulted by
/// the scheduler itself, which only ever sees the `dt` passed to `update`.
#[derive(Clone, Debug)]
pub struct Time {
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    time_scale: f32,
    startup_time: std::time::Instant,
    last_update: std::time::Instant,
}

impl Time {
    pub fn new() -> Self {
        let now = std::time::Instant::now();
        Self {
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            time_scale: 1.0,
            startup_time: now,
            last_update: now,
        }
    }

    pub fn update(&mut self) {
        let now = std::time::Instant::now();
        self.delta = now.duration_since(self.last_update);
        self.elapsed = now.duration_since(self.startup_time);
        self.last_update = now;
        self.frame_count += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32() * self.time_scale
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.time_scale = 0.0;
    }

    pub fn resume(&mut self) {
        self.time_scale = 1.0;
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-timestep accumulator driving the scheduler's `FIXED_UPDATE` loop.
///
/// `tick` clamps the accumulator to `max_steps * timestep` before draining
/// it, so a long stall (a debugger pause, a slow frame) produces at most
/// `max_steps` fixed updates instead of a burst proportional to the stall.
#[derive(Clone, Debug)]
pub struct FixedTime {
    timestep: Duration,
    accumulator: Duration,
}

impl FixedTime {
    pub fn new(hz: u32) -> Self {
        Self::from_duration(Duration::from_secs_f32(1.0 / hz as f32))
    }

    pub fn from_duration(timestep: Duration) -> Self {
        Self {
            timestep,
            accumulator: Duration::ZERO,
        }
    }

    /// Advance the accumulator by `delta`, clamp it to `max_steps` worth of
    /// timestep, and return how many fixed steps are due. Each returned step
    /// should be consumed by draining the accumulator by one `timestep`
    /// (the caller runs `FIXED_UPDATE` that many times).
    pub fn tick(&mut self, delta: Duration, max_steps: usize) -> usize {
        self.accumulator += delta;
        let max_accum = self.timestep.saturating_mul(max_steps as u32);
        if self.accumulator > max_accum {
            self.accumulator = max_accum;
        }

        let mut steps = 0;
        while steps < max_steps && self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            steps += 1;
        }
        steps
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn timestep_seconds(&self) -> f32 {
        self.timestep.as_secs_f32()
    }

    pub fn overstep(&self) -> Duration {
        self.accumulator
    }

    /// Remaining accumulator as a fraction of one timestep, for interpolating
    /// render state between fixed updates.
    pub fn fixed_alpha(&self) -> f32 {
        let timestep = self.timestep.as_secs_f32();
        if timestep > 0.0 {
            self.accumulator.as_secs_f32() / timestep
        } else {
            0.0
        }
    }
}

impl Default for FixedTime {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_creation() {
        let time = Time::new();
        assert_eq!(time.frame_count(), 0);
        assert_eq!(time.time_scale(), 1.0);
    }

    #[test]
    fn time_pause_resume() {
        let mut time = Time::new();
        time.pause();
        assert!(time.is_paused());
        time.resume();
        assert!(!time.is_paused());
    }

    #[test]
    fn fixed_time_accumulates_until_a_full_step() {
        let mut fixed = FixedTime::new(60);
        assert_eq!(fixed.tick(Duration::from_millis(16), 4), 0);
        assert_eq!(fixed.tick(Duration::from_millis(17), 4), 1);
    }

    #[test]
    fn fixed_time_clamps_to_max_steps() {
        let mut fixed = FixedTime::new(60);
        // a huge stall would otherwise demand ~6 steps; clamp to 4
        let steps = fixed.tick(Duration::from_millis(100), 4);
        assert_eq!(steps, 4);
        assert_eq!(fixed.tick(Duration::ZERO, 4), 0);
    }

    #[test]
    fn fixed_alpha_is_between_zero_and_one() {
        let mut fixed = FixedTime::new(60);
        fixed.tick(Duration::from_millis(8), 4);
        let alpha = fixed.fixed_alpha();
        assert!(alpha > 0.0 && alpha < 1.0);
    }
}

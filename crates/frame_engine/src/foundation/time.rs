//! Time management utilities

use std::time::{Duration, Instant};

/// Default update rate of [`FixedTimestep`]
pub const DEFAULT_TIMESTEP: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Cycles longer than this are assumed to be a pause (debugger, suspend)
pub const MAX_CYCLE: Duration = Duration::from_secs(1);

/// Frame timer with running statistics
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Mark the end of a frame; returns the time since the previous mark
    pub fn update(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.record(elapsed);
        self.last_frame = now;
        elapsed
    }

    fn record(&mut self, elapsed: Duration) {
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.frame_count += 1;
    }

    /// Seconds between the last two updates
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds accumulated over all updates
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of updates so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Fixed-rate update clock
///
/// Wall-clock cycle durations are accumulated as lag; every whole timestep of
/// lag yields one update step. A cycle longer than [`MAX_CYCLE`] counts as a
/// single timestep so a long pause does not cause a burst of updates.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    timestep: Duration,
    lag: Duration,
    last_cycle: Instant,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTEP)
    }
}

impl FixedTimestep {
    /// Create a clock stepping at `timestep`
    pub fn new(timestep: Duration) -> Self {
        Self {
            timestep,
            lag: Duration::ZERO,
            last_cycle: Instant::now(),
        }
    }

    /// Length of one update step
    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    /// Length of one update step in seconds
    pub fn timestep_secs(&self) -> f64 {
        self.timestep.as_secs_f64()
    }

    /// Start a new cycle from the wall clock; returns the number of update steps due
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let cycle = now.duration_since(self.last_cycle);
        self.last_cycle = now;
        self.advance(cycle)
    }

    /// Feed a cycle duration; returns the number of update steps due
    pub fn advance(&mut self, cycle: Duration) -> u32 {
        if self.timestep.is_zero() {
            return 0;
        }
        let cycle = if cycle > MAX_CYCLE { self.timestep } else { cycle };
        self.lag += cycle;

        let mut steps = 0;
        while self.lag >= self.timestep {
            self.lag -= self.timestep;
            steps += 1;
        }
        steps
    }

    /// Lag not yet consumed by a step, as a fraction of one step
    pub fn alpha(&self) -> f64 {
        if self.timestep.is_zero() {
            0.0
        } else {
            self.lag.as_secs_f64() / self.timestep.as_secs_f64()
        }
    }
}

//! Monotonic frame clock.

use std::time::{Duration, Instant};

/// Timing sample produced once per loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick.
    pub delta: f32,
    /// Seconds since the clock started.
    pub elapsed: f32,
}

/// Drives the per-iteration delta time and the total elapsed time.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_tick: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Total time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Advance the clock and return the sample for this iteration.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        FrameTime {
            delta: delta.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_monotonic() {
        let mut clock = FrameClock::new();
        let first = clock.tick();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.tick();

        assert!(first.delta >= 0.0);
        assert!(second.delta > 0.0);
        assert!(second.elapsed >= first.elapsed + second.delta * 0.99);
    }
}

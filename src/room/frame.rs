//! Frame timing and the text flicker curve.

use std::time::{Duration, Instant};

/// Measures time between frames and since start
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

/// Timing of a single tick, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub delta: f32,
    pub elapsed: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start, last: start }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`. Times earlier than the previous tick
    /// count as no time passing.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let delta = now.saturating_duration_since(self.last);
        if now > self.last {
            self.last = now;
        }
        FrameTime {
            delta: delta.as_secs_f32(),
            elapsed: self.last.saturating_duration_since(self.start).as_secs_f32(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Opacity of the main text at `elapsed` seconds, within `[0.4, 1.0]`
pub fn flicker(elapsed: f32) -> f32 {
    0.7 + 0.3 * (elapsed * 10.0).sin() * (elapsed * 3.0).sin().abs()
}

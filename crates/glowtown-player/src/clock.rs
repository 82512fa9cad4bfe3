//! Frame clock

use std::time::{Duration, Instant};

/// Longest frame delta fed to movement, so a stall does not teleport the camera
const MAX_DELTA: f64 = 0.25;

/// Tracks elapsed time and a smoothed frame time for display
pub struct FrameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Exponential moving average of the frame time in seconds
    pub average_frame_time: f64,
    last_instant: Instant,
    first_tick: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            average_frame_time: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant);
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance by an explicit duration.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.first_tick {
            self.first_tick = false;
            self.delta_time = 0.0;
            return;
        }

        self.delta_time = elapsed.as_secs_f64().min(MAX_DELTA);
        self.total_time += self.delta_time;
        self.average_frame_time = if self.average_frame_time == 0.0 {
            self.delta_time
        } else {
            self.average_frame_time * 0.9 + self.delta_time * 0.1
        };
    }

    /// Smoothed frame time in milliseconds
    pub fn frame_time_ms(&self) -> f64 {
        self.average_frame_time * 1000.0
    }

    pub fn fps(&self) -> f64 {
        if self.average_frame_time > 0.0 {
            1.0 / self.average_frame_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_zero_delta() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.delta_time, 0.0);
        assert_eq!(clock.total_time, 0.0);
    }

    #[test]
    fn delta_is_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::ZERO);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.delta_time, MAX_DELTA);
        assert_eq!(clock.total_time, MAX_DELTA);
    }

    #[test]
    fn average_tracks_frame_time() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::ZERO);
        for _ in 0..200 {
            clock.advance(Duration::from_millis(16));
        }
        assert!((clock.frame_time_ms() - 16.0).abs() < 0.01);
        assert!((clock.fps() - 62.5).abs() < 0.1);
    }
}

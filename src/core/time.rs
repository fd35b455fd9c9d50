//! Frame clock driving the per-frame wind time

use std::time::Duration;

/// Scaled simulation time handed to the wind generator each frame.
///
/// Headless runs advance it by a fixed step; a host loop feeds it its own
/// frame delta. Elapsed time only grows.
#[derive(Clone, Debug)]
pub struct FrameClock {
    delta: Duration,
    frame_count: u64,
    /// 0 pauses the wind
    time_scale: f32,
    scaled_elapsed: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            delta: Duration::ZERO,
            frame_count: 0,
            time_scale: 1.0,
            scaled_elapsed: 0.0,
        }
    }

    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time_scale = scale.max(0.0);
        self
    }

    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.frame_count += 1;
        self.scaled_elapsed += delta.as_secs_f32() * self.time_scale;
    }

    /// Scaled seconds accumulated over all frames
    pub fn elapsed_secs(&self) -> f32 {
        self.scaled_elapsed
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
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
    fn test_fixed_advance() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_millis(500));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.frame_count(), 2);
        assert!((clock.elapsed_secs() - 0.75).abs() < 1e-5);
        assert!((clock.delta_secs() - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_paused_wind() {
        let mut clock = FrameClock::new().with_time_scale(0.0);
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.elapsed_secs(), 0.0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_negative_scale_clamped() {
        let mut clock = FrameClock::new().with_time_scale(-2.0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.elapsed_secs(), 0.0);
    }
}

// Exponential reconnect backoff.

use std::time::Duration;

/// `delay(attempt) = min(base * growth^attempt, cap)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub growth: f64,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            base: Duration::from_secs(3),
            growth: 1.5,
            cap: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, growth: f64, cap: Duration) -> Self {
        Backoff { base, growth, cap }
    }

    /// Delay before reconnect attempt number `attempt` (0-based).
    ///
    /// Non-decreasing in `attempt` for `growth >= 1`, never above `cap`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.growth.powi(exponent);
        if !secs.is_finite() || secs >= self.cap.as_secs_f64() {
            return self.cap;
        }
        // Whole milliseconds keep the schedule reproducible under a paused clock.
        Duration::from_millis((secs * 1000.0).round() as u64)
    }
}

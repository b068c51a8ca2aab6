//! Exponential backoff between empty polls.

use super::config::WorkerConfig;
use std::time::Duration;

/// Sleep schedule applied while the task queue is empty.
///
/// After `k` consecutive empty polls the next delay is
/// `min(base * multiplier^k, max)`; [`Backoff::reset`] returns to `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl Backoff {
    /// Creates a schedule starting at `base`.
    ///
    /// `max` below `base` is raised to `base`, and a multiplier below one is
    /// treated as one.
    #[must_use]
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        let growth = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            base,
            max: max.max(base),
            multiplier: growth,
            current: base,
        }
    }

    /// Creates the schedule configured for a worker.
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            config.poll_interval(),
            config.max_backoff(),
            config.backoff_multiplier(),
        )
    }

    /// Returns the delay the next empty poll will sleep for.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Returns the base interval.
    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Returns the delay to sleep now and grows the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.grown();
        delay
    }

    /// Restarts the schedule at the base interval.
    pub const fn reset(&mut self) {
        self.current = self.base;
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "backoff growth is a floating-point multiplier"
    )]
    fn grown(&self) -> Duration {
        let scaled = self.current.as_secs_f64() * self.multiplier;
        Duration::try_from_secs_f64(scaled).map_or(self.max, |next| next.min(self.max))
    }
}

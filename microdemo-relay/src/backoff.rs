//! Delay between relay iterations

use microdemo_core::BackoffConfig;
use std::time::Duration;

use crate::outcome::PollOutcome;

/// Fixed interval while healthy, exponential growth while dependencies fail
#[derive(Debug, Clone)]
pub struct Backoff {
    interval: Duration,
    initial: Duration,
    max: Duration,
    multiplier: u32,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(interval: Duration, config: &BackoffConfig) -> Self {
        let max = Duration::from_millis(config.max_ms);
        Self {
            interval,
            initial: Duration::from_millis(config.initial_ms).min(max),
            max,
            multiplier: config.multiplier.max(1),
            current: None,
        }
    }

    /// Delay to wait after `outcome` before the next iteration
    pub fn next_delay(&mut self, outcome: &PollOutcome) -> Duration {
        if !outcome.is_dependency_error() {
            self.current = None;
            return self.interval;
        }

        let next = match self.current {
            None => self.initial,
            Some(prev) => prev
                .checked_mul(self.multiplier)
                .map_or(self.max, |d| d.min(self.max)),
        };
        self.current = Some(next);
        next
    }

    /// Whether the last outcome was a dependency failure
    pub fn is_backing_off(&self) -> bool {
        self.current.is_some()
    }
}

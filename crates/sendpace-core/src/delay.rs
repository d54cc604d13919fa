//! Safety delay - randomized pacing between sends

use rand::Rng;
use sendpace_common::config::DispatchConfig;
use std::time::Duration;

/// Default lower bound of the safety delay
pub const DEFAULT_MIN_DELAY_MS: u64 = 15_000;

/// Default upper bound of the safety delay
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Fixed pause after a failed send
pub const FAILURE_DELAY: Duration = Duration::from_secs(5);

/// Uniformly distributed delay in `[min_ms, max_ms]` milliseconds
pub fn next_delay(min_ms: u64, max_ms: u64) -> Duration {
    SafetyDelay::new(min_ms, max_ms).next_delay()
}

/// Randomized pacing interval shared by the interactive queue and the
/// scheduled processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyDelay {
    min_ms: u64,
    max_ms: u64,
}

impl SafetyDelay {
    /// Create a delay generator; reversed bounds are swapped
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms > max_ms {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        } else {
            Self { min_ms, max_ms }
        }
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Draw the next delay
    pub fn next_delay(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for SafetyDelay {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}

/// Pacing policy for one sender: a random delay after a success and a
/// fixed delay after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub safety: SafetyDelay,
    pub failure_delay: Duration,
}

impl Pacing {
    pub fn new(safety: SafetyDelay, failure_delay: Duration) -> Self {
        Self {
            safety,
            failure_delay,
        }
    }

    /// No waiting at all
    pub fn immediate() -> Self {
        Self::new(SafetyDelay::new(0, 0), Duration::ZERO)
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            SafetyDelay::new(config.min_delay_ms, config.max_delay_ms),
            Duration::from_millis(config.failure_delay_ms),
        )
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::new(SafetyDelay::default(), FAILURE_DELAY)
    }
}

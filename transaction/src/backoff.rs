//! Retry delays.

use rand::Rng;
use std::time::Duration;
use terra_core::EngineConfig;

/// Bounded exponential backoff with jitter.
///
/// The delay before attempt `n + 1` is drawn uniformly from
/// `[d / 2, d]` where `d = min(base * 2^(n - 1), max)`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.backoff_base(), config.backoff_max())
    }

    /// Upper bound of the delay after `attempt` failed attempts.
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << shift).min(self.max)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        let nanos = ceiling.as_nanos() as u64;
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(nanos / 2..=nanos))
    }
}

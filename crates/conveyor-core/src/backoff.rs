use std::time::Duration;

use rand::RngExt;

/// Capped exponential backoff with up to +10% jitter.
///
/// Delay for attempt `n` (0-based) is `base * 2^n`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the current attempt without jitter.
    pub fn current(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.attempt = self.attempt.saturating_add(1);
        let jitter_ms = (delay.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        let mut rng = rand::rng();
        delay + Duration::from_millis(rng.random_range(0..=jitter_ms))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

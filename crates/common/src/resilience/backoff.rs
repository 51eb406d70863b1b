//! Backoff delay calculation with optional jitter.

use std::time::Duration;

use rand::Rng;

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    /// No jitter
    #[default]
    None,
    /// Equal jitter: calculated_delay/2 to calculated_delay
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    pub fn apply(self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            Jitter::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Capped exponential backoff plus jitter; what the retry loop holds.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub base: f64,
    pub max_delay: Duration,
    pub jitter: Jitter,
}

impl BackoffPolicy {
    /// Capped exponential backoff without jitter.
    pub fn exponential(initial_delay: Duration, base: f64, max_delay: Duration) -> Self {
        Self { initial_delay, base, max_delay, jitter: Jitter::None }
    }

    /// Replace the jitter mode.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// `initial_delay * base^attempt`, capped at `max_delay`, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.base.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        if capped.is_finite() && capped > 0.0 {
            Duration::from_millis(capped as u64)
        } else if capped > 0.0 {
            self.max_delay
        } else {
            Duration::ZERO
        }
    }

    /// Delay before retry number `attempt` (0-based), jitter applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.base_delay(attempt))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(500), 2.0, Duration::from_secs(8))
    }
}

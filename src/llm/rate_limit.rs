//! Minimum-interval gate in front of the LLM
//!
//! Free-tier model quotas are per minute, so every call (classification and
//! answer generation alike) waits until `min_interval` has passed since the
//! previous one. The lock is held while waiting, which serializes concurrent
//! callers in arrival order.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default cooldown between two gateway calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(12);

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// A limiter that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the slot, mark it taken, and return how long we waited.
    pub async fn acquire(&self) -> Duration {
        let mut last_call = self.last_call.lock().await;
        let now = Instant::now();

        let wait = match *last_call {
            Some(previous) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(previous)),
            None => Duration::ZERO,
        };

        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiting LLM call");
            tokio::time::sleep(wait).await;
        }

        *last_call = Some(Instant::now());
        wait
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

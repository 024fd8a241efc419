//! Minimum-interval limiter for outbound requests

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces acquisitions at least `interval` apart
///
/// The lock is held while waiting, so concurrent callers queue up and leave
/// one interval apart in the order they arrived.
pub struct RateLimiter {
    last: Mutex<Option<Instant>>,
    interval: Duration,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            last: Mutex::new(None),
            interval,
        }
    }

    /// Wait until the next request may be sent
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                tracing::debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Rate limit wait"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

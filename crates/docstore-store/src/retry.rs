use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::DatastoreError;

/// Randomized exponential backoff with a bounded attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times without sleeping.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let min_ms = duration_millis(self.min_delay);
        let max_ms = duration_millis(self.max_delay);
        let ceiling = min_ms
            .checked_shl(attempt)
            .filter(|v| v >> attempt == min_ms)
            .unwrap_or(max_ms)
            .min(max_ms);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(0..=ceiling).max(min_ms.min(ceiling));
        Duration::from_millis(ms)
    }

    /// Run `f` until it succeeds, fails with a non-transient error, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `f`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, DatastoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DatastoreError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    let delay = self.delay(attempt - 1);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = duration_millis(delay),
                        error = %e,
                        "retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    tracing::error!(operation, attempt, error = %e, "giving up");
                    return Err(e);
                }
            }
        }
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// What to do with a failed attempt, decided by the caller's classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Retry,
    Abort,
}

/// Bounded retry policy with exponential backoff and jitter.
///
/// `max_attempts` counts the initial try, so `max_attempts: 3` means at most
/// two retries before the last error is surfaced.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2,
            max_delay_secs: 60,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed): doubles from the base,
    /// capped at `max_delay_secs`, plus jitter in `0..base_delay_secs`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let doubled = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = doubled.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }
}

/// Run `operation` until it succeeds, the classifier aborts, or the attempt
/// budget is spent. Returns the first `Ok` or the last error seen.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    policy: &RetryPolicy,
    classify: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> Disposition,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if classify(&err) == Disposition::Abort || retry + 1 >= attempts {
                    return Err(err);
                }
                let delay = policy.backoff_delay(retry);
                tracing::warn!(
                    "attempt {}/{} failed, retrying in {}s: {}",
                    retry + 1,
                    attempts,
                    delay.as_secs(),
                    err
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
        }
    }
}

//! Retry with jittered exponential backoff for transient failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use rentflow_shared::config::JobsConfig;
use tracing::warn;

use crate::error::Classify;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Cap for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&JobsConfig::default())
    }
}

impl From<&JobsConfig> for RetryPolicy {
    fn from(config: &JobsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// [`Self::delay`] with equal jitter: uniform in `[delay / 2, delay]`.
    #[must_use]
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let ceiling = self.delay(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        rand::rng().random_range(ceiling / 2..=ceiling)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. Returns the last result and the attempts used.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, mut op: F) -> (Result<T, E>, u32)
    where
        E: Classify + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.jittered_delay(attempt);
                    warn!(
                        label,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return (other, attempt),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1500),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(1500));
        assert_eq!(policy.delay(30), Duration::from_millis(1500));
    }

    #[test]
    fn test_jitter_stays_within_half_and_full_delay() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(3000),
        };
        for attempt in 1..=5 {
            let ceiling = policy.delay(attempt);
            for _ in 0..50 {
                let delay = policy.jittered_delay(attempt);
                assert!(delay >= ceiling / 2 && delay <= ceiling, "{delay:?} vs {ceiling:?}");
            }
        }
        assert_eq!(RetryPolicy::none().jittered_delay(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let (result, attempts) = fast(3)
            .retry("test", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("down".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let (result, attempts) = fast(2)
            .retry("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StoreError::Unavailable("down".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_never_retries_non_transient() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let (result, attempts) = fast(5)
            .retry("test", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StoreError::Conflict("dup".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

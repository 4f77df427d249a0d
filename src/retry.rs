use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Bounded exponential backoff with jitter, used for transient failures of a
/// single remote call (e.g. one playlist page fetch).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_secs: 2,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    /// Compute the delay for a given retry attempt (0-indexed).
    ///
    /// Formula: `min(base_delay * 2^retry, max_delay) + random_jitter(0..base_delay)`
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp_delay = self
            .base_delay_secs
            .saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped = exp_delay.min(self.max_delay_secs);
        let jitter = if self.base_delay_secs > 0 {
            rand::thread_rng().gen_range(0..self.base_delay_secs)
        } else {
            0
        };
        Duration::from_secs(capped + jitter)
    }
}

/// Retry an async operation with bounded exponential backoff.
///
/// - `classifier`: inspects an error and returns `Retry` or `Abort`
/// - `operation`: the async closure to retry
///
/// Returns the first `Ok` result, or the last error once retries are
/// exhausted or the classifier aborts.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_retries + 1; // 1 initial + max_retries retries
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if classifier(&e) == RetryAction::Abort || attempt + 1 >= total_attempts {
                    return Err(e);
                }
                let delay = config.delay_for_retry(attempt);
                tracing::warn!(
                    "Retryable error (attempt {}/{}), retrying in {}s: {}",
                    attempt + 1,
                    total_attempts,
                    delay.as_secs(),
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Indefinite backoff policy for credential acquisition.
///
/// The remedy for a Pending credential (a human completing consent in the
/// external auth UI) is outside this process's control, so the default policy
/// retries forever: 10s, 15s, 22.5s, ... capped at 300s. `max_attempts` is a
/// test knob only; production callers leave it `None`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub initial_delay_secs: f64,
    pub multiplier: f64,
    pub max_delay_secs: f64,
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_secs: 10.0,
            multiplier: 1.5,
            max_delay_secs: 300.0,
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay for the nth consecutive failure (0-indexed), deterministic.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_secs * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay.min(self.max_delay_secs))
    }

    /// Start a stateful cursor over this policy's delay sequence.
    pub fn start(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempt: 0,
        }
    }
}

/// Stateful cursor over a [`BackoffPolicy`] delay sequence.
pub struct Backoff<'a> {
    policy: &'a BackoffPolicy,
    attempt: u32,
}

impl Backoff<'_> {
    /// The next delay to sleep, or `None` once `max_attempts` is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        let delay = self.policy.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay_secs, 2);
        assert_eq!(config.max_delay_secs, 30);
    }

    #[test]
    fn test_delay_exponential_backoff() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_secs: 2,
            max_delay_secs: 60,
        };
        // retry 0: base=2*1=2, jitter in 0..2, total in 2..4
        let d = config.delay_for_retry(0);
        assert!(d.as_secs() >= 2 && d.as_secs() < 4);

        // retry 2: base=2*4=8, jitter in 0..2, total in 8..10
        let d = config.delay_for_retry(2);
        assert!(d.as_secs() >= 8 && d.as_secs() < 10);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay_secs: 5,
            max_delay_secs: 30,
        };
        let d = config.delay_for_retry(10);
        assert!(d.as_secs() >= 30 && d.as_secs() < 35);
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_secs: 0,
            max_delay_secs: 0,
        };
        let result: Result<i32, String> =
            retry_with_backoff(&config, |_| RetryAction::Retry, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_abort_on_non_retryable() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_secs: 0,
            max_delay_secs: 0,
        };
        let call_count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &config,
            |_| RetryAction::Abort,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "fatal");
        assert_eq!(call_count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay_secs: 0,
            max_delay_secs: 0,
        };
        let call_count = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, String> = retry_with_backoff(
            &config,
            |_| RetryAction::Retry,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Err("still failing".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "still failing");
        // 1 initial + 2 retries = 3 attempts
        assert_eq!(call_count.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_policy_sequence() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs_f64(10.0));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs_f64(15.0));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs_f64(22.5));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs_f64(33.75));
    }

    #[test]
    fn test_backoff_policy_capped() {
        let policy = BackoffPolicy::default();
        // 10 * 1.5^9 ≈ 384 > 300
        assert_eq!(policy.delay_for_attempt(9), Duration::from_secs_f64(300.0));
        assert_eq!(policy.delay_for_attempt(50), Duration::from_secs_f64(300.0));
    }

    #[test]
    fn test_backoff_cursor_never_gives_up_without_cap() {
        let policy = BackoffPolicy::default();
        let mut backoff = policy.start();
        for _ in 0..10_000 {
            assert!(backoff.next_delay().is_some());
        }
    }

    #[test]
    fn test_backoff_cursor_respects_max_attempts() {
        let policy = BackoffPolicy {
            max_attempts: Some(3),
            ..BackoffPolicy::default()
        };
        let mut backoff = policy.start();
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs_f64(10.0)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs_f64(15.0)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs_f64(22.5)));
        assert_eq!(backoff.next_delay(), None);
    }
}

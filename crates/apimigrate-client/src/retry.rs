//! Exponential backoff retry for transient management API failures.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds. Doubles after each
    /// subsequent failure.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 600_000,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt cap and base delay.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms: 600_000,
        }
    }

    /// Whether a failed attempt (1-based) should be retried.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &ClientError) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        error.is_retryable() || error.is_server_error()
    }

    /// Delay to sleep after the given failed attempt (1-based).
    ///
    /// A [`ClientError::RateLimited`] carrying a Retry-After value uses that
    /// value directly (capped). Otherwise the delay is
    /// `base_delay_ms * 2^(attempt - 1)`, capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, error: &ClientError) -> Duration {
        let ms = if let ClientError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            secs.saturating_mul(1000).min(self.max_delay_ms)
        } else {
            let exponential = self
                .base_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
            exponential.min(self.max_delay_ms)
        };
        Duration::from_millis(ms)
    }

    /// Execute an async operation, retrying transient failures.
    ///
    /// The closure is invoked up to `max_attempts` times. Non-retryable
    /// errors propagate immediately; exhausting every attempt yields
    /// [`ClientError::RetriesExhausted`] naming the operation.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ClientResult<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if attempt >= self.max_attempts {
                            warn!(operation, attempts = attempt, error = %error, "retries exhausted");
                            return Err(ClientError::RetriesExhausted {
                                operation: operation.to_string(),
                                attempts: attempt,
                                detail: error.to_string(),
                            });
                        }
                        return Err(error);
                    }

                    let delay = self.delay_after(attempt, &error);
                    debug!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> ClientError {
        ClientError::Api {
            status: 503,
            detail: "service unavailable".into(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.base_delay_ms, 1000);
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        let error = transient();
        assert_eq!(policy.delay_after(1, &error), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2, &error), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3, &error), Duration::from_millis(4000));
        assert_eq!(policy.delay_after(4, &error), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy {
            max_attempts: 20,
            base_delay_ms: 1000,
            max_delay_ms: 5000,
        };
        assert_eq!(
            policy.delay_after(10, &transient()),
            Duration::from_millis(5000)
        );
    }

    #[test]
    fn test_rate_limited_uses_retry_after() {
        let policy = RetryPolicy::default();
        let error = ClientError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(policy.delay_after(1, &error), Duration::from_secs(30));
        assert_eq!(policy.delay_after(5, &error), Duration::from_secs(30));
    }

    #[test]
    fn test_should_not_retry_client_errors() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &ClientError::NotFound("x".into())));
        assert!(!policy.should_retry(1, &ClientError::Auth("denied".into())));
        assert!(policy.should_retry(1, &transient()));
    }

    #[test]
    fn test_should_not_retry_at_attempt_cap() {
        let policy = RetryPolicy::new(3, 1);
        assert!(policy.should_retry(2, &transient()));
        assert!(!policy.should_retry(3, &transient()));
    }

    #[tokio::test]
    async fn test_execute_succeeds_first_try() {
        let policy = RetryPolicy::new(3, 0);
        let result = policy
            .execute("noop", || async { Ok::<_, ClientError>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_execute_succeeds_after_retries() {
        let policy = RetryPolicy::new(5, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = policy
            .execute("flaky", move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_non_retryable_fails_immediately() {
        let policy = RetryPolicy::new(5, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: ClientResult<()> = policy
            .execute("denied", move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ClientError::Auth("bad credentials".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(ClientError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_exhaustion_attempt_count() {
        let policy = RetryPolicy::new(4, 0);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: ClientResult<()> = policy
            .execute("always-down", move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        match result {
            Err(ClientError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_backoff_timing_doubles() {
        let policy = RetryPolicy::new(4, 1000);
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = policy
            .execute("slow-recovery", move || {
                let calls = calls_clone.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(transient())
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        // 1000 + 2000 + 4000 ms of virtual sleep before the 4th attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(7000));
    }
}

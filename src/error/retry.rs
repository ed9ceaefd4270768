use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::context::ErrorContext;
use crate::core::pacing::{Sleeper, TokioSleeper};
use crate::error::{AdapterError, Result};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay after the first failed attempt (in milliseconds)
    pub base_delay_ms: u64,
    /// Cap on the exponential part of the delay (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: u64,
    /// Upper bound (exclusive) of the uniform jitter added to each delay
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000, // 1 second
            max_delay_ms: 30000, // 30 seconds
            backoff_multiplier: 2,
            jitter_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Backoff before the attempt following failed attempt `attempt`
    /// (0-indexed), without jitter: `min(base * multiplier^attempt, max)`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(self.backoff_multiplier.saturating_pow(attempt))
            .min(self.max_delay_ms)
    }
}

/// Runs fallible remote operations under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryManager {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryManager {
    /// Create a retry manager that waits on the tokio timer
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    /// Create a retry manager with an injected delay source
    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation with retry logic.
    ///
    /// Only errors for which [`AdapterError::is_retryable`] holds are
    /// retried. Once the attempt budget is spent the last error is returned
    /// unchanged.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        context: &ErrorContext,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            debug!(
                correlation_id = %context.correlation_id,
                operation = %context.operation,
                attempt = attempt + 1,
                max_attempts,
                "Executing remote operation"
            );

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            correlation_id = %context.correlation_id,
                            attempt = attempt + 1,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        debug!(
                            correlation_id = %context.correlation_id,
                            error_kind = error.kind(),
                            "Error is not retryable"
                        );
                        return Err(error);
                    }

                    if attempt + 1 >= max_attempts {
                        warn!(
                            correlation_id = %context.correlation_id,
                            attempts = attempt + 1,
                            error = %error,
                            "Maximum retry attempts reached"
                        );
                        return Err(error);
                    }

                    let delay = self.calculate_delay(attempt, &error);
                    warn!(
                        correlation_id = %context.correlation_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Operation failed, retrying after delay"
                    );

                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delay after failed attempt `attempt` (0-indexed).
    ///
    /// Exponential backoff plus uniform jitter. A rate-limit hint from the
    /// remote raises the delay to at least the hint, capped at
    /// `max_delay_ms`.
    pub fn calculate_delay(&self, attempt: u32, error: &AdapterError) -> Duration {
        let mut delay_ms = self.policy.backoff_ms(attempt);

        if self.policy.jitter_ms > 0 {
            delay_ms += rand::thread_rng().gen_range(0..self.policy.jitter_ms);
        }

        if let AdapterError::RateLimitError {
            retry_after_seconds,
        } = error
        {
            let hint_ms = retry_after_seconds
                .saturating_mul(1000)
                .min(self.policy.max_delay_ms);
            delay_ms = delay_ms.max(hint_ms);
        }

        Duration::from_millis(delay_ms)
    }
}

/// Run `operation` with the default backoff policy and `max_attempts`.
pub async fn with_retry<T, F, Fut>(operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let manager = RetryManager::new(RetryPolicy::default().with_max_attempts(max_attempts));
    let context = ErrorContext::new("retry", "with_retry");
    manager.execute_with_retry(operation, &context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pacing::RecordingSleeper;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn manager(policy: RetryPolicy) -> (RetryManager, RecordingSleeper) {
        let sleeper = RecordingSleeper::new();
        (
            RetryManager::with_sleeper(policy, Arc::new(sleeper.clone())),
            sleeper,
        )
    }

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_retry_manager_success() {
        let (retry_manager, sleeper) = manager(no_jitter());
        let context = ErrorContext::new("test", "operation");

        let result = retry_manager
            .execute_with_retry(|| async { Ok::<i32, AdapterError>(42) }, &context)
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_retry_manager_eventual_success() {
        let (retry_manager, sleeper) = manager(no_jitter());
        let context = ErrorContext::new("test", "operation");
        let attempts = AtomicU32::new(0);

        let result = retry_manager
            .execute_with_retry(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if n < 3 {
                            Err(AdapterError::rate_limited(0))
                        } else {
                            Ok(42)
                        }
                    }
                },
                &context,
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[tokio::test]
    async fn test_server_error_exhausts_attempts_and_keeps_last_error() {
        let (retry_manager, sleeper) = manager(RetryPolicy::default());
        let context = ErrorContext::new("test", "operation");
        let attempts = AtomicU32::new(0);

        let result: Result<i32> = retry_manager
            .execute_with_retry(
                || {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        Err(AdapterError::transport(
                            Some(503),
                            None,
                            format!("unavailable on attempt {}", n),
                        ))
                    }
                },
                &context,
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.unwrap_err(),
            AdapterError::transport(Some(503), None, "unavailable on attempt 3")
        );

        let calls = sleeper.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0] >= Duration::from_millis(1000) && calls[0] < Duration::from_millis(2000));
        assert!(calls[1] >= Duration::from_millis(2000) && calls[1] < Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_non_retryable_errors_propagate_immediately() {
        let (retry_manager, sleeper) = manager(no_jitter());
        let context = ErrorContext::new("test", "operation");

        for error in [
            AdapterError::validation("type", "is required"),
            AdapterError::remote_protocol(vec![]),
            AdapterError::transport(Some(400), None, "bad request"),
        ] {
            let attempts = AtomicU32::new(0);
            let expected = error.clone();
            let result: Result<()> = retry_manager
                .execute_with_retry(
                    || {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        let error = error.clone();
                        async move { Err(error) }
                    },
                    &context,
                )
                .await;

            assert_eq!(result.unwrap_err(), expected);
            assert_eq!(attempts.load(Ordering::SeqCst), 1);
        }
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(0), 1000);
        assert_eq!(policy.backoff_ms(1), 2000);
        assert_eq!(policy.backoff_ms(4), 16000);
        assert_eq!(policy.backoff_ms(5), 30000);
        assert_eq!(policy.backoff_ms(40), 30000);
    }

    #[test]
    fn test_rate_limit_hint_raises_delay() {
        let retry_manager = RetryManager::new(no_jitter());
        let delay = retry_manager.calculate_delay(0, &AdapterError::rate_limited(5));
        assert_eq!(delay, Duration::from_secs(5));

        let capped = retry_manager.calculate_delay(0, &AdapterError::rate_limited(3600));
        assert_eq!(capped, Duration::from_secs(30));
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 30000);
        assert_eq!(policy.backoff_multiplier, 2);
        assert_eq!(policy.jitter_ms, 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_uses_attempt_budget() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::transport(None, None, "connection refused")) }
            },
            2,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}

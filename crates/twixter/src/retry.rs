//! Bounded retry utilities for source requests.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Initial delay before the first retry.
pub const INITIAL_BACKOFF_MS: u64 = 500;

/// Ceiling for a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Retries per request after the first attempt.
pub const MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts (0 disables retrying).
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// A configuration that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Run `operation`, retrying with backoff while `is_retryable` holds.
///
/// `on_retry` is called before each sleep with the error, the delay, and the
/// 1-based number of the attempt that just failed. Once retries are exhausted
/// or a non-retryable error occurs, that error is returned.
pub async fn with_retry<T, E, F, Fut, IsRetryable, OnRetry>(
    mut operation: F,
    config: &RetryConfig,
    is_retryable: IsRetryable,
    on_retry: OnRetry,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
    OnRetry: Fn(&E, Duration, u32),
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.clone().into_backoff())
        .when(|e| is_retryable(e))
        .notify(|err, dur| on_retry(err, dur, attempt.load(Ordering::SeqCst)))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct TestError {
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "transient={}", self.transient)
        }
    }

    impl std::error::Error for TestError {}

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();

        assert_eq!(config.min_delay, Duration::from_millis(INITIAL_BACKOFF_MS));
        assert_eq!(config.max_delay, Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(config.max_retries, MAX_RETRIES);
        assert!(config.with_jitter);
    }

    #[test]
    fn test_retry_config_no_retry() {
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
        assert!(!RetryConfig::default().with_jitter(false).with_jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_recovers_from_transient_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let notified: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let calls_capture = Arc::clone(&calls);
        let notified_capture = Arc::clone(&notified);
        let result = with_retry(
            || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError { transient: true })
                    } else {
                        Ok(7u32)
                    }
                }
            },
            &RetryConfig::default(),
            |e: &TestError| e.transient,
            |_e, _dur, attempt| {
                notified_capture
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(attempt)
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *notified.lock().unwrap_or_else(|e| e.into_inner()),
            vec![1, 2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = with_retry(
            || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError { transient: true })
                }
            },
            &RetryConfig::new(Duration::from_millis(10), Duration::from_millis(50), 2),
            |e: &TestError| e.transient,
            |_, _, _| {},
        )
        .await
        .expect_err("should exhaust retries");

        assert!(err.transient);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = with_retry(
            || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError { transient: false })
                }
            },
            &RetryConfig::default(),
            |e: &TestError| e.transient,
            |_, _, _| {},
        )
        .await
        .expect_err("expected error");

        assert!(!err.transient);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

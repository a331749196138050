//! Retry policy for upstream requests.
//!
//! The policy is plain data: attempt budget, base delay, multiplier and cap.
//! [`with_retry`] drives any fallible async operation with it, so the same
//! policy can be exercised in tests with injected failure sequences.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::sync::{ProgressCallback, SyncProgress, emit};

/// Default number of attempts (first try included).
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Default delay before the first retry, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 2_000;

/// Default multiplier applied per attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default upper bound for a single backoff delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Exponential retry configuration.
///
/// Delay before retry `n` (0-based) is `base_delay * multiplier^n`, capped at
/// `max_delay`. No jitter: the upstream is paced by a single worker anyway.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f32,
    /// Cap for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(
        max_attempts: usize,
        base_delay: Duration,
        multiplier: f32,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Number of attempts actually made, never zero.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Delay that precedes retry number `retry` (0 = first retry).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = f64::from(self.multiplier).powi(retry as i32);
        let millis = self.base_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Sum of every delay the policy can impose before giving up.
    #[must_use]
    pub fn worst_case_wait(&self) -> Duration {
        (0..self.attempts().saturating_sub(1) as u32)
            .map(|n| self.delay_for(n))
            .sum()
    }

    /// Build the backon strategy for this policy.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.multiplier)
            .with_max_times(self.attempts() - 1)
    }
}

/// Run `operation` under `policy`, retrying errors accepted by `is_retryable`.
///
/// Returns the first success, or the last error once the attempt budget is
/// spent. Each backoff is reported as [`SyncProgress::RetryBackoff`] and
/// logged at debug level.
pub async fn with_retry<T, E, F, Fut, IsRetryable>(
    mut operation: F,
    policy: &RetryPolicy,
    is_retryable: IsRetryable,
    operation_name: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    IsRetryable: Fn(&E) -> bool,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(policy.clone().into_backoff())
        .notify(|err: &E, dur: Duration| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            emit(
                on_progress,
                SyncProgress::RetryBackoff {
                    operation: operation_name.to_string(),
                    retry_after_ms: dur.as_millis() as u64,
                    attempt: current_attempt,
                    error: err.to_string(),
                },
            );
            tracing::debug!(
                operation = operation_name,
                attempt = current_attempt,
                delay_ms = dur.as_millis() as u64,
                error = %err,
                "Request failed, backing off"
            );
        })
        .when(is_retryable)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct TestError {
        message: &'static str,
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    fn policy(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(
            attempts,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(350),
        )
    }

    #[test]
    fn default_policy_matches_constants() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(p.base_delay, Duration::from_millis(DEFAULT_BASE_DELAY_MS));
        assert_eq!(p.max_delay, Duration::from_millis(DEFAULT_MAX_DELAY_MS));
    }

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let p = policy(5);
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(2), Duration::from_millis(350));
        assert_eq!(p.delay_for(10), Duration::from_millis(350));
    }

    #[test]
    fn worst_case_wait_sums_retry_delays() {
        // 4 retries: 100 + 200 + 350 + 350
        assert_eq!(policy(5).worst_case_wait(), Duration::from_millis(1_000));
        assert_eq!(RetryPolicy::no_retry().worst_case_wait(), Duration::ZERO);
    }

    #[test]
    fn zero_attempts_behaves_as_one() {
        assert_eq!(policy(0).attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success_and_emits_progress() {
        let calls = Arc::new(AtomicU32::new(0));
        let events: Arc<Mutex<Vec<SyncProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let events_capture = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            events_capture
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event);
        });

        let calls_capture = Arc::clone(&calls);
        let result = with_retry(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError {
                            message: "timeout",
                            transient: true,
                        })
                    } else {
                        Ok(42u32)
                    }
                }
            },
            &policy(3),
            |e: &TestError| e.transient,
            "list brands",
            Some(&callback),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let events = events.lock().unwrap_or_else(|e| e.into_inner());
        let backoffs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SyncProgress::RetryBackoff { retry_after_ms, .. } => Some(*retry_after_ms),
                _ => None,
            })
            .collect();
        assert_eq!(backoffs, vec![100, 200]);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let started = tokio::time::Instant::now();

        let err = with_retry(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    calls_capture.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError {
                        message: "HTTP 503",
                        transient: true,
                    })
                }
            },
            &policy(4),
            |e: &TestError| e.transient,
            "list models",
            None,
        )
        .await
        .expect_err("permanent failure should surface");

        assert_eq!(err.to_string(), "HTTP 503");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 100 + 200 + 350 of simulated backoff
        assert!(started.elapsed() >= Duration::from_millis(650));
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let err = with_retry(
            move || {
                let calls_capture = Arc::clone(&calls_capture);
                async move {
                    calls_capture.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError {
                        message: "bad request",
                        transient: false,
                    })
                }
            },
            &policy(5),
            |e: &TestError| e.transient,
            "detail",
            None,
        )
        .await
        .expect_err("expected error");

        assert_eq!(err.to_string(), "bad request");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Bounded retry with linear backoff for network-layer failures.

use crate::error::{RelayError, TransportFailure};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Attempt budget and backoff step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after attempt `n` fails is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are used up.
///
/// Attempts are strictly sequential. Only `Err` results are retried, so an
/// operation that yields an HTTP error status as `Ok` returns immediately.
/// The last failure is reported as [`RelayError::Transport`].
pub async fn retry_transport<F, Fut, T>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, RelayError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportFailure>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(output) => {
                if attempt > 1 {
                    info!(attempt, max_attempts, "request succeeded after retry");
                }
                return Ok(output);
            }
            Err(failure) if failure.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    error = %failure,
                    timed_out = failure.timed_out,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(failure) => {
                error!(
                    attempt,
                    error = %failure,
                    timed_out = failure.timed_out,
                    "request failed, giving up"
                );
                return Err(failure.into_relay_error(attempt));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(400));
        assert_eq!(policy.delay_after(2), Duration::from_millis(800));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_transport(&fast(), |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportFailure>("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = retry_transport(&fast(), |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TransportFailure::new(format!("boom {attempt}")))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3, "should stop after 3 attempts");
        match result {
            Err(RelayError::Transport { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "boom 3");
            }
            other => panic!("Expected Transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attempt_numbers_are_sequential() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = seen.clone();

        let _ = retry_transport(&fast(), |attempt| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(attempt);
                if attempt < 2 {
                    Err(TransportFailure::new("flaky"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}

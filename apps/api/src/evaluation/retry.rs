//! Bounded attempts with quadratic backoff for LLM calls.
//!
//! After failed attempt `i` (1-based) the caller sleeps `unit * i²` before
//! trying again. Only transient errors are retried; the error of the last
//! attempt is what surfaces.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::llm_client::LlmError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            unit,
        }
    }

    /// Sleep after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.saturating_mul(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Error from an exhausted or aborted call sequence.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct Exhausted {
    pub attempts: u32,
    #[source]
    pub last_error: LlmError,
}

pub async fn with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, Exhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{operation} attempt {}/{} failed ({e}), retrying after {}ms...",
                    attempt,
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: e,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_is_quadratic() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(900));
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = with_backoff(RetryPolicy::new(3, Duration::from_secs(1)), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::RateLimited)
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after attempt 1, 4s after attempt 2
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);

        let err = with_backoff(RetryPolicy::new(3, Duration::from_secs(1)), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<(), _>(LlmError::Api {
                    status: 500 + n as u16,
                    message: format!("attempt {n}"),
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err.last_error, LlmError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let err = with_backoff(RetryPolicy::new(5, Duration::from_secs(60)), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(LlmError::EmptyContent) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

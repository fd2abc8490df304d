//! Bounded retry with exponential backoff.
//!
//! [`retry_with_backoff`] wraps any fallible async unit of work. It knows
//! nothing about what the operation does; the orchestrator picks a
//! [`RetryPolicy`] per stage.
//!
//! # Backoff Strategy
//!
//! ```text
//! attempt 1 fails -> wait d
//! attempt 2 fails -> wait 2d
//! attempt 3 fails -> wait 4d
//! ...
//! retries exhausted -> last error returned unchanged
//! ```
//!
//! There is no jitter and no cap on the delay; retry counts are small.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, warn};

/// Retry count and initial delay for one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` means a single attempt.
    pub retries: u32,
    /// Delay before the first retry; doubled before each subsequent one.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, initial_delay_ms: u64) -> Self {
        Self {
            retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
        }
    }

    /// Fetching the site list.
    pub const SITE_LIST: RetryPolicy = RetryPolicy::new(3, 2000);
    /// Collecting articles from one site.
    pub const SCRAPE: RetryPolicy = RetryPolicy::new(2, 3000);
    /// Posting one site's digest.
    pub const POST: RetryPolicy = RetryPolicy::new(2, 2000);
}

/// Run `op` until it succeeds or `policy.retries` retries have been spent.
///
/// A warning naming the upcoming delay and the remaining retries is logged
/// before every wait. Once retries are exhausted the last error is returned
/// as-is.
pub async fn retry_with_backoff<T, E, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total_t0 = Instant::now();
    let mut retries_left = policy.retries;
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if retries_left == 0 => {
                error!(
                    label,
                    attempt,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %e,
                    "{label} exhausted retries"
                );
                return Err(e);
            }
            Err(e) => {
                warn!(
                    label,
                    attempt,
                    retries_left,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "⏳ Retrying in {}ms... ({} retries left)",
                    delay.as_millis(),
                    retries_left
                );
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                retries_left -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_backoff() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u32, String> =
            retry_with_backoff("flaky", RetryPolicy::new(3, 1000), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(format!("failure {n}"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_when_exhausted() {
        let attempts = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), String> =
            retry_with_backoff("always-fails", RetryPolicy::new(2, 500), || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(format!("failure {n}")) }
            })
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 500 + 1000, no wait after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_is_single_attempt() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), &str> =
            retry_with_backoff("once", RetryPolicy::new(0, 1000), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("nope") }
            })
            .await;

        assert_eq!(result, Err("nope"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_immediate_success_does_not_wait() {
        let start = Instant::now();
        let result: Result<&str, String> =
            retry_with_backoff("ok", RetryPolicy::SCRAPE, || async { Ok("done") }).await;
        assert_eq!(result, Ok("done"));
        assert!(start.elapsed() < Duration::from_millis(3000));
    }

    #[test]
    fn test_stage_policies() {
        assert_eq!(RetryPolicy::SITE_LIST, RetryPolicy::new(3, 2000));
        assert_eq!(RetryPolicy::SCRAPE.retries, 2);
        assert_eq!(RetryPolicy::SCRAPE.initial_delay, Duration::from_millis(3000));
        assert_eq!(RetryPolicy::POST, RetryPolicy::new(2, 2000));
    }
}

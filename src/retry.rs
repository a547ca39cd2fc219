//! Retry logic with exponential or linear backoff
//!
//! Every external call in the pipeline that is allowed to retry goes through
//! [`retry_with_backoff`] or [`retry_with_notify`]. The same executor serves the
//! fan-out upload path (exponential policy) and the sink write path (linear
//! policy); only the [`RetryPolicy`] differs.
//!
//! # Example
//!
//! ```no_run
//! use genbatch::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(10));
//! let url = retry_with_backoff(&policy, || async {
//!     // Your operation here
//!     Ok::<_, String>("https://cdn.example.com/photos/a.png".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub use crate::config::{Backoff, RetryPolicy};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// A failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// The attempt that failed (1-based)
    pub attempt: u32,
    /// Total attempts allowed by the policy
    pub max_attempts: u32,
    /// Delay before the next attempt
    pub delay: Duration,
    /// The error returned by the failed attempt
    pub error: &'a E,
}

/// Delay to wait after failed attempt `attempt` (1-based), before jitter
///
/// Jitter is added on top of this value and the sum is capped at `max_delay` again.
///
/// Exponential: `min(base * 2^(attempt-1), max)`. Linear: `min(attempt * base, max)`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let raw = match policy.backoff {
        Backoff::Exponential => 1u32
            .checked_shl(attempt - 1)
            .and_then(|factor| policy.base_delay.checked_mul(factor)),
        Backoff::Linear => policy.base_delay.checked_mul(attempt),
    };
    raw.unwrap_or(policy.max_delay).min(policy.max_delay)
}

/// Execute an async operation, retrying failures according to `policy`
///
/// Retries are logged through `tracing`. Returns the first success, or the
/// error of the final attempt unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_notify(policy, operation, |retry: RetryAttempt<'_, E>| {
        tracing::warn!(
            error = %retry.error,
            attempt = retry.attempt,
            max_attempts = retry.max_attempts,
            delay_ms = retry.delay.as_millis() as u64,
            "Operation failed, retrying"
        );
    })
    .await
}

/// Execute an async operation with retries, calling `on_retry` before each wait
///
/// The operation runs at most `policy.max_retries` times (at least once). The
/// callback is not invoked after the final attempt.
pub async fn retry_with_notify<F, Fut, T, E, N>(
    policy: &RetryPolicy,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    N: FnMut(RetryAttempt<'_, E>),
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt < max_attempts => {
                let delay = backoff_delay(policy, attempt);
                let delay = if policy.jitter {
                    add_jitter(delay).min(policy.max_delay)
                } else {
                    delay
                };

                on_retry(RetryAttempt {
                    attempt,
                    max_attempts,
                    delay,
                    error: &e,
                });

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempts = attempt,
                    "Operation failed after all retry attempts exhausted"
                );
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

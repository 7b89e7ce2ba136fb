// The one retry policy for oracle calls.
//
// Every attempt, first or retry, goes through the run's Pacer. A transient
// failure (`ServiceUnavailable`, `MalformedResponse`) is retried up to
// `max_retries` times. Before a retry the policy sleeps its exponential
// backoff; the Pacer then still holds the call until `interval` has passed
// since the failed attempt, so the gap between attempts is
// max(backoff, interval).
// When retries run out the caller gets `RetriesExhausted` carrying the last
// error. Non-transient errors (`NotFound`, `InvalidConfig`) come back as-is
// after the first attempt.

use std::future::Future;

use tokio::time::Duration;
use tracing::warn;

use super::pacer::Pacer;
use crate::error::{ReviewError, ReviewResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles for each one after.
    pub base_backoff: Duration,
    /// Cap on a single backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// No backoff beyond pacing. Handy for tests and for stubs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Most attempts a single call can make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Run `operation` under pacing and this policy.
    ///
    /// `what` names the call in log lines (e.g. `batch 3`).
    pub async fn run<F, Fut, T>(&self, pacer: &mut Pacer, what: &str, mut operation: F) -> ReviewResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ReviewResult<T>>,
    {
        let mut attempt = 1u32;

        loop {
            pacer.wait().await;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= self.max_attempts() => {
                    warn!(call = what, attempts = attempt, error = %err, "Retries exhausted");
                    return Err(ReviewError::RetriesExhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => {
                    let backoff = self.backoff(attempt);
                    warn!(
                        call = what,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient oracle failure, retrying"
                    );
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

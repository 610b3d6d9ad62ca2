//! Retry-with-backoff policy shared by page fetches and item downloads.
//!
//! The decision itself is a pure function of (error class, attempt, hint);
//! sleeping and jitter happen in [`retry_with_backoff`].

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorClass, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt. Doubles on every further attempt.
    pub base_delay: Duration,
    /// Hard cap on any computed or hinted delay.
    pub max_delay: Duration,
    /// Add random jitter of [0, base_delay/2) on top of the computed delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    RetryAfter(Duration),
    /// Stop and report the error.
    GiveUp,
}

impl RetryPolicy {
    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, class: ErrorClass, attempt: u32, hint: Option<Duration>) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        match class {
            ErrorClass::RetryableTransient => RetryDecision::RetryAfter(self.backoff(attempt)),
            ErrorClass::RateLimited => {
                let delay = hint
                    .map(|h| h.min(self.max_delay))
                    .unwrap_or_else(|| self.backoff(attempt));
                RetryDecision::RetryAfter(delay)
            }
            ErrorClass::Fatal | ErrorClass::PermanentItemFailure => RetryDecision::GiveUp,
        }
    }

    /// Exponential delay following attempt `attempt` (1-based), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Apply jitter, never exceeding `max_delay`.
    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }

        let range_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX) / 2;
        let headroom_ms = u64::try_from(self.max_delay.saturating_sub(delay).as_millis()).unwrap_or(0);
        let limit = range_ms.min(headroom_ms);
        if limit == 0 {
            return delay;
        }

        delay + Duration::from_millis(rand::thread_rng().gen_range(0..limit))
    }
}

/// Run `operation` until it succeeds, fails permanently, or attempts run out.
///
/// The closure receives the 1-based attempt number. Backoff sleeps are
/// interrupted by `cancel`, which yields [`Error::Cancelled`]; an attempt
/// already running is never interrupted. Returns the final result together
/// with the number of attempts made.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> (Result<T>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match operation(attempt).await {
            Ok(value) => return (Ok(value), attempt),
            Err(err) => err,
        };

        let delay = match policy.decide(err.class(), attempt, err.retry_after()) {
            RetryDecision::GiveUp => return (Err(err), attempt),
            RetryDecision::RetryAfter(delay) => policy.jittered(delay),
        };

        tracing::warn!(
            op = label,
            attempt,
            max = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after failure"
        );

        tokio::select! {
            _ = cancel.cancelled() => return (Err(Error::Cancelled), attempt),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

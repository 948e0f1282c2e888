use crate::error::{Result, TransferError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bounded retry-with-backoff for transfers that hit a commit conflict.
///
/// The executor itself never retries; callers opt in by passing a policy.
/// Only errors for which [`TransferError::is_retryable`] holds are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }

    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Upper bound of the wait before retry number `retry` (1-based).
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Wait before retry number `retry`, jittered to 50-100% of the ceiling
    /// so that conflicting workers do not retry in lockstep.
    pub fn backoff(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_ceiling(retry);
        ceiling.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// exhausts the retry budget, or `cancel` fires during a backoff.
    ///
    /// Returns the final result together with the number of attempts made.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> (Result<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error: TransferError = match operation().await {
                Ok(value) => return (Ok(value), attempts),
                Err(e) => e,
            };

            if !error.is_retryable() || attempts > self.max_retries {
                return (Err(error), attempts);
            }

            let wait = self.backoff(attempts);
            debug!("attempt {} failed: {}, retrying in {:?}", attempts, error, wait);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return (Err(error), attempts),
            }
        }
    }
}

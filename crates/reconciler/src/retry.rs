//! Retry of transient snapshot write failures.

use std::{future::Future, time::Duration};

/// The backoff schedule applied to snapshot writes.
///
/// A write is attempted up to `attempts` times. The delay between two attempts starts at
/// `backoff` and doubles after every failure, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRetry {
    /// The total number of attempts, including the first one.
    pub attempts: usize,
    /// The delay after the first failure.
    pub backoff: Duration,
    /// The upper bound of the delay.
    pub max_backoff: Duration,
}

impl Default for WriteRetry {
    fn default() -> Self {
        Self {
            attempts: 4,
            backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl WriteRetry {
    /// A policy that never retries.
    pub const NONE: Self =
        Self { attempts: 1, backoff: Duration::ZERO, max_backoff: Duration::ZERO };

    /// Returns the delay to wait after the `failures`-th consecutive failure.
    pub fn delay(&self, failures: usize) -> Duration {
        let shift = failures.saturating_sub(1).min(16) as u32;
        self.backoff.saturating_mul(1 << shift).min(self.max_backoff)
    }

    /// Runs `write` until it succeeds or the attempts are spent, returning the last error.
    pub async fn run<F, Fut, T, E>(&self, key: &str, mut write: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut failures = 0;
        loop {
            let error = match write().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            failures += 1;
            if failures >= self.attempts.max(1) {
                return Err(error)
            }

            let delay = self.delay(failures);
            tracing::debug!(target: "bridge_history::reconciler", key, %error, failures, ?delay, "snapshot write failed, retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

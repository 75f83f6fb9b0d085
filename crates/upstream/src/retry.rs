//! Bounded retry with exponential backoff for outbound calls.
//!
//! Only errors classified as transient by [`AppError::is_transient`] are retried.
//! The default policy performs a single attempt.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;

use assure_common::error::AppError;

/// Default first delay between attempts.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Default cap on the delay between attempts.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (always >= 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    pub fn single_attempt() -> Self {
        Self::new(1, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }

    /// Delays slept between consecutive attempts: doubling, capped, no jitter.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = self.backoff();
        (1..self.max_attempts)
            .map(|_| delays.next_backoff().unwrap_or(self.max_backoff))
            .collect()
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut delays = self.backoff();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && e.is_transient() => {
                    let delay = delays.next_backoff().unwrap_or(self.max_backoff);
                    tracing::warn!(
                        call = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

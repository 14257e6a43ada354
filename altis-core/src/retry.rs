use crate::CoreResult;
use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Bounded replay of operations aborted by serialization conflicts.
///
/// Delays grow exponentially from `initial_delay_ms`, are capped at
/// `max_delay_ms`, and carry 50-100% jitter so colliding sessions spread out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 10,
            max_delay_ms: 200,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Delay before replaying after the given 0-based failed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);

        Duration::from_secs_f64((capped * jitter).max(0.0) / 1000.0)
    }

    /// Runs `operation`, replaying it while it fails with
    /// [`crate::CoreError::StorageConflict`] and attempts remain. Any other outcome
    /// is returned as is.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_fn().await {
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for_attempt(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Serialization conflict, replaying transaction"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_retryable() => {
                    error!(operation, attempts = attempt, "Giving up after repeated serialization conflicts");
                    return Err(err);
                }
                outcome => return outcome,
            }
        }
    }
}

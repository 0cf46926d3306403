//! Bounded retry with exponential backoff
//!
//! Every cloud API call made by a build step goes through a [`RetryPolicy`].
//! The eligibility predicate is explicit configuration: the default retries
//! only errors classified transient by [`CloudError::is_transient`], so a
//! NotFound or Conflict fails fast instead of burning the attempt budget.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type RetryPredicate = Arc<dyn Fn(&CloudError) -> bool + Send + Sync>;

/// Retry configuration for one category of API call.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    should_retry: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            should_retry: Arc::new(CloudError::is_transient),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries. Useful where a caller wants a single
    /// attempt with the same calling convention.
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    pub fn with_should_retry(
        mut self,
        predicate: impl Fn(&CloudError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Backoff delay before attempt `attempt + 1` (zero-based), doubling from
    /// the initial delay and capped at the maximum.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(31) as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }

    /// Run `op` until it succeeds, the attempt budget is exhausted, the error
    /// is not retry-eligible, or `cancel` fires. Cancellation is observed
    /// before every attempt and during every backoff sleep.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(CloudError::Cancelled);
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !(self.should_retry)(&err) {
                        return Err(err);
                    }
                    let delay = self.delay_for_attempt(attempt - 1);
                    tracing::debug!(attempt, ?delay, error = %err, "retrying after transient error");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(CloudError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

//! Fixed-interval status polling with a timeout budget
//!
//! Asynchronous resource lifecycles (instance boot, image capture, remote
//! copy) are tracked by polling a status read until the target status is
//! reached or the budget runs out. Each individual read goes through the
//! poller's [`RetryPolicy`]; the loop itself checks cancellation at every
//! iteration boundary so an operator interrupt is honored without waiting
//! out a full interval.

use crate::error::{CloudError, Result};
use crate::retry::RetryPolicy;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default interval between status reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct StatusPoller {
    interval: Duration,
    timeout: Duration,
    retry: RetryPolicy,
}

impl StatusPoller {
    /// Poller with the default 5s interval and retry policy.
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Poll `read` until it returns `target`.
    ///
    /// `resource_id` only feeds the timeout error message. The budget is
    /// decremented by one interval per iteration, after the sleep, so a
    /// budget of N units with interval I yields exactly ceil(N / I) reads
    /// before timing out.
    pub async fn wait_for<S, F, Fut>(
        &self,
        cancel: &CancellationToken,
        resource_id: &str,
        target: S,
        mut read: F,
    ) -> Result<()>
    where
        S: PartialEq + std::fmt::Display + Copy,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let mut remaining = self.timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(CloudError::Cancelled);
            }

            let status = self.retry.run(cancel, &mut read).await?;
            if status == target {
                return Ok(());
            }
            tracing::debug!(resource = resource_id, current = %status, target = %target, "status not reached yet");

            tokio::select! {
                _ = cancel.cancelled() => return Err(CloudError::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }

            remaining = remaining.saturating_sub(self.interval);
            if remaining.is_zero() {
                return Err(CloudError::Timeout {
                    resource: resource_id.to_string(),
                    target: target.to_string(),
                    budget_secs: self.timeout.as_secs(),
                });
            }
        }
    }
}

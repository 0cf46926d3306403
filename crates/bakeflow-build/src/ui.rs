//! Operator-facing message sink
//!
//! Steps report progress through a [`Ui`] rather than logging directly, so
//! an embedding application can route messages to a terminal, a job log, or
//! a test recorder. [`TracingUi`] is the default sink.

/// Message sink for one build run.
pub trait Ui: Send + Sync {
    /// Announce the start of an operation.
    fn say(&self, message: &str);
    /// Report detail or a success within an operation.
    fn message(&self, message: &str);
    /// Report a failure. Cleanup failures go here with a remediation hint.
    fn error(&self, message: &str);
}

/// Routes build messages to `tracing`.
#[derive(Debug, Default)]
pub struct TracingUi;

impl Ui for TracingUi {
    fn say(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn message(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

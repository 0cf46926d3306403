//! Cloud API error types

use thiserror::Error;

/// Errors surfaced by cloud API operations and the retry/poll primitives.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("cloud API error: {message}")]
    Api { message: String, transient: bool },

    #[error("wait for {resource} to reach status {target} timed out after {budget_secs}s")]
    Timeout {
        resource: String,
        target: String,
        budget_secs: u64,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{} teardown failures: {}", .0.len(), join_messages(.0))]
    PartialFailure(Vec<CloudError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_messages(errors: &[CloudError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CloudError {
    /// A backend or network failure that is expected to clear on retry.
    pub fn transient(message: impl Into<String>) -> Self {
        CloudError::Api {
            message: message.into(),
            transient: true,
        }
    }

    /// A permanent API failure.
    pub fn api(message: impl Into<String>) -> Self {
        CloudError::Api {
            message: message.into(),
            transient: false,
        }
    }

    /// Whether a bounded retry is worthwhile for this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Api { transient: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

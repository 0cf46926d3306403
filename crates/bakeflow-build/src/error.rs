//! Build pipeline error types

use bakeflow_cloud::CloudError;
use bakeflow_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A cloud operation failed; the context names the operation and the
    /// resource involved.
    #[error("{context}: {source}")]
    Cloud {
        context: String,
        source: CloudError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("provisioning failed: {0}")]
    Provision(#[source] anyhow::Error),

    /// A shared-context value was read before the step that records it ran.
    /// Reaching this is a pipeline-ordering bug, not an operator mistake.
    #[error("{0}")]
    State(String),

    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    pub fn cloud(context: impl Into<String>, source: CloudError) -> Self {
        match source {
            CloudError::Cancelled => BuildError::Cancelled,
            source => BuildError::Cloud {
                context: context.into(),
                source,
            },
        }
    }

    /// Whether this error is an observed cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

//! Image build pipeline
//!
//! Runs an ordered sequence of steps against a cloud backend: prepare
//! networking and credentials, launch a build instance, provision it,
//! capture a custom image, and copy and share the result. Every transient
//! resource a run creates is torn down in reverse order on failure,
//! cancellation, and success alike; only the produced images survive.

pub mod artifact;
pub mod context;
pub mod error;
pub mod hook;
pub mod runner;
pub mod step;
pub mod steps;
pub mod ui;

pub use artifact::Artifact;
pub use context::{BuildContext, SharedContext};
pub use error::{BuildError, Result};
pub use hook::ProvisionHook;
pub use runner::{BuildOutcome, Builder};
pub use step::{Ownership, Step};
pub use ui::{TracingUi, Ui};

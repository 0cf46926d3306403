//! Step abstraction
//!
//! A step owns the creation and teardown of one cloud resource. `run` moves
//! the pipeline forward; an `Err` halts it and triggers the reverse-order
//! cleanup cascade. `cleanup` must never fail: it reports problems through
//! the UI sink with a remediation hint and returns.

use crate::context::BuildContext;
use crate::error::Result;
use async_trait::async_trait;

/// Whether this run created the step's resource, reused a caller-supplied
/// one, or never got to it. Only `Created` is eligible for cleanup: a step
/// must never delete a resource it did not create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    #[default]
    NotRun,
    Created,
    Reused,
}

impl Ownership {
    pub fn owns(self) -> bool {
        self == Ownership::Created
    }
}

#[async_trait]
pub trait Step: Send {
    /// Short name used in logs and cleanup messages.
    fn name(&self) -> &'static str;

    /// Forward execution. An `Err` halts the pipeline.
    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()>;

    /// Compensating cleanup. Runs in reverse execution order on halt or
    /// cancellation, and additionally after success for steps that answer
    /// true to [`Step::cleanup_always`].
    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        let _ = ctx;
    }

    /// Steps owning transient scaffolding (network, key pair, build
    /// instance) return true: their resources are removed after a
    /// successful build too. The produced image must never be touched on
    /// success, so image steps keep the default.
    fn cleanup_always(&self) -> bool {
        false
    }
}

/// Standard preamble for a cleanup that is about to delete something,
/// distinguishing the failure cascade from routine teardown.
pub(crate) fn cleanup_message(ctx: &BuildContext, what: &str) {
    if ctx.state.cancelled {
        ctx.ui.say(&format!("Deleting {what} because of cancellation..."));
    } else if ctx.state.halted {
        ctx.ui.say(&format!("Deleting {what} because of error..."));
    } else {
        ctx.ui.say(&format!("Cleaning up '{what}'..."));
    }
}

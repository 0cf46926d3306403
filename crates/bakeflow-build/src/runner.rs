//! Pipeline orchestrator
//!
//! Runs the ordered step sequence, stops forward progress on the first halt
//! or observed cancellation, and drives the reverse-order cleanup cascade.
//! The sequence is fixed at construction; this is deliberately an ordered
//! list, not a dependency graph, because the dependencies in this domain
//! are strictly linear.

use crate::artifact::Artifact;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::step::Step;
use crate::steps::{
    DetachKeyPairStep, ImageCopyStep, ImageCreateStep, ImageShareStep, InstanceStep, KeyPairStep,
    NetworkStep, PreValidateStep, ProvisionStep, SecurityGroupStep, SubnetStep,
};
use bakeflow_config::BuildConfig;

/// Terminal outcome of one build run.
pub enum BuildOutcome {
    /// Every step completed; the artifact is the deliverable.
    Succeeded(Artifact),
    /// A step reported an unrecoverable failure.
    Halted(BuildError),
    /// An external interrupt stopped the run.
    Cancelled,
}

impl BuildOutcome {
    pub fn artifact(self) -> Option<Artifact> {
        match self {
            BuildOutcome::Succeeded(artifact) => Some(artifact),
            _ => None,
        }
    }
}

pub struct Builder {
    steps: Vec<Box<dyn Step>>,
}

impl Builder {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// The standard image-baking pipeline for a prepared configuration.
    pub fn standard(config: &BuildConfig) -> Self {
        Self::new(vec![
            Box::new(PreValidateStep::from_config(config)),
            Box::new(KeyPairStep::from_config(config)),
            Box::new(NetworkStep::from_config(config)),
            Box::new(SubnetStep::from_config(config)),
            Box::new(SecurityGroupStep::from_config(config)),
            Box::new(InstanceStep::from_config(config)),
            Box::new(ProvisionStep::new()),
            Box::new(DetachKeyPairStep::new()),
            Box::new(ImageCreateStep::from_config(config)),
            Box::new(ImageCopyStep::from_config(config)),
            Box::new(ImageShareStep::from_config(config)),
        ])
    }

    /// Run the pipeline to a terminal outcome.
    ///
    /// Cleanup runs on every step whose `run` was invoked, including the
    /// halting step itself, in strict reverse order. After a success only
    /// `cleanup_always` steps are cleaned, so the produced images survive.
    pub async fn run(mut self, ctx: &mut BuildContext) -> BuildOutcome {
        let mut executed = 0usize;
        let mut halt_error = None;

        for step in self.steps.iter_mut() {
            if ctx.cancel.is_cancelled() {
                ctx.state.cancelled = true;
                break;
            }

            tracing::debug!(step = step.name(), "running step");
            executed += 1;
            if let Err(err) = step.run(ctx).await {
                if err.is_cancelled() {
                    ctx.state.cancelled = true;
                } else {
                    ctx.state.halted = true;
                    ctx.ui.error(&err.to_string());
                    halt_error = Some(err);
                }
                break;
            }
        }

        if !ctx.state.halted && ctx.cancel.is_cancelled() {
            ctx.state.cancelled = true;
        }

        let failed = ctx.state.halted || ctx.state.cancelled;
        for step in self.steps[..executed].iter_mut().rev() {
            if failed || step.cleanup_always() {
                tracing::debug!(step = step.name(), "cleaning up step");
                step.cleanup(ctx).await;
            }
        }

        if ctx.state.cancelled {
            BuildOutcome::Cancelled
        } else if let Some(err) = halt_error {
            BuildOutcome::Halted(err)
        } else {
            let artifact = Artifact::new(ctx.state.images().clone(), ctx.clients.clone());
            ctx.ui.say(&artifact.to_string());
            BuildOutcome::Succeeded(artifact)
        }
    }
}

//! Provision step: hands the running instance to the caller's hook.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::Step;
use async_trait::async_trait;

#[derive(Default)]
pub struct ProvisionStep;

impl ProvisionStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for ProvisionStep {
    fn name(&self) -> &'static str {
        "provision"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let Some(hook) = ctx.hook.clone() else {
            return Ok(());
        };
        let instance = ctx.state.instance()?.clone();

        ctx.ui.say("Provisioning the build instance...");
        hook.provision(&instance, ctx.state.private_key(), ctx.ui.as_ref())
            .await
            .map_err(BuildError::Provision)?;
        ctx.ui.message("Provisioning finished");
        Ok(())
    }
}

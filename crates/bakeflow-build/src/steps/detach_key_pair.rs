//! Detach step.
//!
//! A temporary key pair must not be referenced by the instance when the
//! image is captured, otherwise the key would be baked into every machine
//! launched from it. Detaching restarts the agent on the instance, so the
//! step waits for the instance to report running again before the image
//! step takes over.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::Step;
use async_trait::async_trait;
use bakeflow_cloud::{InstanceStatus, StatusPoller};
use std::time::Duration;

const SETTLE_BUDGET: Duration = Duration::from_secs(600);

#[derive(Default)]
pub struct DetachKeyPairStep;

impl DetachKeyPairStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for DetachKeyPairStep {
    fn name(&self) -> &'static str {
        "detach-key-pair"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        let Some(key_pair_id) = ctx.state.temporary_key_pair_id().map(str::to_string) else {
            return Ok(());
        };
        let instance_id = ctx.state.instance_id()?.to_string();

        ctx.ui.say(&format!(
            "Detaching temporary key pair({key_pair_id}) from instance({instance_id})..."
        ));
        let client = ctx.compute();
        let instances = vec![instance_id.clone()];
        ctx.retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let key_pair_id = key_pair_id.clone();
                let instances = instances.clone();
                async move { client.detach_key_pair(&key_pair_id, &instances).await }
            })
            .await
            .map_err(|e| {
                BuildError::cloud(format!("failed to detach key pair({key_pair_id})"), e)
            })?;
        ctx.ui.message("Detached the temporary key pair");

        ctx.ui.say(&format!(
            "Waiting for instance({instance_id}) to be running again..."
        ));
        StatusPoller::new(SETTLE_BUDGET)
            .with_retry(ctx.retry.clone())
            .wait_for(&ctx.cancel, &instance_id, InstanceStatus::Running, || {
                let client = client.clone();
                let instance_id = instance_id.clone();
                async move { Ok(client.get_instance(&instance_id).await?.status) }
            })
            .await
            .map_err(|e| {
                BuildError::cloud(
                    format!("error waiting for instance({instance_id}) after detaching"),
                    e,
                )
            })?;
        Ok(())
    }
}

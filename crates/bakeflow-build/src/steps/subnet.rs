//! Subnet step: verify a caller-supplied subnet or create a temporary one
//! inside the network recorded by the network step.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Ownership, Step, cleanup_message};
use async_trait::async_trait;
use bakeflow_cloud::{CreateSubnetArgs, client_token};
use bakeflow_config::BuildConfig;
use tokio_util::sync::CancellationToken;

pub struct SubnetStep {
    use_default_network: bool,
    subnet_id: Option<String>,
    name: String,
    cidr: String,
    zone: String,
    ownership: Ownership,
}

impl SubnetStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            use_default_network: config.run.use_default_network,
            subnet_id: super::none_if_empty(&config.run.subnet_id),
            name: config.run.subnet_name.clone(),
            cidr: config.run.subnet_cidr.clone(),
            zone: config.access.zone.clone(),
            ownership: Ownership::default(),
        }
    }
}

#[async_trait]
impl Step for SubnetStep {
    fn name(&self) -> &'static str {
        "subnet"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.use_default_network {
            return Ok(());
        }

        let client = ctx.network();

        if let Some(id) = self.subnet_id.clone() {
            ctx.ui.say(&format!("Checking the specified subnet({id})..."));
            let detail = client
                .get_subnet(&id)
                .await
                .map_err(|e| BuildError::cloud(format!("failed to describe subnet({id})"), e))?;
            ctx.state.set_subnet_id(detail.id);
            self.ownership = Ownership::Reused;
            return Ok(());
        }

        ctx.ui
            .say(&format!("Creating a temporary subnet: {}", self.name));
        let args = CreateSubnetArgs {
            client_token: client_token(),
            network_id: ctx.state.network_id()?.to_string(),
            zone: self.zone.clone(),
            name: self.name.clone(),
            cidr: self.cidr.clone(),
            description: "temporary subnet created by bakeflow".to_string(),
        };
        let id = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let args = args.clone();
                async move { client.create_subnet(&args).await }
            })
            .await
            .map_err(|e| BuildError::cloud("failed to create subnet", e))?;

        ctx.ui.message(&format!("Created subnet: {id}"));
        ctx.state.set_subnet_id(id.clone());
        self.subnet_id = Some(id);
        self.ownership = Ownership::Created;
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if !self.ownership.owns() {
            return;
        }
        let Some(id) = self.subnet_id.clone() else {
            return;
        };

        cleanup_message(ctx, "subnet");
        let cancel = CancellationToken::new();
        let client = ctx.network();
        let token = client_token();
        let result = ctx
            .retry
            .run(&cancel, || {
                let client = client.clone();
                let id = id.clone();
                let token = token.clone();
                async move { client.delete_subnet(&id, &token).await }
            })
            .await;
        if let Err(err) = result {
            ctx.ui.error(&format!(
                "Failed to delete subnet({id}), please delete it manually: {err}"
            ));
        }
    }

    fn cleanup_always(&self) -> bool {
        true
    }
}

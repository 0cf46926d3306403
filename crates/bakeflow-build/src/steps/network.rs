//! Network step: verify a caller-supplied network or create a temporary one.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Ownership, Step, cleanup_message};
use async_trait::async_trait;
use bakeflow_cloud::{CreateNetworkArgs, client_token};
use bakeflow_config::BuildConfig;
use tokio_util::sync::CancellationToken;

pub struct NetworkStep {
    use_default_network: bool,
    network_id: Option<String>,
    name: String,
    cidr: String,
    ownership: Ownership,
}

impl NetworkStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            use_default_network: config.run.use_default_network,
            network_id: super::none_if_empty(&config.run.network_id),
            name: config.run.network_name.clone(),
            cidr: config.run.network_cidr.clone(),
            ownership: Ownership::default(),
        }
    }
}

#[async_trait]
impl Step for NetworkStep {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.use_default_network {
            return Ok(());
        }

        let client = ctx.network();

        if let Some(id) = self.network_id.clone() {
            ctx.ui.say(&format!("Checking the specified network({id})..."));
            let detail = client
                .get_network(&id)
                .await
                .map_err(|e| BuildError::cloud(format!("failed to describe network({id})"), e))?;
            ctx.state.set_network_id(detail.id);
            self.ownership = Ownership::Reused;
            return Ok(());
        }

        ctx.ui
            .say(&format!("Creating a temporary network: {}", self.name));
        let args = CreateNetworkArgs {
            client_token: client_token(),
            name: self.name.clone(),
            cidr: self.cidr.clone(),
            description: "temporary network created by bakeflow".to_string(),
        };
        let id = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let args = args.clone();
                async move { client.create_network(&args).await }
            })
            .await
            .map_err(|e| BuildError::cloud("failed to create network", e))?;

        ctx.ui.message(&format!("Created network: {id}"));
        ctx.state.set_network_id(id.clone());
        self.network_id = Some(id);
        self.ownership = Ownership::Created;
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if !self.ownership.owns() {
            return;
        }
        let Some(id) = self.network_id.clone() else {
            return;
        };

        cleanup_message(ctx, "network");
        // The build token may already have fired; teardown gets its own.
        let cancel = CancellationToken::new();
        let client = ctx.network();
        let token = client_token();
        let result = ctx
            .retry
            .run(&cancel, || {
                let client = client.clone();
                let id = id.clone();
                let token = token.clone();
                async move { client.delete_network(&id, &token).await }
            })
            .await;
        if let Err(err) = result {
            ctx.ui.error(&format!(
                "Failed to delete network({id}), please delete it manually: {err}"
            ));
        }
    }

    fn cleanup_always(&self) -> bool {
        true
    }
}

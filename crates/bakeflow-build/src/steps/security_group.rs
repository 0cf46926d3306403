//! Security group step.
//!
//! A caller-supplied id is verified against the groups attached to the
//! build network; otherwise a temporary group with open ingress and egress
//! is created. The build instance only lives for the length of one build,
//! so the open rules are acceptable.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Ownership, Step, cleanup_message};
use async_trait::async_trait;
use bakeflow_cloud::{CloudError, CreateSecurityGroupArgs, SecurityGroupRule, client_token};
use bakeflow_config::BuildConfig;
use tokio_util::sync::CancellationToken;

pub struct SecurityGroupStep {
    use_default_network: bool,
    security_group_id: Option<String>,
    name: String,
    ownership: Ownership,
}

impl SecurityGroupStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            use_default_network: config.run.use_default_network,
            security_group_id: super::none_if_empty(&config.run.security_group_id),
            name: config.run.security_group_name.clone(),
            ownership: Ownership::default(),
        }
    }
}

#[async_trait]
impl Step for SecurityGroupStep {
    fn name(&self) -> &'static str {
        "security-group"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.use_default_network {
            return Ok(());
        }

        let client = ctx.compute();
        let network_id = ctx.state.network_id()?.to_string();

        if let Some(id) = self.security_group_id.clone() {
            ctx.ui
                .say(&format!("Checking the specified security group({id})..."));
            let groups = client.list_security_groups(&network_id).await.map_err(|e| {
                BuildError::cloud(
                    format!("failed to list security groups of network({network_id})"),
                    e,
                )
            })?;
            if !groups.iter().any(|group| group.id == id) {
                return Err(BuildError::cloud(
                    format!(
                        "the specified security group({id}) does not belong to network({network_id})"
                    ),
                    CloudError::NotFound(id),
                ));
            }
            ctx.state.set_security_group_id(id);
            self.ownership = Ownership::Reused;
            return Ok(());
        }

        ctx.ui.say(&format!(
            "Creating a temporary security group: {}",
            self.name
        ));
        let args = CreateSecurityGroupArgs {
            client_token: client_token(),
            network_id,
            name: self.name.clone(),
            description: "temporary security group created by bakeflow".to_string(),
            rules: vec![
                SecurityGroupRule {
                    remark: "all ingress allowed by bakeflow".to_string(),
                    direction: "ingress".to_string(),
                },
                SecurityGroupRule {
                    remark: "all egress allowed by bakeflow".to_string(),
                    direction: "egress".to_string(),
                },
            ],
        };
        let id = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let args = args.clone();
                async move { client.create_security_group(&args).await }
            })
            .await
            .map_err(|e| BuildError::cloud("failed to create security group", e))?;

        ctx.ui.message(&format!("Created security group: {id}"));
        ctx.state.set_security_group_id(id.clone());
        self.security_group_id = Some(id);
        self.ownership = Ownership::Created;
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if !self.ownership.owns() {
            return;
        }
        let Some(id) = self.security_group_id.clone() else {
            return;
        };

        cleanup_message(ctx, "security group");
        let cancel = CancellationToken::new();
        let client = ctx.compute();
        let result = ctx
            .retry
            .run(&cancel, || {
                let client = client.clone();
                let id = id.clone();
                async move { client.delete_security_group(&id).await }
            })
            .await;
        if let Err(err) = result {
            ctx.ui.error(&format!(
                "Failed to delete security group({id}), please delete it manually: {err}"
            ));
        }
    }

    fn cleanup_always(&self) -> bool {
        true
    }
}

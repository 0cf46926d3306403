//! Build instance step.
//!
//! Composes the launch request from the prepared config plus everything the
//! earlier steps recorded, submits it, and polls until the instance is
//! running. The instance id is owned the moment the create call returns, so
//! an instance that never finishes booting is still torn down.

use crate::context::{BuildContext, SharedContext};
use crate::error::{BuildError, Result};
use crate::step::{Ownership, Step, cleanup_message};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bakeflow_cloud::{
    CloudError, CreateInstanceArgs, DataDiskArgs, InstanceStatus, PublicIpArgs, StatusPoller, Tag,
    client_token,
};
use bakeflow_config::{BuildConfig, RunConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INSTANCE_READY_BUDGET: Duration = Duration::from_secs(1800);

pub struct InstanceStep {
    run: RunConfig,
    zone: String,
    instance_id: Option<String>,
    ownership: Ownership,
}

impl InstanceStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            run: config.run.clone(),
            zone: config.access.zone.clone(),
            instance_id: None,
            ownership: Ownership::default(),
        }
    }

    async fn load_user_data(&self) -> Result<Option<String>> {
        let raw = if !self.run.user_data_file.is_empty() {
            tokio::fs::read_to_string(&self.run.user_data_file)
                .await
                .map_err(|e| {
                    BuildError::cloud(
                        format!("failed to read user_data_file {}", self.run.user_data_file),
                        CloudError::Io(e),
                    )
                })?
        } else {
            self.run.user_data.clone()
        };
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(BASE64.encode(raw.as_bytes())))
    }

    async fn create_args(&self, state: &SharedContext) -> Result<CreateInstanceArgs> {
        let run = &self.run;

        let name = if run.instance_name.is_empty() {
            let id = uuid::Uuid::new_v4().simple().to_string();
            format!("bakeflow-{}", &id[..8])
        } else {
            run.instance_name.clone()
        };

        // A configured key pair wins; otherwise fall back to the temporary
        // one, if the key pair step created any.
        let key_pair_id = if !run.key_pair_id.is_empty() {
            Some(run.key_pair_id.clone())
        } else {
            state.temporary_key_pair_id().map(str::to_string)
        };

        let admin_password = if !run.ssh_password.is_empty() {
            Some(run.ssh_password.clone())
        } else if !run.winrm_password.is_empty() {
            Some(run.winrm_password.clone())
        } else {
            None
        };

        let (subnet_id, security_group_id) = if run.use_default_network {
            (None, None)
        } else {
            (
                Some(state.subnet_id()?.to_string()),
                Some(state.security_group_id()?.to_string()),
            )
        };

        let public_ip = run.associate_public_ip.then(|| PublicIpArgs {
            eip_name: run.eip_name.clone(),
            bandwidth_mbps: run.network_capacity_mbps,
            charge_type: run.internet_charge_type.clone(),
        });

        Ok(CreateInstanceArgs {
            client_token: client_token(),
            source_image_id: run.source_image_id.clone(),
            name,
            spec: run.instance_spec.clone(),
            zone: self.zone.clone(),
            root_disk_size_gb: (run.root_disk_size_gb > 0).then_some(run.root_disk_size_gb),
            root_disk_storage_type: super::none_if_empty(&run.root_disk_storage_type),
            admin_password,
            key_pair_id,
            subnet_id,
            security_group_id,
            user_data: self.load_user_data().await?,
            data_disks: run
                .data_disks
                .iter()
                .map(|disk| DataDiskArgs {
                    size_gb: disk.size_gb,
                    storage_type: disk.storage_type.clone(),
                    snapshot_id: disk.snapshot_id.clone(),
                })
                .collect(),
            tags: run
                .run_tags
                .iter()
                .map(|(key, value)| Tag {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            public_ip,
        })
    }
}

#[async_trait]
impl Step for InstanceStep {
    fn name(&self) -> &'static str {
        "instance"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        ctx.ui.say("Creating the build instance...");
        let args = self.create_args(&ctx.state).await?;
        let client = ctx.compute();

        let id = client
            .create_instance(&args)
            .await
            .map_err(|e| BuildError::cloud("failed to create instance", e))?;
        self.instance_id = Some(id.clone());
        self.ownership = Ownership::Created;
        ctx.ui.message(&format!("Created instance: {id}"));

        ctx.ui
            .say(&format!("Waiting for instance({id}) to become running..."));
        StatusPoller::new(INSTANCE_READY_BUDGET)
            .with_retry(ctx.retry.clone())
            .wait_for(&ctx.cancel, &id, InstanceStatus::Running, || {
                let client = client.clone();
                let id = id.clone();
                async move { Ok(client.get_instance(&id).await?.status) }
            })
            .await
            .map_err(|e| BuildError::cloud(format!("error waiting for instance({id})"), e))?;

        let detail = client
            .get_instance(&id)
            .await
            .map_err(|e| BuildError::cloud(format!("failed to describe instance({id})"), e))?;
        if let Some(ip) = &detail.public_ip {
            ctx.ui.message(&format!("Instance public IP: {ip}"));
        }
        if let Some(ip) = &detail.internal_ip {
            ctx.ui.message(&format!("Instance internal IP: {ip}"));
        }

        ctx.state.set_instance_id(id);
        ctx.state.set_instance(detail);
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if !self.ownership.owns() {
            return;
        }
        let Some(id) = self.instance_id.clone() else {
            return;
        };

        cleanup_message(ctx, "instance");
        let cancel = CancellationToken::new();
        let client = ctx.compute();
        let token = client_token();
        // Cascading delete: the attached public IP goes with the instance.
        let result = ctx
            .retry
            .run(&cancel, || {
                let client = client.clone();
                let id = id.clone();
                let token = token.clone();
                async move { client.delete_instance_with_resources(&id, &token).await }
            })
            .await;
        if let Err(err) = result {
            ctx.ui.error(&format!(
                "Failed to delete instance({id}), please delete it manually: {err}"
            ));
        }
    }

    fn cleanup_always(&self) -> bool {
        true
    }
}

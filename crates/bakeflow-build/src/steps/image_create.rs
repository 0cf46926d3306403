//! Image capture step.
//!
//! Creates the custom image from the provisioned instance and waits for it
//! to become available. Unlike the scaffolding steps, cleanup only runs
//! when the build failed or was cancelled: the image is the deliverable and
//! must survive a successful run.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::{Step, cleanup_message};
use async_trait::async_trait;
use bakeflow_cloud::{CreateImageArgs, ImageStatus, StatusPoller, client_token};
use bakeflow_config::BuildConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const IMAGE_READY_BUDGET: Duration = Duration::from_secs(1800);

pub struct ImageCreateStep {
    image_name: String,
    region: String,
    image_id: Option<String>,
}

impl ImageCreateStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            image_name: config.image.image_name.clone(),
            region: config.access.region.clone(),
            image_id: None,
        }
    }
}

#[async_trait]
impl Step for ImageCreateStep {
    fn name(&self) -> &'static str {
        "image-create"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        ctx.ui
            .say(&format!("Creating a custom image: {}", self.image_name));
        let client = ctx.compute();
        let args = CreateImageArgs {
            client_token: client_token(),
            name: self.image_name.clone(),
            instance_id: ctx.state.instance_id()?.to_string(),
        };
        let image_id = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let args = args.clone();
                async move { client.create_image(&args).await }
            })
            .await
            .map_err(|e| BuildError::cloud("failed to create image", e))?;
        self.image_id = Some(image_id.clone());
        ctx.ui.message(&format!("Created image: {image_id}"));

        ctx.ui.say(&format!(
            "Waiting for image({image_id}) to become available..."
        ));
        StatusPoller::new(IMAGE_READY_BUDGET)
            .with_retry(ctx.retry.clone())
            .wait_for(&ctx.cancel, &image_id, ImageStatus::Available, || {
                let client = client.clone();
                let image_id = image_id.clone();
                async move { Ok(client.get_image(&image_id).await?.status) }
            })
            .await
            .map_err(|e| BuildError::cloud(format!("error waiting for image({image_id})"), e))?;

        ctx.state.set_image_id(image_id.clone());
        ctx.state.record_image(self.region.clone(), image_id);
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        let Some(image_id) = self.image_id.clone() else {
            return;
        };
        // The image survives a successful build.
        if !ctx.state.halted && !ctx.state.cancelled {
            return;
        }

        cleanup_message(ctx, "image");
        let cancel = CancellationToken::new();
        let client = ctx.compute();
        let result = ctx
            .retry
            .run(&cancel, || {
                let client = client.clone();
                let image_id = image_id.clone();
                async move { client.delete_image(&image_id).await }
            })
            .await;
        if let Err(err) = result {
            ctx.ui.error(&format!(
                "Failed to delete image({image_id}), please delete it manually: {err}"
            ));
        }
    }
}

//! Pre-flight validation.
//!
//! Fails the build before any resource is created when the source image is
//! missing or the output image name is already taken. Skippable for
//! operators who accept the backend rejecting the build later instead.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::Step;
use async_trait::async_trait;
use bakeflow_cloud::CloudError;
use bakeflow_config::BuildConfig;

pub struct PreValidateStep {
    skip: bool,
    source_image_id: String,
    image_name: String,
}

impl PreValidateStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            skip: config.image.skip_image_validation,
            source_image_id: config.run.source_image_id.clone(),
            image_name: config.image.image_name.clone(),
        }
    }
}

#[async_trait]
impl Step for PreValidateStep {
    fn name(&self) -> &'static str {
        "pre-validate"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.skip {
            ctx.ui.say("Skipping image validation");
            return Ok(());
        }

        let client = ctx.compute();

        ctx.ui.say(&format!(
            "Checking the source image({})...",
            self.source_image_id
        ));
        client
            .get_image(&self.source_image_id)
            .await
            .map_err(|e| {
                BuildError::cloud(
                    format!("failed to find the source image({})", self.source_image_id),
                    e,
                )
            })?;

        ctx.ui.say(&format!(
            "Checking that the image name({}) is unused...",
            self.image_name
        ));
        let name = self.image_name.clone();
        let existing = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let name = name.clone();
                async move { client.list_images_by_name(&name).await }
            })
            .await
            .map_err(|e| BuildError::cloud("failed to list existing images", e))?;
        if let Some(image) = existing.first() {
            return Err(BuildError::cloud(
                format!("the image name '{}' is already taken", self.image_name),
                CloudError::Conflict(image.id.clone()),
            ));
        }
        Ok(())
    }
}

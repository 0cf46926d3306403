//! Remote copy step.
//!
//! Submits one asynchronous copy of the captured image per destination
//! region, then polls the source image: the backend flips it back to
//! available once every copy has been dispatched. Completion of the copies
//! themselves is not awaited; the destination image ids are already known
//! and land in the artifact.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::Step;
use async_trait::async_trait;
use bakeflow_cloud::{ImageStatus, RegionImage, StatusPoller};
use bakeflow_config::BuildConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SOURCE_SETTLE_BUDGET: Duration = Duration::from_secs(1800);

pub struct ImageCopyStep {
    destination_regions: Vec<String>,
    image_name: String,
    copies: Vec<RegionImage>,
}

impl ImageCopyStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        // Copying into the home region would collide with the source image.
        let destination_regions = config
            .image
            .destination_regions
            .iter()
            .filter(|region| *region != &config.access.region)
            .cloned()
            .collect();
        Self {
            destination_regions,
            image_name: config.image.image_name.clone(),
            copies: Vec::new(),
        }
    }
}

#[async_trait]
impl Step for ImageCopyStep {
    fn name(&self) -> &'static str {
        "image-copy"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.destination_regions.is_empty() {
            return Ok(());
        }
        let image_id = ctx.state.image_id()?.to_string();

        ctx.ui.say(&format!(
            "Copying image({image_id}) to regions: {}",
            self.destination_regions.join(", ")
        ));
        let client = ctx.compute();
        let name = self.image_name.clone();
        let destinations = self.destination_regions.clone();
        let copies = ctx
            .retry
            .run(&ctx.cancel, || {
                let client = client.clone();
                let image_id = image_id.clone();
                let name = name.clone();
                let destinations = destinations.clone();
                async move {
                    client
                        .remote_copy_image(&image_id, &name, &destinations)
                        .await
                }
            })
            .await
            .map_err(|e| BuildError::cloud(format!("failed to copy image({image_id})"), e))?;

        // Own the submitted copies before waiting on the source image, so
        // an abort during the wait still cancels or deletes them.
        for copy in copies {
            ctx.ui.message(&format!(
                "Copying to region({}): {}",
                copy.region, copy.image_id
            ));
            ctx.state
                .record_image(copy.region.clone(), copy.image_id.clone());
            self.copies.push(copy);
        }

        ctx.ui.say(&format!(
            "Waiting for the source image({image_id}) to be available again..."
        ));
        StatusPoller::new(SOURCE_SETTLE_BUDGET)
            .with_retry(ctx.retry.clone())
            .wait_for(&ctx.cancel, &image_id, ImageStatus::Available, || {
                let client = client.clone();
                let image_id = image_id.clone();
                async move { Ok(client.get_image(&image_id).await?.status) }
            })
            .await
            .map_err(|e| {
                BuildError::cloud(format!("error waiting for the source image({image_id})"), e)
            })?;
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if self.copies.is_empty() || (!ctx.state.halted && !ctx.state.cancelled) {
            return;
        }

        ctx.ui
            .say("Cancelling unfinished copies and deleting copied images...");
        let cancel = CancellationToken::new();
        for copy in &self.copies {
            let client = match ctx.clients.compute_for_region(&copy.region) {
                Ok(client) => client,
                Err(err) => {
                    ctx.ui.error(&format!(
                        "No client available for region({}): {err}",
                        copy.region
                    ));
                    continue;
                }
            };

            // An unfinished copy can be cancelled outright; a finished one
            // has to be deleted like any other image.
            let in_flight = match client.get_image(&copy.image_id).await {
                Ok(detail) => detail.status != ImageStatus::Available,
                Err(_) => false,
            };
            if in_flight && client.cancel_remote_copy_image(&copy.image_id).await.is_ok() {
                ctx.ui
                    .message(&format!("Cancelled the copy to region({})", copy.region));
                continue;
            }

            let result = ctx
                .retry
                .run(&cancel, || {
                    let client = client.clone();
                    let image_id = copy.image_id.clone();
                    async move { client.delete_image(&image_id).await }
                })
                .await;
            match result {
                Ok(()) => ctx.ui.message(&format!(
                    "Deleted image({}) of region({})",
                    copy.image_id, copy.region
                )),
                Err(err) => ctx.ui.error(&format!(
                    "Failed to delete image({}) of region({}), please delete it manually: {err}",
                    copy.image_id, copy.region
                )),
            }
        }
    }
}

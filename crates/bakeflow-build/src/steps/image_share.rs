//! Image sharing step.
//!
//! Shares every produced image, home region and copies alike, with the
//! configured accounts. Each grant is remembered so that cleanup after a
//! failure only revokes what this run granted.

use crate::context::BuildContext;
use crate::error::{BuildError, Result};
use crate::step::Step;
use async_trait::async_trait;
use bakeflow_cloud::SharedUser;
use bakeflow_config::BuildConfig;
use tokio_util::sync::CancellationToken;

pub struct ImageShareStep {
    users: Vec<SharedUser>,
    shared: Vec<(String, String, SharedUser)>,
}

impl ImageShareStep {
    pub fn from_config(config: &BuildConfig) -> Self {
        let users = config
            .image
            .share_accounts
            .iter()
            .map(SharedUser::by_account)
            .chain(
                config
                    .image
                    .share_account_ids
                    .iter()
                    .map(SharedUser::by_account_id),
            )
            .collect();
        Self {
            users,
            shared: Vec::new(),
        }
    }
}

#[async_trait]
impl Step for ImageShareStep {
    fn name(&self) -> &'static str {
        "image-share"
    }

    async fn run(&mut self, ctx: &mut BuildContext) -> Result<()> {
        if self.users.is_empty() {
            return Ok(());
        }

        ctx.ui.say("Sharing images with the configured accounts...");
        let images = ctx.state.images().clone();
        for (region, image_id) in images {
            let client = ctx.clients.compute_for_region(&region).map_err(|e| {
                BuildError::cloud(format!("failed to resolve a client for region({region})"), e)
            })?;

            for user in self.users.clone() {
                ctx.retry
                    .run(&ctx.cancel, || {
                        let client = client.clone();
                        let image_id = image_id.clone();
                        let user = user.clone();
                        async move { client.share_image(&image_id, &user).await }
                    })
                    .await
                    .map_err(|e| {
                        BuildError::cloud(
                            format!(
                                "failed to share image({image_id}) of region({region}) with {user}"
                            ),
                            e,
                        )
                    })?;
                ctx.ui.message(&format!(
                    "Shared image({image_id}) of region({region}) with {user}"
                ));
                self.shared.push((region.clone(), image_id.clone(), user));
            }
        }
        Ok(())
    }

    async fn cleanup(&mut self, ctx: &mut BuildContext) {
        if self.shared.is_empty() || (!ctx.state.halted && !ctx.state.cancelled) {
            return;
        }

        ctx.ui.say("Revoking image shares...");
        let cancel = CancellationToken::new();
        for (region, image_id, user) in &self.shared {
            let client = match ctx.clients.compute_for_region(region) {
                Ok(client) => client,
                Err(err) => {
                    ctx.ui
                        .error(&format!("No client available for region({region}): {err}"));
                    continue;
                }
            };
            let result = ctx
                .retry
                .run(&cancel, || {
                    let client = client.clone();
                    let image_id = image_id.clone();
                    let user = user.clone();
                    async move { client.unshare_image(&image_id, &user).await }
                })
                .await;
            if let Err(err) = result {
                ctx.ui.error(&format!(
                    "Failed to unshare image({image_id}) of region({region}) with {user}, \
                     please revoke it manually: {err}"
                ));
            }
        }
    }
}

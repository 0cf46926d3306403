//! Provisioning hook boundary
//!
//! What runs on the instance once it is reachable (shell scripts, config
//! management, file uploads) is the embedding application's business. The
//! pipeline only knows when to invoke it and what connection material to
//! hand over.

use crate::ui::Ui;
use bakeflow_cloud::InstanceDetail;
use async_trait::async_trait;

#[async_trait]
pub trait ProvisionHook: Send + Sync {
    /// Called once the build instance reports running. `private_key` is the
    /// PEM of the temporary or caller-supplied key when one is in play.
    async fn provision(
        &self,
        instance: &InstanceDetail,
        private_key: Option<&str>,
        ui: &dyn Ui,
    ) -> anyhow::Result<()>;
}

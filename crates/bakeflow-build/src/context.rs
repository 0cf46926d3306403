//! Per-run build context
//!
//! [`BuildContext`] carries the immutable collaborators every step receives
//! (config, clients, UI sink, cancellation token) plus [`SharedContext`],
//! the mutable bag of cross-step results. Steps never hold another step's
//! resource id in their own fields; everything flows through here.

use crate::error::{BuildError, Result};
use crate::hook::ProvisionHook;
use crate::ui::Ui;
use bakeflow_cloud::{ClientSet, ComputeApi, InstanceDetail, NetworkApi, RetryPolicy};
use bakeflow_config::BuildConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cross-step results of one build run.
///
/// Each field is written by exactly one step and read by later ones; the
/// pipeline order is the only write-before-read enforcement, so the
/// accessors return an error naming the missing value instead of panicking.
#[derive(Default)]
pub struct SharedContext {
    network_id: Option<String>,
    subnet_id: Option<String>,
    security_group_id: Option<String>,
    temporary_key_pair_id: Option<String>,
    private_key: Option<String>,
    instance_id: Option<String>,
    instance: Option<InstanceDetail>,
    image_id: Option<String>,
    images: BTreeMap<String, String>,

    /// A step reported an unrecoverable failure.
    pub halted: bool,
    /// An external interrupt was observed.
    pub cancelled: bool,
}

fn missing(what: &str) -> BuildError {
    BuildError::State(format!("{what} requested before it was recorded"))
}

impl SharedContext {
    pub fn set_network_id(&mut self, id: impl Into<String>) {
        self.network_id = Some(id.into());
    }

    pub fn network_id(&self) -> Result<&str> {
        self.network_id.as_deref().ok_or_else(|| missing("network id"))
    }

    pub fn set_subnet_id(&mut self, id: impl Into<String>) {
        self.subnet_id = Some(id.into());
    }

    pub fn subnet_id(&self) -> Result<&str> {
        self.subnet_id.as_deref().ok_or_else(|| missing("subnet id"))
    }

    pub fn set_security_group_id(&mut self, id: impl Into<String>) {
        self.security_group_id = Some(id.into());
    }

    pub fn security_group_id(&self) -> Result<&str> {
        self.security_group_id
            .as_deref()
            .ok_or_else(|| missing("security group id"))
    }

    pub fn set_temporary_key_pair_id(&mut self, id: impl Into<String>) {
        self.temporary_key_pair_id = Some(id.into());
    }

    /// Only set when this run created a throwaway key pair.
    pub fn temporary_key_pair_id(&self) -> Option<&str> {
        self.temporary_key_pair_id.as_deref()
    }

    pub fn set_private_key(&mut self, pem: impl Into<String>) {
        self.private_key = Some(pem.into());
    }

    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    pub fn set_instance_id(&mut self, id: impl Into<String>) {
        self.instance_id = Some(id.into());
    }

    pub fn instance_id(&self) -> Result<&str> {
        self.instance_id
            .as_deref()
            .ok_or_else(|| missing("instance id"))
    }

    pub fn set_instance(&mut self, instance: InstanceDetail) {
        self.instance = Some(instance);
    }

    pub fn instance(&self) -> Result<&InstanceDetail> {
        self.instance.as_ref().ok_or_else(|| missing("instance"))
    }

    pub fn set_image_id(&mut self, id: impl Into<String>) {
        self.image_id = Some(id.into());
    }

    pub fn image_id(&self) -> Result<&str> {
        self.image_id.as_deref().ok_or_else(|| missing("image id"))
    }

    /// Record one produced image. The map seeds the final artifact.
    pub fn record_image(&mut self, region: impl Into<String>, image_id: impl Into<String>) {
        self.images.insert(region.into(), image_id.into());
    }

    /// Region to image id, for every image produced so far.
    pub fn images(&self) -> &BTreeMap<String, String> {
        &self.images
    }
}

/// Everything a step receives: collaborators plus the shared state bag.
pub struct BuildContext {
    pub config: BuildConfig,
    pub clients: Arc<dyn ClientSet>,
    pub ui: Arc<dyn Ui>,
    pub hook: Option<Arc<dyn ProvisionHook>>,
    pub cancel: CancellationToken,
    pub retry: RetryPolicy,
    pub state: SharedContext,
}

impl BuildContext {
    pub fn new(config: BuildConfig, clients: Arc<dyn ClientSet>, ui: Arc<dyn Ui>) -> Self {
        Self {
            config,
            clients,
            ui,
            hook: None,
            cancel: CancellationToken::new(),
            retry: RetryPolicy::default(),
            state: SharedContext::default(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ProvisionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Compute handle for the build's home region.
    pub fn compute(&self) -> Arc<dyn ComputeApi> {
        self.clients.compute()
    }

    /// Network handle for the build's home region.
    pub fn network(&self) -> Arc<dyn NetworkApi> {
        self.clients.network()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_reports_missing_value() {
        let state = SharedContext::default();
        let err = state.network_id().unwrap_err();
        assert!(err.to_string().contains("network id"));
    }

    #[test]
    fn read_after_write() {
        let mut state = SharedContext::default();
        state.set_subnet_id("sbn-1");
        assert_eq!(state.subnet_id().unwrap(), "sbn-1");
    }

    #[test]
    fn images_accumulate_sorted() {
        let mut state = SharedContext::default();
        state.record_image("gz", "m-2");
        state.record_image("bj", "m-1");
        let regions: Vec<_> = state.images().keys().cloned().collect();
        assert_eq!(regions, vec!["bj", "gz"]);
    }
}

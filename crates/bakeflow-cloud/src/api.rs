//! Cloud capability trait definitions
//!
//! The build pipeline only ever sees these traits. Implementations wrap a
//! concrete SDK or HTTP client; tests wrap an in-memory fake.

use crate::error::Result;
use crate::types::{
    CreateImageArgs, CreateInstanceArgs, CreateKeyPairArgs, CreateNetworkArgs,
    CreateSecurityGroupArgs, CreateSubnetArgs, ImageDetail, InstanceDetail, KeyPair, NetworkDetail,
    RegionImage, SecurityGroupSummary, SharedUser, SubnetDetail,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Network-plane operations: networks and subnets.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn create_network(&self, args: &CreateNetworkArgs) -> Result<String>;
    async fn get_network(&self, network_id: &str) -> Result<NetworkDetail>;
    async fn delete_network(&self, network_id: &str, client_token: &str) -> Result<()>;

    async fn create_subnet(&self, args: &CreateSubnetArgs) -> Result<String>;
    async fn get_subnet(&self, subnet_id: &str) -> Result<SubnetDetail>;
    async fn delete_subnet(&self, subnet_id: &str, client_token: &str) -> Result<()>;
}

/// Compute-plane operations: security groups, key pairs, instances and images.
///
/// A `ComputeApi` handle is bound to one region; cross-region operations go
/// through [`ClientSet::compute_for_region`].
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn create_security_group(&self, args: &CreateSecurityGroupArgs) -> Result<String>;
    async fn list_security_groups(&self, network_id: &str) -> Result<Vec<SecurityGroupSummary>>;
    async fn delete_security_group(&self, security_group_id: &str) -> Result<()>;

    async fn create_key_pair(&self, args: &CreateKeyPairArgs) -> Result<KeyPair>;
    async fn delete_key_pair(&self, key_pair_id: &str) -> Result<()>;
    async fn detach_key_pair(&self, key_pair_id: &str, instance_ids: &[String]) -> Result<()>;

    async fn create_instance(&self, args: &CreateInstanceArgs) -> Result<String>;
    async fn get_instance(&self, instance_id: &str) -> Result<InstanceDetail>;
    /// Cascading delete: removes the instance together with its attached
    /// public IP and other dependent resources in one call.
    async fn delete_instance_with_resources(
        &self,
        instance_id: &str,
        client_token: &str,
    ) -> Result<()>;

    async fn create_image(&self, args: &CreateImageArgs) -> Result<String>;
    async fn get_image(&self, image_id: &str) -> Result<ImageDetail>;
    async fn list_images_by_name(&self, name: &str) -> Result<Vec<ImageDetail>>;
    async fn delete_image(&self, image_id: &str) -> Result<()>;

    async fn image_shared_users(&self, image_id: &str) -> Result<Vec<SharedUser>>;
    async fn share_image(&self, image_id: &str, user: &SharedUser) -> Result<()>;
    async fn unshare_image(&self, image_id: &str, user: &SharedUser) -> Result<()>;

    /// Submit one asynchronous copy of `image_id` into every named region.
    /// Returns the image id minted for each destination region.
    async fn remote_copy_image(
        &self,
        image_id: &str,
        name: &str,
        destination_regions: &[String],
    ) -> Result<Vec<RegionImage>>;
    async fn cancel_remote_copy_image(&self, image_id: &str) -> Result<()>;
}

/// Resolves API handles for the home region and for arbitrary regions.
///
/// Image copy, share and artifact teardown operate on images living in other
/// regions and need a per-region compute handle.
pub trait ClientSet: Send + Sync {
    /// Compute handle for the region the build runs in.
    fn compute(&self) -> Arc<dyn ComputeApi>;

    /// Network handle for the region the build runs in.
    fn network(&self) -> Arc<dyn NetworkApi>;

    /// Compute handle bound to the given region.
    fn compute_for_region(&self, region: &str) -> Result<Arc<dyn ComputeApi>>;
}

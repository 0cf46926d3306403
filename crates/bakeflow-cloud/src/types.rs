//! Resource types and request argument shapes
//!
//! Identifiers are opaque strings minted by the cloud backend. Every mutating
//! request carries a `client_token` so an interrupted call can be retried
//! without creating the resource twice.

use serde::{Deserialize, Serialize};

/// Fresh idempotency token for one mutating API call.
pub fn client_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Key/value tag applied to created resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Lifecycle status of a compute instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deleting,
    Deleted,
    Error,
    Unknown,
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceStatus::Starting => "starting",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopping => "stopping",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Deleting => "deleting",
            InstanceStatus::Deleted => "deleted",
            InstanceStatus::Error => "error",
            InstanceStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle status of a machine image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Creating,
    Copying,
    Available,
    Error,
    Unknown,
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImageStatus::Creating => "creating",
            ImageStatus::Copying => "copying",
            ImageStatus::Available => "available",
            ImageStatus::Error => "error",
            ImageStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetworkArgs {
    pub client_token: String,
    pub name: String,
    pub cidr: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDetail {
    pub id: String,
    pub name: String,
    pub cidr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubnetArgs {
    pub client_token: String,
    pub network_id: String,
    pub zone: String,
    pub name: String,
    pub cidr: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetDetail {
    pub id: String,
    pub network_id: String,
    pub name: String,
    pub cidr: String,
}

/// Single ingress/egress rule installed on a created security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub remark: String,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecurityGroupArgs {
    pub client_token: String,
    pub network_id: String,
    pub name: String,
    pub description: String,
    pub rules: Vec<SecurityGroupRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyPairArgs {
    pub client_token: String,
    pub name: String,
    pub description: String,
}

/// Key pair returned by a create call. The private key is only ever returned
/// at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    pub id: String,
    pub name: String,
    pub private_key: String,
}

/// Extra data disk attached at instance creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDiskArgs {
    pub size_gb: i64,
    pub storage_type: String,
    pub snapshot_id: String,
}

/// Public IP attachment requested at instance creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicIpArgs {
    pub eip_name: String,
    pub bandwidth_mbps: i64,
    pub charge_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInstanceArgs {
    pub client_token: String,
    pub source_image_id: String,
    pub name: String,
    pub spec: String,
    pub zone: String,
    pub root_disk_size_gb: Option<i64>,
    pub root_disk_storage_type: Option<String>,
    pub admin_password: Option<String>,
    pub key_pair_id: Option<String>,
    pub subnet_id: Option<String>,
    pub security_group_id: Option<String>,
    /// Base64-encoded boot payload, already encoded by the caller.
    pub user_data: Option<String>,
    pub data_disks: Vec<DataDiskArgs>,
    pub tags: Vec<Tag>,
    pub public_ip: Option<PublicIpArgs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDetail {
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,
    pub public_ip: Option<String>,
    pub internal_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImageArgs {
    pub client_token: String,
    pub name: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetail {
    pub id: String,
    pub name: String,
    pub status: ImageStatus,
}

/// Account a produced image is shared with, addressed either by account name
/// or by account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedUser {
    pub account: Option<String>,
    pub account_id: Option<String>,
}

impl SharedUser {
    pub fn by_account(account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            account_id: None,
        }
    }

    pub fn by_account_id(account_id: impl Into<String>) -> Self {
        Self {
            account: None,
            account_id: Some(account_id.into()),
        }
    }
}

impl std::fmt::Display for SharedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.account, &self.account_id) {
            (Some(account), _) => write!(f, "account {account}"),
            (None, Some(id)) => write!(f, "account id {id}"),
            (None, None) => write!(f, "unspecified account"),
        }
    }
}

/// One region/image pair produced by a remote copy request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionImage {
    pub region: String,
    pub image_id: String,
}

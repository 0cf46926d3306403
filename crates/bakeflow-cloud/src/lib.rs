//! Cloud API abstraction for Bakeflow
//!
//! This crate defines the capability traits the build pipeline consumes
//! (network, subnet, security group, key pair, instance and image
//! operations), together with the retry and status-polling primitives every
//! step uses to talk to an eventually-consistent cloud backend.
//!
//! The actual HTTP transport, request signing and per-operation serialization
//! live behind [`ComputeApi`] / [`NetworkApi`] implementations supplied by the
//! embedding application; nothing in this crate performs I/O on its own.

pub mod api;
pub mod error;
pub mod poll;
pub mod retry;
pub mod types;

// Re-exports
pub use api::{ClientSet, ComputeApi, NetworkApi};
pub use error::{CloudError, Result};
pub use poll::StatusPoller;
pub use retry::RetryPolicy;
pub use types::{
    CreateImageArgs, CreateInstanceArgs, CreateKeyPairArgs, CreateNetworkArgs,
    CreateSecurityGroupArgs, CreateSubnetArgs, DataDiskArgs, ImageDetail, ImageStatus,
    InstanceDetail, InstanceStatus, KeyPair, NetworkDetail, PublicIpArgs, RegionImage,
    SecurityGroupRule, SecurityGroupSummary, SharedUser, SubnetDetail, Tag, client_token,
};

//! Pipeline steps
//!
//! One module per resource. Every step follows the same shape: verify or
//! create in `run`, record the result in the shared context, and undo in
//! `cleanup` only what this run created.

mod detach_key_pair;
mod image_copy;
mod image_create;
mod image_share;
mod instance;
mod key_pair;
mod network;
mod pre_validate;
mod provision;
mod security_group;
mod subnet;

pub use detach_key_pair::DetachKeyPairStep;
pub use image_copy::ImageCopyStep;
pub use image_create::ImageCreateStep;
pub use image_share::ImageShareStep;
pub use instance::InstanceStep;
pub use key_pair::KeyPairStep;
pub use network::NetworkStep;
pub use pre_validate::PreValidateStep;
pub use provision::ProvisionStep;
pub use security_group::SecurityGroupStep;
pub use subnet::SubnetStep;

/// Config strings use "" for unset; steps want an `Option`.
pub(crate) fn none_if_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

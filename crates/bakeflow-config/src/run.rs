//! Instance launch configuration
//!
//! Network fields follow the id-or-name pattern: an id means "verify and
//! reuse", a missing id means "create a temporary resource and delete it
//! after the build". `use_default_network` opts out of custom networking
//! entirely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra data disk attached to the build instance. The snapshot id is
/// required; a blank disk would be left behind unformatted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDiskConfig {
    pub size_gb: i64,
    pub storage_type: String,
    pub snapshot_id: String,
}

/// How the provisioner authenticates to the build instance. Derived from the
/// key/agent/password fields; the variants are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Caller-supplied private key file.
    PrivateKeyFile(String),
    /// SSH agent plus an existing key pair already registered with the cloud.
    AgentWithKeyPair(String),
    /// SSH agent using whatever key the source image embeds.
    AgentImageKey,
    /// Generate a throwaway key pair for this build and delete it afterwards.
    TemporaryKeyPair(String),
    /// Password-only or no authentication at all.
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Use the account's default network, subnet and security group instead
    /// of verifying or creating custom ones.
    pub use_default_network: bool,
    /// Attach a public IP to the build instance.
    pub associate_public_ip: bool,
    /// Instance type, e.g. "bcc.g5.c2m8". Required.
    pub instance_spec: String,
    /// Name for the build instance. Defaults to a generated one; the
    /// instance is deleted after the build either way.
    pub instance_name: String,
    pub description: String,
    /// Image the build instance boots from. Required.
    pub source_image_id: String,

    pub security_group_id: String,
    pub security_group_name: String,

    pub eip_name: String,
    pub network_capacity_mbps: i64,
    pub internet_charge_type: String,

    pub root_disk_size_gb: i64,
    pub root_disk_storage_type: String,

    pub network_id: String,
    pub network_name: String,
    pub network_cidr: String,

    pub subnet_id: String,
    pub subnet_name: String,
    pub subnet_cidr: String,

    /// Existing cloud key pair to launch the instance with. The backend
    /// treats the id, not the name, as the unique handle.
    pub key_pair_id: String,
    pub ssh_private_key_file: String,
    pub ssh_agent_auth: bool,
    pub temporary_key_pair_name: String,
    pub ssh_password: String,
    pub winrm_password: String,
    /// Persist the temporary private key at this path for debugging.
    pub debug_key_file: String,

    pub data_disks: Vec<DataDiskConfig>,
    pub run_tags: BTreeMap<String, String>,

    /// Inline boot payload. Mutually exclusive with `user_data_file`.
    pub user_data: String,
    pub user_data_file: String,
}

impl RunConfig {
    /// Which authentication branch the key pair step takes.
    pub fn auth_mode(&self) -> AuthMode {
        if !self.ssh_private_key_file.is_empty() {
            return AuthMode::PrivateKeyFile(self.ssh_private_key_file.clone());
        }
        if self.ssh_agent_auth {
            if self.key_pair_id.is_empty() {
                return AuthMode::AgentImageKey;
            }
            return AuthMode::AgentWithKeyPair(self.key_pair_id.clone());
        }
        if self.temporary_key_pair_name.is_empty() {
            return AuthMode::None;
        }
        AuthMode::TemporaryKeyPair(self.temporary_key_pair_name.clone())
    }

    /// Apply defaults and validate. `generated_name` seeds every defaulted
    /// name so one build's temporary resources are greppable as a set.
    pub fn prepare(&mut self, generated_name: &str) -> Vec<String> {
        let mut errors = Vec::new();

        // No authentication configured at all: fall back to a temporary
        // key pair named after this build.
        if self.key_pair_id.is_empty()
            && self.temporary_key_pair_name.is_empty()
            && self.ssh_private_key_file.is_empty()
            && self.ssh_password.is_empty()
            && self.winrm_password.is_empty()
            && !self.ssh_agent_auth
        {
            self.temporary_key_pair_name = generated_name.to_string();
        }

        if self.source_image_id.is_empty() {
            errors.push("'source_image_id' must be specified".to_string());
        }
        if self.instance_spec.is_empty() {
            errors.push("'instance_spec' must be specified".to_string());
        }

        if !self.user_data.is_empty() && !self.user_data_file.is_empty() {
            errors.push("only one of 'user_data' or 'user_data_file' can be specified".to_string());
        } else if !self.user_data_file.is_empty()
            && std::fs::metadata(&self.user_data_file).is_err()
        {
            errors.push(format!(
                "the 'user_data_file' path does not exist: {}",
                self.user_data_file
            ));
        }

        self.prepare_network(generated_name, &mut errors);
        self.prepare_public_ip(&mut errors);

        for disk in &self.data_disks {
            if disk.snapshot_id.is_empty() {
                errors.push("the 'snapshot_id' in 'data_disks' must be provided".to_string());
            }
        }

        errors
    }

    fn prepare_network(&mut self, generated_name: &str, errors: &mut Vec<String>) {
        if self.use_default_network {
            if !self.network_id.is_empty()
                || !self.network_name.is_empty()
                || !self.network_cidr.is_empty()
                || !self.subnet_id.is_empty()
                || !self.subnet_cidr.is_empty()
                || !self.security_group_id.is_empty()
                || !self.security_group_name.is_empty()
            {
                errors.push(
                    "network, subnet and security group fields must not be set when \
                     'use_default_network' is true"
                        .to_string(),
                );
            }
            return;
        }

        if !self.network_id.is_empty() && (!self.network_cidr.is_empty() || !self.network_name.is_empty()) {
            errors.push(
                "'network_cidr' and 'network_name' must not be set when 'network_id' is given"
                    .to_string(),
            );
        } else if self.network_id.is_empty() {
            // A temporary network will be created, along with a temporary
            // subnet and security group.
            if self.network_name.is_empty() {
                self.network_name = generated_name.to_string();
            }
            if self.network_cidr.is_empty() {
                self.network_cidr = "192.168.0.0/16".to_string();
            }

            if !self.subnet_id.is_empty() {
                errors.push("'subnet_id' cannot be set without 'network_id'".to_string());
            }
            if self.subnet_name.is_empty() {
                self.subnet_name = generated_name.to_string();
            }
            if self.subnet_cidr.is_empty() {
                self.subnet_cidr = "192.168.8.0/24".to_string();
            }

            if !self.security_group_id.is_empty() {
                errors.push("'security_group_id' cannot be set without 'network_id'".to_string());
            }
            if self.security_group_name.is_empty() {
                self.security_group_name = generated_name.to_string();
            }
        }

        // Existing network, temporary subnet.
        if !self.network_id.is_empty() && self.subnet_id.is_empty() {
            if self.subnet_cidr.is_empty() {
                errors.push(
                    "'subnet_cidr' must be provided when 'network_id' is given and \
                     'subnet_id' is not"
                        .to_string(),
                );
            }
            if self.subnet_name.is_empty() {
                self.subnet_name = generated_name.to_string();
            }
        }

        // Existing network, temporary security group.
        if !self.network_id.is_empty()
            && self.security_group_id.is_empty()
            && self.security_group_name.is_empty()
        {
            self.security_group_name = generated_name.to_string();
        }
    }

    fn prepare_public_ip(&mut self, errors: &mut Vec<String>) {
        if self.associate_public_ip {
            if self.eip_name.is_empty() {
                self.eip_name = self.instance_name.clone();
            }
            if self.network_capacity_mbps < 1 {
                self.network_capacity_mbps = 1;
            }
            if self.internet_charge_type.is_empty() {
                self.internet_charge_type = "BANDWIDTH_POSTPAID_BY_HOUR".to_string();
            }
            if self.internet_charge_type != "BANDWIDTH_POSTPAID_BY_HOUR"
                && self.internet_charge_type != "TRAFFIC_POSTPAID_BY_HOUR"
            {
                errors.push(format!(
                    "unsupported 'internet_charge_type': {}",
                    self.internet_charge_type
                ));
            }
        } else if !self.eip_name.is_empty()
            || self.network_capacity_mbps != 0
            || !self.internet_charge_type.is_empty()
        {
            errors.push(
                "'eip_name', 'network_capacity_mbps' and 'internet_charge_type' must not be \
                 set when 'associate_public_ip' is false"
                    .to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RunConfig {
        RunConfig {
            source_image_id: "m-src".into(),
            instance_spec: "bcc.g5.c2m8".into(),
            ..Default::default()
        }
    }

    #[test]
    fn required_fields_reported() {
        let mut config = RunConfig::default();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("source_image_id")));
        assert!(errors.iter().any(|e| e.contains("instance_spec")));
    }

    #[test]
    fn temporary_key_pair_defaulted_when_no_auth() {
        let mut config = base();
        assert!(config.prepare("bakeflow_test").is_empty());
        assert_eq!(config.temporary_key_pair_name, "bakeflow_test");
        assert_eq!(
            config.auth_mode(),
            AuthMode::TemporaryKeyPair("bakeflow_test".into())
        );
    }

    #[test]
    fn password_auth_skips_temporary_key_pair() {
        let mut config = base();
        config.ssh_password = "hunter2".into();
        assert!(config.prepare("bakeflow_test").is_empty());
        assert!(config.temporary_key_pair_name.is_empty());
        assert_eq!(config.auth_mode(), AuthMode::None);
    }

    #[test]
    fn agent_auth_modes() {
        let mut config = base();
        config.ssh_agent_auth = true;
        assert_eq!(config.auth_mode(), AuthMode::AgentImageKey);
        config.key_pair_id = "k-1".into();
        assert_eq!(config.auth_mode(), AuthMode::AgentWithKeyPair("k-1".into()));
    }

    #[test]
    fn temporary_network_defaults_applied() {
        let mut config = base();
        assert!(config.prepare("bakeflow_test").is_empty());
        assert_eq!(config.network_name, "bakeflow_test");
        assert_eq!(config.network_cidr, "192.168.0.0/16");
        assert_eq!(config.subnet_name, "bakeflow_test");
        assert_eq!(config.subnet_cidr, "192.168.8.0/24");
        assert_eq!(config.security_group_name, "bakeflow_test");
    }

    #[test]
    fn default_network_excludes_custom_fields() {
        let mut config = base();
        config.use_default_network = true;
        config.network_id = "vpc-1".into();
        let errors = config.prepare("bakeflow_test");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("use_default_network"));
    }

    #[test]
    fn subnet_id_requires_network_id() {
        let mut config = base();
        config.subnet_id = "sbn-1".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("'subnet_id'")));
    }

    #[test]
    fn existing_network_requires_subnet_cidr() {
        let mut config = base();
        config.network_id = "vpc-1".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("'subnet_cidr'")));
        assert_eq!(config.subnet_name, "bakeflow_test");
        assert_eq!(config.security_group_name, "bakeflow_test");
    }

    #[test]
    fn user_data_mutual_exclusion() {
        let mut config = base();
        config.user_data = "#!/bin/sh".into();
        config.user_data_file = "/nonexistent/boot.sh".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("only one of")));
    }

    #[test]
    fn existing_user_data_file_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot.sh");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        let mut config = base();
        config.user_data_file = path.to_str().unwrap().to_string();
        assert!(config.prepare("bakeflow_test").is_empty());
    }

    #[test]
    fn missing_user_data_file_reported() {
        let mut config = base();
        config.user_data_file = "/nonexistent/boot.sh".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("does not exist")));
    }

    #[test]
    fn public_ip_defaults() {
        let mut config = base();
        config.associate_public_ip = true;
        config.instance_name = "builder-1".into();
        assert!(config.prepare("bakeflow_test").is_empty());
        assert_eq!(config.eip_name, "builder-1");
        assert_eq!(config.network_capacity_mbps, 1);
        assert_eq!(config.internet_charge_type, "BANDWIDTH_POSTPAID_BY_HOUR");
    }

    #[test]
    fn public_ip_charge_type_whitelist() {
        let mut config = base();
        config.associate_public_ip = true;
        config.internet_charge_type = "FREE_LUNCH".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("internet_charge_type")));
    }

    #[test]
    fn public_ip_fields_rejected_without_flag() {
        let mut config = base();
        config.eip_name = "eip-1".into();
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("associate_public_ip")));
    }

    #[test]
    fn data_disk_requires_snapshot() {
        let mut config = base();
        config.data_disks.push(DataDiskConfig {
            size_gb: 40,
            storage_type: "cloud_hp1".into(),
            snapshot_id: String::new(),
        });
        let errors = config.prepare("bakeflow_test");
        assert!(errors.iter().any(|e| e.contains("snapshot_id")));
    }
}

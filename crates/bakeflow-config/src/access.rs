//! Credential and region configuration

use serde::{Deserialize, Serialize};

/// Regions the backend serves. Validation can be skipped for regions newer
/// than this table.
pub const VALID_REGIONS: &[&str] = &["bj", "gz", "su", "hkg", "fwh", "bd", "sin", "fsh"];

pub fn valid_region(region: &str) -> bool {
    VALID_REGIONS.contains(&region)
}

/// Access credentials and placement. Credentials and region fall back to the
/// `BAKEFLOW_ACCESS_KEY` / `BAKEFLOW_SECRET_KEY` / `BAKEFLOW_REGION`
/// environment variables when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Zone the build instance is launched in. Ignored when the default
    /// network is used.
    pub zone: String,
    pub skip_region_validation: bool,
}

impl AccessConfig {
    /// Resolve environment fallbacks and validate. Returns every violation
    /// found rather than stopping at the first.
    pub fn prepare(&mut self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.access_key.is_empty() {
            self.access_key = std::env::var("BAKEFLOW_ACCESS_KEY").unwrap_or_default();
        }
        if self.secret_key.is_empty() {
            self.secret_key = std::env::var("BAKEFLOW_SECRET_KEY").unwrap_or_default();
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            errors.push(
                "'access_key' and 'secret_key' must be provided in the config file \
                 or environment variables"
                    .to_string(),
            );
        }

        if self.region.is_empty() {
            self.region = std::env::var("BAKEFLOW_REGION").unwrap_or_default();
        }
        if self.region.is_empty() {
            errors.push(
                "'region' must be provided in the config file or the BAKEFLOW_REGION \
                 environment variable"
                    .to_string(),
            );
        } else if !self.skip_region_validation && !valid_region(&self.region) {
            errors.push(format!("unknown region: {}", self.region));
        }

        errors
    }
}

//! Bakeflow build configuration
//!
//! Declarative configuration for one image build: credentials and placement,
//! instance launch parameters, and output image handling. [`BuildConfig::prepare`]
//! applies the field defaulting the pipeline relies on (generated resource
//! names, network CIDRs, the temporary key pair fallback) and accumulates
//! every validation failure into one error.

pub mod access;
pub mod error;
pub mod image;
pub mod run;

pub use access::{AccessConfig, VALID_REGIONS, valid_region};
pub use error::{ConfigError, Result};
pub use image::ImageConfig;
pub use run::{AuthMode, DataDiskConfig, RunConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one build run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    #[serde(flatten)]
    pub access: AccessConfig,
    #[serde(flatten)]
    pub run: RunConfig,
    #[serde(flatten)]
    pub image: ImageConfig,
}

/// Generated name shared by every defaulted temporary resource of one build,
/// e.g. `bakeflow_3f2a91c0`.
pub fn generated_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("bakeflow_{}", &id[..8])
}

impl BuildConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Default and validate every section. All violations are reported at
    /// once in [`ConfigError::Invalid`].
    pub fn prepare(&mut self) -> Result<()> {
        let name = generated_name();
        let mut errors = self.access.prepare();
        errors.extend(self.run.prepare(&name));
        errors.extend(self.image.prepare());

        if errors.is_empty() {
            tracing::debug!(region = %self.access.region, image = %self.image.image_name, "configuration prepared");
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        serde_json::json!({
            "access_key": "ak",
            "secret_key": "sk",
            "region": "fwh",
            "zone": "zoneA",
            "source_image_id": "m-src",
            "instance_spec": "bcc.g5.c2m8",
            "image_name": "web-base",
            "use_default_network": true
        })
        .to_string()
    }

    #[test]
    fn minimal_config_prepares() {
        let mut config = BuildConfig::from_json_str(&minimal_json()).unwrap();
        config.prepare().unwrap();
        assert!(config.run.temporary_key_pair_name.starts_with("bakeflow_"));
    }

    #[test]
    fn violations_accumulate_across_sections() {
        let mut config = BuildConfig::default();
        config.access.access_key = "ak".into();
        config.access.secret_key = "sk".into();
        config.access.region = "nowhere".into();
        match config.prepare() {
            Err(ConfigError::Invalid(errors)) => {
                assert!(errors.len() >= 3);
                let joined = errors.join("\n");
                assert!(joined.contains("unknown region"));
                assert!(joined.contains("source_image_id"));
                assert!(joined.contains("image_name"));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = BuildConfig::load("/nonexistent/bakeflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn generated_names_are_unique() {
        assert_ne!(generated_name(), generated_name());
    }
}

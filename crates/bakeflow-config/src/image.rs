//! Output image configuration

use crate::access::valid_region;
use serde::{Deserialize, Serialize};

const MAX_IMAGE_NAME_LEN: usize = 65;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Name for the produced image. Required; must start with a letter,
    /// use only letters, digits and `-_/.`, and be at most 65 characters.
    pub image_name: String,
    /// Regions the produced image is copied to. The source region is
    /// dropped; duplicates are removed.
    pub destination_regions: Vec<String>,
    /// Account names the image is shared with.
    pub share_accounts: Vec<String>,
    /// Account ids the image is shared with.
    pub share_account_ids: Vec<String>,
    pub skip_region_validation: bool,
    /// Skip the pre-flight source-image and name-collision checks.
    pub skip_image_validation: bool,
}

fn valid_image_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
}

impl ImageConfig {
    pub fn prepare(&mut self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.image_name.is_empty() {
            errors.push("'image_name' must be specified".to_string());
        } else if self.image_name.len() > MAX_IMAGE_NAME_LEN {
            errors.push(format!(
                "'image_name' must be at most {MAX_IMAGE_NAME_LEN} characters"
            ));
        } else if !valid_image_name(&self.image_name) {
            errors.push(format!(
                "'image_name' must start with a letter and contain only letters, digits \
                 and -_/. : {}",
                self.image_name
            ));
        }

        if !self.destination_regions.is_empty() {
            let mut seen = std::collections::BTreeSet::new();
            let mut regions = Vec::with_capacity(self.destination_regions.len());
            for region in self.destination_regions.drain(..) {
                if !seen.insert(region.clone()) {
                    continue;
                }
                if !self.skip_region_validation && !valid_region(&region) {
                    errors.push(format!("unknown destination region: {region}"));
                    continue;
                }
                regions.push(region);
            }
            self.destination_regions = regions;
        }

        errors
    }
}

//! Build artifact
//!
//! The deliverable of a successful run: the image id produced in every
//! region, plus a best-effort teardown for callers that decide to discard
//! the build after the fact.

use bakeflow_cloud::{ClientSet, CloudError};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Artifact {
    images: BTreeMap<String, String>,
    clients: Arc<dyn ClientSet>,
}

impl Artifact {
    pub fn new(images: BTreeMap<String, String>, clients: Arc<dyn ClientSet>) -> Self {
        Self { images, clients }
    }

    /// Region to image id for every produced image.
    pub fn images(&self) -> &BTreeMap<String, String> {
        &self.images
    }

    /// Deterministic identifier: sorted `region:image` pairs joined by
    /// commas. Stable across runs with identical result sets.
    pub fn id(&self) -> String {
        self.images
            .iter()
            .map(|(region, image_id)| format!("{region}:{image_id}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Delete every produced image, unsharing it first. Each region is
    /// handled independently: one region's failure never stops the others.
    /// Multiple failures are aggregated into [`CloudError::PartialFailure`].
    pub async fn destroy(&self) -> Result<(), CloudError> {
        let mut errors = Vec::new();

        for (region, image_id) in &self.images {
            tracing::info!(%region, %image_id, "deleting produced image");

            let client = match self.clients.compute_for_region(region) {
                Ok(client) => client,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };

            if let Err(err) = client.get_image(image_id).await {
                errors.push(err);
                continue;
            }

            match client.image_shared_users(image_id).await {
                Ok(users) => {
                    for user in &users {
                        if let Err(err) = client.unshare_image(image_id, user).await {
                            errors.push(err);
                        }
                    }
                }
                Err(err) => errors.push(err),
            }

            if let Err(err) = client.delete_image(image_id).await {
                errors.push(err);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(CloudError::PartialFailure(errors)),
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Images were created:")?;
        for (region, image_id) in &self.images {
            writeln!(f, "{region}: {image_id}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakeflow_cloud::{ComputeApi, NetworkApi};

    struct NoClients;

    impl ClientSet for NoClients {
        fn compute(&self) -> Arc<dyn ComputeApi> {
            unimplemented!("not used by these tests")
        }

        fn network(&self) -> Arc<dyn NetworkApi> {
            unimplemented!("not used by these tests")
        }

        fn compute_for_region(&self, region: &str) -> bakeflow_cloud::Result<Arc<dyn ComputeApi>> {
            Err(CloudError::NotFound(region.to_string()))
        }
    }

    fn artifact(pairs: &[(&str, &str)]) -> Artifact {
        let images = pairs
            .iter()
            .map(|(r, i)| (r.to_string(), i.to_string()))
            .collect();
        Artifact::new(images, Arc::new(NoClients))
    }

    #[test]
    fn id_is_sorted_and_order_independent() {
        let a = artifact(&[("bj", "i-1"), ("gz", "i-2")]);
        let b = artifact(&[("gz", "i-2"), ("bj", "i-1")]);
        assert_eq!(a.id(), "bj:i-1,gz:i-2");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn display_lists_every_region() {
        let a = artifact(&[("bj", "i-1"), ("gz", "i-2")]);
        let text = a.to_string();
        assert!(text.contains("bj: i-1"));
        assert!(text.contains("gz: i-2"));
    }
}

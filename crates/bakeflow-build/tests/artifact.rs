//! Artifact teardown against the cloud fake.

mod common;

use bakeflow_build::Artifact;
use bakeflow_cloud::{CloudError, SharedUser};
use common::{MockClients, MockCloud};
use std::collections::BTreeMap;

fn images(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(region, id)| (region.to_string(), id.to_string()))
        .collect()
}

#[tokio::test]
async fn destroy_unshares_then_deletes_every_image() {
    let cloud = MockCloud::new();
    *cloud.shared_users.lock().unwrap() = vec![SharedUser::by_account("acme")];
    let artifact = Artifact::new(
        images(&[("bj", "m-1"), ("gz", "m-gz")]),
        MockClients::new(cloud.clone()),
    );

    artifact.destroy().await.unwrap();

    for image in ["m-1", "m-gz"] {
        let unshare = cloud
            .call_index(&format!("unshare_image({image},account acme)"))
            .unwrap();
        let delete = cloud.call_index(&format!("delete_image({image})")).unwrap();
        assert!(unshare < delete);
    }
}

#[tokio::test]
async fn destroy_single_failure_is_returned_directly() {
    let cloud = MockCloud::new();
    let artifact = Artifact::new(
        images(&[("bj", "m-1"), ("gz", "m-gz")]),
        MockClients::with_bad_regions(cloud.clone(), &["gz"]),
    );

    let err = artifact.destroy().await.unwrap_err();
    assert!(matches!(err, CloudError::NotFound(_)));

    // The reachable region was still cleaned.
    assert!(cloud.called("delete_image(m-1)"));
    assert!(!cloud.called("delete_image(m-gz)"));
}

#[tokio::test]
async fn destroy_aggregates_multiple_failures() {
    let cloud = MockCloud::new();
    let artifact = Artifact::new(
        images(&[("bj", "m-1"), ("gz", "m-gz")]),
        MockClients::with_bad_regions(cloud.clone(), &["bj", "gz"]),
    );

    let err = artifact.destroy().await.unwrap_err();
    match err {
        CloudError::PartialFailure(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected PartialFailure, got {other:?}"),
    }
}

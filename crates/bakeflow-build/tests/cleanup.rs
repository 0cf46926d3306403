//! Teardown behavior: reverse order, ownership gating, cancellation.

mod common;

use bakeflow_build::{BuildOutcome, Builder};
use bakeflow_config::BuildConfig;
use common::{MockCloud, RecordingUi, context, temporary_network_config};
use std::time::Duration;

/// Configuration reusing a caller-supplied network, subnet and security
/// group, with a temporary key pair.
fn reused_network_config() -> BuildConfig {
    let mut config = BuildConfig::from_json_str(
        &serde_json::json!({
            "access_key": "ak",
            "secret_key": "sk",
            "region": "bj",
            "zone": "zoneA",
            "source_image_id": "m-src",
            "instance_spec": "bcc.g5.c2m8",
            "image_name": "web-base",
            "network_id": "vpc-ext",
            "subnet_id": "sbn-ext",
            "security_group_id": "sg-existing"
        })
        .to_string(),
    )
    .unwrap();
    config.prepare().unwrap();
    config
}

#[tokio::test(start_paused = true)]
async fn halted_instance_create_cleans_executed_steps_in_reverse() {
    let cloud = MockCloud::new();
    cloud.fail_on("create_instance");
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Halted(_)));

    // The instance was never created, so nothing deletes it.
    assert!(!cloud.called("delete_instance"));
    assert!(!cloud.called("create_image"));

    // Everything built before the halt goes away, newest first.
    let del_group = cloud.call_index("delete_security_group(sg-1)").unwrap();
    let del_subnet = cloud.call_index("delete_subnet(sbn-1)").unwrap();
    let del_network = cloud.call_index("delete_network(vpc-1)").unwrap();
    let del_key_pair = cloud.call_index("delete_key_pair(kp-1)").unwrap();
    assert!(del_group < del_subnet && del_subnet < del_network);
    assert!(del_network < del_key_pair);

    assert!(ui.contains("because of error"));
}

#[tokio::test(start_paused = true)]
async fn reused_resources_are_never_deleted() {
    let cloud = MockCloud::new();
    cloud.fail_on("create_image");
    let ui = RecordingUi::new();
    let config = reused_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Halted(_)));

    // The reused network, subnet and security group were verified...
    assert!(cloud.called("get_network(vpc-ext)"));
    assert!(cloud.called("get_subnet(sbn-ext)"));
    assert!(cloud.called("list_security_groups"));

    // ...but only this run's own resources are torn down.
    assert!(!cloud.called("delete_network"));
    assert!(!cloud.called("delete_subnet"));
    assert!(!cloud.called("delete_security_group"));
    assert!(cloud.called("delete_instance(i-1)"));
    assert!(cloud.called("delete_key_pair(kp-1)"));
}

#[tokio::test(start_paused = true)]
async fn halt_after_capture_removes_images_and_copies() {
    let cloud = MockCloud::new();
    cloud.fail_on("share_image");
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Halted(_)));

    // The in-flight copy is cancelled, the captured image deleted.
    assert!(cloud.called("cancel_remote_copy_image(m-gz)"));
    assert!(cloud.called("delete_image(m-1)"));

    // No share succeeded, so there is nothing to revoke.
    assert!(!cloud.called("unshare_image"));

    // The scaffolding goes too.
    assert!(cloud.called("delete_instance(i-1)"));
    assert!(cloud.called("delete_network(vpc-1)"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_instance_wait_tears_down() {
    let cloud = MockCloud::new();
    cloud
        .hold_instance_starting
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();
    });

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Cancelled));

    // The instance id was recorded at creation, so cancellation mid-boot
    // still deletes it.
    assert!(cloud.called("delete_instance(i-1)"));
    assert!(cloud.called("delete_security_group(sg-1)"));
    assert!(cloud.called("delete_subnet(sbn-1)"));
    assert!(cloud.called("delete_network(vpc-1)"));
    assert!(cloud.called("delete_key_pair(kp-1)"));
    assert!(!cloud.called("create_image"));

    assert!(ui.contains("because of cancellation"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_copy_wait_still_cancels_submitted_copies() {
    let cloud = MockCloud::new();
    cloud
        .hold_image_copying
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    // Fires while the copy step is waiting for the source image to settle.
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        cancel.cancel();
    });

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Cancelled));

    // The copy had been submitted before the abort, so cleanup must still
    // reach it.
    assert!(cloud.called("remote_copy_image(m-1,web-base,gz)"));
    assert!(cloud.called("cancel_remote_copy_image(m-gz)"));

    // The captured image and the scaffolding go too.
    assert!(cloud.called("delete_image(m-1)"));
    assert!(cloud.called("delete_instance(i-1)"));
    assert!(cloud.called("delete_key_pair(kp-1)"));
}

#[tokio::test(start_paused = true)]
async fn cleanup_failures_are_reported_not_fatal() {
    let cloud = MockCloud::new();
    cloud.fail_on("create_image");
    cloud.fail_on("delete_network");
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Halted(_)));

    // The failed network delete is reported with a remediation hint and the
    // remaining cleanup still runs.
    assert!(ui.contains("please delete it manually"));
    assert!(cloud.called("delete_key_pair(kp-1)"));
}

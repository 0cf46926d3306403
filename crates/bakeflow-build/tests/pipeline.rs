//! End-to-end pipeline runs against the in-memory cloud fake.

mod common;

use bakeflow_build::{BuildOutcome, Builder, ProvisionHook, Ui};
use bakeflow_cloud::InstanceDetail;
use common::{MockCloud, RecordingUi, context, default_network_config, temporary_network_config};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[tokio::test(start_paused = true)]
async fn successful_build_with_temporary_network() {
    let cloud = MockCloud::new();
    let ui = RecordingUi::new();
    let config = temporary_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;

    let artifact = outcome.artifact().expect("build should succeed");

    assert_eq!(artifact.images().get("bj").map(String::as_str), Some("m-1"));
    assert_eq!(
        artifact.images().get("gz").map(String::as_str),
        Some("m-gz")
    );
    assert_eq!(artifact.id(), "bj:m-1,gz:m-gz");

    // Creation happened bottom-up.
    let key_pair = cloud.call_index("create_key_pair").unwrap();
    let network = cloud.call_index("create_network").unwrap();
    let subnet = cloud.call_index("create_subnet").unwrap();
    let group = cloud.call_index("create_security_group").unwrap();
    let instance = cloud.call_index("create_instance").unwrap();
    let image = cloud.call_index("create_image").unwrap();
    assert!(key_pair < network && network < subnet && subnet < group);
    assert!(group < instance && instance < image);

    // The temporary key pair was detached before the image was captured.
    let detach = cloud.call_index("detach_key_pair(kp-1,i-1)").unwrap();
    assert!(instance < detach && detach < image);

    // Both images were shared with the configured account.
    assert!(cloud.called("share_image(m-1,account acme)"));
    assert!(cloud.called("share_image(m-gz,account acme)"));

    // Scaffolding is removed after success, in reverse order, and the
    // produced images are left alone.
    let del_instance = cloud.call_index("delete_instance(i-1)").unwrap();
    let del_group = cloud.call_index("delete_security_group(sg-1)").unwrap();
    let del_subnet = cloud.call_index("delete_subnet(sbn-1)").unwrap();
    let del_network = cloud.call_index("delete_network(vpc-1)").unwrap();
    let del_key_pair = cloud.call_index("delete_key_pair(kp-1)").unwrap();
    assert!(del_instance < del_group && del_group < del_subnet);
    assert!(del_subnet < del_network && del_network < del_key_pair);
    assert!(!cloud.called("delete_image"));
    assert!(!cloud.called("unshare_image"));

    assert!(ui.contains("Images were created:"));
}

#[tokio::test(start_paused = true)]
async fn default_network_skips_network_steps() {
    let cloud = MockCloud::new();
    let ui = RecordingUi::new();
    let config = default_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Succeeded(_)));

    assert!(!cloud.called("create_network"));
    assert!(!cloud.called("create_subnet"));
    assert!(!cloud.called("create_security_group"));
    assert!(cloud.called("create_instance"));
    assert!(cloud.called("create_image"));
}

#[tokio::test(start_paused = true)]
async fn taken_image_name_halts_before_anything_is_created() {
    let cloud = MockCloud::new();
    *cloud.taken_image_name.lock().unwrap() = Some("web-base".to_string());
    let ui = RecordingUi::new();
    let config = default_network_config();
    let mut ctx = context(config.clone(), cloud.clone(), ui.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    match outcome {
        BuildOutcome::Halted(err) => {
            assert!(err.to_string().contains("already taken"));
        }
        _ => panic!("expected a halt"),
    }

    assert!(!cloud.called("create_key_pair"));
    assert!(!cloud.called("create_instance"));
    assert!(!cloud.called("create_image"));
}

struct RecordingHook {
    called: AtomicBool,
    saw_private_key: AtomicBool,
}

#[async_trait::async_trait]
impl ProvisionHook for RecordingHook {
    async fn provision(
        &self,
        instance: &InstanceDetail,
        private_key: Option<&str>,
        ui: &dyn Ui,
    ) -> anyhow::Result<()> {
        assert_eq!(instance.id, "i-1");
        self.called.store(true, Ordering::SeqCst);
        self.saw_private_key
            .store(private_key.is_some(), Ordering::SeqCst);
        ui.message("hook ran");
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn hook_receives_the_running_instance_and_key() {
    let cloud = MockCloud::new();
    let ui = RecordingUi::new();
    let config = default_network_config();
    let hook = Arc::new(RecordingHook {
        called: AtomicBool::new(false),
        saw_private_key: AtomicBool::new(false),
    });
    let mut ctx =
        context(config.clone(), cloud.clone(), ui.clone()).with_hook(hook.clone());

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    assert!(matches!(outcome, BuildOutcome::Succeeded(_)));
    assert!(hook.called.load(Ordering::SeqCst));
    // The defaulted temporary key pair supplies the key material.
    assert!(hook.saw_private_key.load(Ordering::SeqCst));
    assert!(ui.contains("hook ran"));
}

struct FailingHook;

#[async_trait::async_trait]
impl ProvisionHook for FailingHook {
    async fn provision(
        &self,
        _instance: &InstanceDetail,
        _private_key: Option<&str>,
        _ui: &dyn Ui,
    ) -> anyhow::Result<()> {
        anyhow::bail!("script exited with status 1")
    }
}

#[tokio::test(start_paused = true)]
async fn hook_failure_halts_and_tears_down() {
    let cloud = MockCloud::new();
    let ui = RecordingUi::new();
    let config = default_network_config();
    let mut ctx =
        context(config.clone(), cloud.clone(), ui.clone()).with_hook(Arc::new(FailingHook));

    let outcome = Builder::standard(&config).run(&mut ctx).await;
    match outcome {
        BuildOutcome::Halted(err) => {
            assert!(err.to_string().contains("provisioning failed"));
        }
        _ => panic!("expected a halt"),
    }

    assert!(cloud.called("delete_instance(i-1)"));
    assert!(cloud.called("delete_key_pair(kp-1)"));
    assert!(!cloud.called("create_image"));
}

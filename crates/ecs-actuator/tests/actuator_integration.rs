//! End-to-end actuator flows against an in-memory ECS region
//!
//! Time is paused, so launch grace and poll sleeps complete instantly.

mod test_utils;

use ecs_actuator::wait::WaitConfig;
use ecs_actuator::{Actuator, ActuatorError, ActuatorSettings, PrometheusFailureReporter};
use ecs_actuator_common::Tag;
use ecs_actuator_common::tags::{NAME_TAG_KEY, OWNED_TAG_KEY, ownership_tags};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use test_utils::*;

#[tokio::test(start_paused = true)]
async fn test_create_then_exists_then_update() {
    let actuator = Actuator::new(FakeEcs::new(2));
    let machine = machine("worker-a");
    let config = provider_config();

    assert!(!actuator.exists(&machine, &config).await.unwrap());

    let created = actuator
        .create(&machine, &config, "#cloud-config\n")
        .await
        .unwrap();
    assert_eq!(created.status, "Running");

    let launched = actuator.api().launched();
    assert_eq!(launched.len(), 1);
    let request = &launched[0];
    assert_eq!(request.v_switch_id, "vsw-int");
    assert_eq!(request.security_group_ids, vec!["sg-int"]);
    assert_eq!(request.instance_name, "worker-a");
    assert!(request.user_data.is_some());
    assert_eq!(request.tags[0], Tag::new("team", "infra"));
    assert_eq!(request.tags.len(), 6);

    assert!(actuator.exists(&machine, &config).await.unwrap());

    let canonical = actuator.update(&machine, &config).await.unwrap();
    assert_eq!(canonical.instance_id, created.instance_id);
    assert!(actuator.api().stopped().is_empty());
    assert!(actuator.api().tagged().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_keeps_newest_and_stops_running_duplicates() {
    let fake = FakeEcs::new(0);
    fake.insert_instance(seeded_instance(
        "i-oldest",
        "worker-b",
        "Running",
        "2024-01-01T00:00:00Z",
    ));
    fake.insert_instance(seeded_instance(
        "i-newest",
        "worker-b",
        "Running",
        "2024-03-01T00:00:00Z",
    ));
    fake.insert_instance(seeded_instance(
        "i-stopped",
        "worker-b",
        "Stopped",
        "2024-02-01T00:00:00Z",
    ));
    fake.insert_instance(seeded_instance(
        "i-other",
        "worker-c",
        "Running",
        "2024-01-01T00:00:00Z",
    ));

    let actuator = Actuator::new(fake);
    let canonical = actuator
        .update(&machine("worker-b"), &provider_config())
        .await
        .unwrap();
    assert_eq!(canonical.instance_id, "i-newest");

    let stopped = actuator.api().stopped();
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0].instance_ids, vec!["i-oldest"]);

    let fake = actuator.api();
    assert_eq!(fake.instance("i-oldest").unwrap().status, "Stopped");
    assert_eq!(fake.instance("i-newest").unwrap().status, "Running");
    assert_eq!(fake.instance("i-other").unwrap().status, "Running");
}

#[tokio::test(start_paused = true)]
async fn test_update_repairs_ownership_marker() {
    let fake = FakeEcs::new(0);
    let mut instance = seeded_instance("i-1", "worker-d", "Running", "2024-01-01T00:00:00Z");
    instance.tags.retain(|t| t.key != OWNED_TAG_KEY);
    instance.tags.push(Tag::new("team", "infra"));
    fake.insert_instance(instance);

    let actuator = Actuator::new(fake);
    actuator
        .update(&machine("worker-d"), &provider_config())
        .await
        .unwrap();

    let tagged = actuator.api().tagged();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].resource_ids, vec!["i-1"]);
    assert_eq!(tagged[0].tags, ownership_tags(CLUSTER_ID, "worker-d"));

    let repaired = actuator.api().instance("i-1").unwrap();
    assert_eq!(repaired.tag_value(OWNED_TAG_KEY), Some("ocp"));
    assert_eq!(repaired.tag_value(NAME_TAG_KEY), Some("worker-d"));
    assert_eq!(repaired.tag_value("team"), Some("infra"));

    // Second pass finds nothing to fix
    actuator
        .update(&machine("worker-d"), &provider_config())
        .await
        .unwrap();
    assert_eq!(actuator.api().tagged().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_times_out_and_reports_failure() {
    let registry = Registry::new();
    let recorder = Arc::new(PrometheusFailureReporter::new(&registry).unwrap());
    let settings = ActuatorSettings {
        launch_grace: Duration::from_secs(5),
        wait: WaitConfig::fixed(Duration::from_secs(5), Duration::from_secs(60)),
    };
    let actuator =
        Actuator::with_reporter(FakeEcs::new(usize::MAX - 1), recorder.clone()).with_settings(settings);

    let err = actuator
        .create(&machine("worker-e"), &provider_config(), "")
        .await
        .unwrap_err();

    assert!(matches!(err, ActuatorError::UnexpectedState { .. }));
    assert!(err.is_retryable());
    assert_eq!(recorder.failures_for("openshift-machine-api", "worker-e"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_with_unknown_security_group_tags_is_configuration_error() {
    let registry = Registry::new();
    let recorder = Arc::new(PrometheusFailureReporter::new(&registry).unwrap());
    let actuator = Actuator::with_reporter(FakeEcs::new(0), recorder.clone());

    let mut config = provider_config();
    config.security_groups = vec![ecs_actuator::config::ResourceReference::by_tags(vec![
        Tag::new("role", "nonexistent"),
    ])];

    let err = actuator
        .create(&machine("worker-f"), &config, "")
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(actuator.api().launched().is_empty());
    assert_eq!(recorder.failures_for("openshift-machine-api", "worker-f"), 1);
    assert_eq!(registry.gather()[0].get_metric().len(), 1);
}

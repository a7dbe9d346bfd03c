use std::str::FromStr;
use std::sync::Arc;

use bucketscout_common::config::ProbeConfig;
use bucketscout_common::error::{PipelineError, ResolutionError, TargetError};
use bucketscout_common::events::{RecordingSink, ScanEvent};
use bucketscout_common::model::instance::InstanceType;
use bucketscout_common::model::scan::SkipReason;
use bucketscout_common::model::target::Target;
use bucketscout_core::testing::{FakeDns, FakeStore};
use bucketscout_core::{InstanceClassifier, ScanOrchestrator};

use super::{BUCKET_IP, harness, target};

fn listing() -> ProbeConfig {
    ProbeConfig {
        attempt_listing: true,
        ..ProbeConfig::default()
    }
}

#[tokio::test]
async fn storage_name_without_region_is_skipped() {
    let h = harness(
        Some("s3-1.amazonaws.com"),
        FakeStore::new().with_object("a.txt", b"a"),
        "amazonaws.com",
    );

    let result = h.orchestrator.run(target(), &listing()).await.unwrap();

    assert_eq!(result.instance().instance_type(), InstanceType::ObjectStore);
    assert_eq!(result.skip_reason(), Some(SkipReason::MissingRegion));
    assert!(result.probes().is_empty());
    assert_eq!(h.store.list_calls(), 0);
    assert!(
        h.sink
            .events()
            .contains(&ScanEvent::ProbingSkipped {
                reason: SkipReason::MissingRegion
            })
    );
}

#[tokio::test]
async fn compute_instances_are_not_probed() {
    let h = harness(
        Some("ec2-52-218-132-9.us-west-2.compute.amazonaws.com"),
        FakeStore::new(),
        "amazonaws.com",
    );

    let result = h.orchestrator.run(target(), &listing()).await.unwrap();

    assert_eq!(result.instance().instance_type(), InstanceType::Compute);
    assert_eq!(result.instance().region(), Some("us-west-2"));
    assert_eq!(result.skip_reason(), Some(SkipReason::NotStorage));
    assert_eq!(h.store.list_calls(), 0);
}

#[tokio::test]
async fn bucket_with_nothing_requested_is_not_probed() {
    let h = harness(
        Some("s3-website.eu-west-1.amazonaws.com"),
        FakeStore::new(),
        "amazonaws.com",
    );

    let result = h
        .orchestrator
        .run(target(), &ProbeConfig::default())
        .await
        .unwrap();

    assert_eq!(result.instance().region(), Some("eu-west-1"));
    assert_eq!(result.skip_reason(), Some(SkipReason::NoProbesRequested));
    assert_eq!(h.store.list_calls(), 0);
}

#[tokio::test]
async fn unresolvable_target_fails_the_pipeline() {
    let h = harness(None, FakeStore::new(), "amazonaws.com");

    let err = h
        .orchestrator
        .run(Target::from_str("missing.example.com").unwrap(), &listing())
        .await
        .unwrap_err();

    match err {
        PipelineError::Resolution(ResolutionError::NoSuchHost { host, .. }) => {
            assert_eq!(host, "missing.example.com");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn ip_literal_targets_skip_forward_lookup() {
    let dns = FakeDns::new().with_ptr(BUCKET_IP, "s3-us-west-2-w.amazonaws.com");
    let store = Arc::new(FakeStore::new());
    let orchestrator = ScanOrchestrator::new(
        Arc::new(dns),
        store.clone(),
        InstanceClassifier::default(),
        Arc::new(RecordingSink::new()),
    );

    let result = orchestrator
        .run(Target::from_str(&BUCKET_IP.to_string()).unwrap(), &listing())
        .await
        .unwrap();

    assert_eq!(result.resolved().ip_address, BUCKET_IP);
    assert_eq!(result.instance().region(), Some("us-west-2"));
    assert_eq!(store.list_calls(), 1);
}

#[test]
fn empty_target_is_rejected_before_the_pipeline() {
    assert_eq!(Target::from_str("   "), Err(TargetError::Empty));
}

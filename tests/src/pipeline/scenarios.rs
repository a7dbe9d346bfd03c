use std::fs;

use bucketscout_common::config::ProbeConfig;
use bucketscout_common::events::ScanEvent;
use bucketscout_common::model::instance::InstanceType;
use bucketscout_common::model::probe::{Outcome, OutcomeStatus, TransferSummary};
use bucketscout_common::model::scan::SkipReason;
use bucketscout_core::testing::FakeStore;

use super::{BUCKET_IP, harness, target};

/// A website endpoint under a non-AWS provider suffix is still recognised,
/// with its region, and listed.
#[tokio::test]
async fn website_endpoint_is_classified_and_listed() {
    let h = harness(
        Some("s3-website-us-west-2.example-provider.com."),
        FakeStore::new().with_object("index.html", b"<html></html>"),
        "example-provider.com",
    );
    let cfg = ProbeConfig {
        attempt_listing: true,
        ..ProbeConfig::default()
    };

    let result = h.orchestrator.run(target(), &cfg).await.unwrap();

    assert_eq!(result.resolved().ip_address, BUCKET_IP);
    assert_eq!(
        result.instance().instance_type(),
        InstanceType::ObjectStoreWebsite
    );
    assert_eq!(result.instance().region(), Some("us-west-2"));
    assert_eq!(result.probes().listing.status(), OutcomeStatus::Succeeded);

    let events = h.sink.events();
    assert!(events.iter().any(|e| matches!(e, ScanEvent::Classified { instance }
        if instance.instance_type() == InstanceType::ObjectStoreWebsite)));
}

#[tokio::test]
async fn missing_ptr_leaves_everything_unattempted() {
    let h = harness(
        None,
        FakeStore::new().with_object("a.txt", b"a"),
        "amazonaws.com",
    );

    let result = h
        .orchestrator
        .run(target(), &ProbeConfig::all(None))
        .await
        .unwrap();

    assert_eq!(result.resolved().reverse_name, None);
    assert_eq!(result.instance().instance_type(), InstanceType::Unknown);
    assert_eq!(result.instance().region(), None);
    assert_eq!(result.skip_reason(), Some(SkipReason::Unclassified));
    assert!(result.probes().is_empty());
    assert_eq!(h.store.list_calls(), 0);

    let events = h.sink.events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ScanEvent::ReverseNameMissing { .. }))
    );
}

#[tokio::test]
async fn one_failed_transfer_is_named_and_the_rest_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Some("s3-us-west-2-w.amazonaws.com"),
        FakeStore::new()
            .with_object("a.txt", b"alpha")
            .with_object("logs/b.txt", b"bravo")
            .with_object("c.txt", b"charlie")
            .fail_get("logs/b.txt", "connection reset by peer"),
        "amazonaws.com",
    );
    let cfg = ProbeConfig {
        attempt_download: true,
        download_destination_dir: dir.path().to_path_buf(),
        max_concurrent_downloads: 2,
        ..ProbeConfig::default()
    };

    let result = h.orchestrator.run(target(), &cfg).await.unwrap();
    let probes = result.probes();

    assert_eq!(probes.listing.status(), OutcomeStatus::Succeeded);
    let failure = probes.download.failure().unwrap();
    assert_eq!(failure.failed_keys().collect::<Vec<_>>(), vec!["logs/b.txt"]);
    assert!(failure.objects[0].reason.contains("connection reset by peer"));

    assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(dir.path().join("c.txt")).unwrap(), b"charlie");
    assert!(!dir.path().join("logs").join("b.txt").exists());
    assert!(h.store.max_concurrent_gets() <= 2);
}

#[tokio::test]
async fn rejected_upload_does_not_stop_listing_or_download() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("notes.txt");
    fs::write(&upload, b"anonymous write test").unwrap();
    let downloads = dir.path().join("s3_download");

    let h = harness(
        Some("s3.eu-central-1.amazonaws.com"),
        FakeStore::new()
            .with_object("readme.md", b"# hello")
            .deny_writes(),
        "amazonaws.com",
    );
    let cfg = ProbeConfig {
        download_destination_dir: downloads.clone(),
        ..ProbeConfig::all(Some(upload))
    };

    let result = h.orchestrator.run(target(), &cfg).await.unwrap();
    let probes = result.probes();

    assert_eq!(probes.upload, Outcome::Denied);
    assert_eq!(probes.listing.status(), OutcomeStatus::Succeeded);
    assert_eq!(
        probes.download,
        Outcome::Succeeded(TransferSummary {
            objects: 1,
            bytes: 7,
            skipped: 0
        })
    );
    assert_eq!(h.store.put_calls(), 1);
    assert_eq!(h.store.object("notes.txt"), None);
    assert!(downloads.join("readme.md").is_file());
}

#[tokio::test]
async fn downloads_denied_for_every_object_name_every_key() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        Some("s3.us-east-1.amazonaws.com"),
        FakeStore::new()
            .with_object("a.txt", b"a")
            .with_object("b.txt", b"b")
            .deny_reads(),
        "amazonaws.com",
    );
    let cfg = ProbeConfig {
        attempt_download: true,
        download_destination_dir: dir.path().to_path_buf(),
        ..ProbeConfig::default()
    };

    let result = h.orchestrator.run(target(), &cfg).await.unwrap();

    assert_eq!(result.probes().listing.status(), OutcomeStatus::Succeeded);
    let failure = result.probes().download.failure().unwrap();
    assert_eq!(failure.failed_keys().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
    assert!(
        failure
            .objects
            .iter()
            .all(|object| object.reason.contains("access denied"))
    );
    assert_eq!(h.store.get_calls(), 2);
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

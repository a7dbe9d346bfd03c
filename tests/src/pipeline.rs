#![cfg(test)]

mod scenarios;
mod skipping;

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::Arc;

use bucketscout_common::events::RecordingSink;
use bucketscout_common::model::target::Target;
use bucketscout_core::InstanceClassifier;
use bucketscout_core::ScanOrchestrator;
use bucketscout_core::testing::{FakeDns, FakeStore};

pub const BUCKET_HOST: &str = "assets.example.com";
pub const BUCKET_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(52, 218, 132, 9));

pub struct Harness {
    pub orchestrator: ScanOrchestrator,
    pub store: Arc<FakeStore>,
    pub sink: Arc<RecordingSink>,
}

/// Wires the orchestrator to in-memory DNS and storage; `ptr` is the reverse
/// name of [`BUCKET_HOST`], if any.
pub fn harness(ptr: Option<&str>, store: FakeStore, suffix: &str) -> Harness {
    let mut dns = FakeDns::new().with_host(BUCKET_HOST, &[BUCKET_IP]);
    if let Some(name) = ptr {
        dns = dns.with_ptr(BUCKET_IP, name);
    }

    let store = Arc::new(store);
    let sink = Arc::new(RecordingSink::new());
    let classifier = InstanceClassifier::for_suffix(suffix).unwrap();
    let orchestrator =
        ScanOrchestrator::new(Arc::new(dns), store.clone(), classifier, sink.clone());

    Harness {
        orchestrator,
        store,
        sink,
    }
}

pub fn target() -> Target {
    Target::from_str(BUCKET_HOST).unwrap()
}

//! # Scan Orchestrator
//!
//! Runs one scan through `Resolving → Classifying → {Probing | Skipped} → Done`.
//!
//! "Not a storage endpoint" is a normal result, not an error: the only failures
//! escalated to the caller are a target without any address and a configuration
//! that is invalid before the pipeline even starts.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bucketscout_common::cancel::CancelSignal;
use bucketscout_common::config::{ProbeConfig, ScanConfig};
use bucketscout_common::error::{ConfigError, PipelineError};
use bucketscout_common::events::{EventSink, ScanEvent};
use bucketscout_common::model::instance::{ClassifiedInstance, InstanceType};
use bucketscout_common::model::scan::{ScanResult, SkipReason};
use bucketscout_common::model::target::Target;
use tracing::{Instrument, debug, info_span};

use crate::classifier::InstanceClassifier;
use crate::probe::PermissionProbe;
use crate::resolver::{DnsLookup, HostResolver, SystemDns};
use crate::storage::{AnonymousS3Client, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Resolving,
    Classifying,
    Probing,
    Skipped,
    Done,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Classifying => "classifying",
            Self::Probing => "probing",
            Self::Skipped => "skipped",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

pub struct ScanOrchestrator {
    resolver: HostResolver,
    classifier: InstanceClassifier,
    probe: PermissionProbe,
    events: Arc<dyn EventSink>,
    cancel: CancelSignal,
}

impl ScanOrchestrator {
    pub fn new(
        dns: Arc<dyn DnsLookup>,
        store: Arc<dyn ObjectStore>,
        classifier: InstanceClassifier,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            resolver: HostResolver::new(dns, events.clone()),
            classifier,
            probe: PermissionProbe::new(store, events.clone()),
            events,
            cancel: CancelSignal::new(),
        }
    }

    /// Assembles the production collaborators: system DNS and the anonymous
    /// S3 client, both bounded by the configured timeouts.
    pub fn from_config(cfg: &ScanConfig, events: Arc<dyn EventSink>) -> Result<Self, PipelineError> {
        cfg.validate()?;
        let classifier = InstanceClassifier::for_suffix(&cfg.provider_suffix)?;
        let dns = Arc::new(SystemDns::new(cfg.dns_timeout));
        let store = AnonymousS3Client::new(cfg.request_timeout)
            .map_err(|e| ConfigError::StorageClient(format!("{e:#}")))?;

        Ok(Self::new(dns, Arc::new(store), classifier, events).with_dns_timeout(cfg.dns_timeout))
    }

    pub fn with_dns_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.resolver = self.resolver.with_timeout(lookup_timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.probe = self.probe.with_cancel(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub async fn run(&self, target: Target, config: &ProbeConfig) -> Result<ScanResult, PipelineError> {
        config.validate()?;
        let span = info_span!("scan", target = %target);

        async {
            enter(ScanState::Resolving);
            let resolved = self.resolver.resolve(&target).await?;

            enter(ScanState::Classifying);
            let instance = self.classifier.classify(&resolved);
            self.events.emit(ScanEvent::Classified {
                instance: instance.clone(),
            });

            let skip = if self.cancel.is_cancelled() {
                Some(SkipReason::Cancelled)
            } else {
                skip_reason(&instance, config)
            };

            let result = match skip {
                Some(reason) => {
                    enter(ScanState::Skipped);
                    self.events.emit(ScanEvent::ProbingSkipped { reason });
                    ScanResult::skipped(target, resolved, instance, reason)
                }
                None => {
                    enter(ScanState::Probing);
                    let probes = self.probe.probe(&instance, target.host(), config).await;
                    ScanResult::probed(target, resolved, instance, probes)
                }
            };

            enter(ScanState::Done);
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

fn enter(state: ScanState) {
    debug!("scan state: {state}");
}

/// Decides whether the classified instance may be probed at all.
pub fn skip_reason(instance: &ClassifiedInstance, config: &ProbeConfig) -> Option<SkipReason> {
    match instance.instance_type() {
        InstanceType::Unknown => Some(SkipReason::Unclassified),
        InstanceType::Compute => Some(SkipReason::NotStorage),
        _ if instance.region().is_none() => Some(SkipReason::MissingRegion),
        _ if !config.wants_any() => Some(SkipReason::NoProbesRequested),
        _ => None,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDns, FakeStore};
    use bucketscout_common::events::RecordingSink;
    use bucketscout_common::model::probe::OutcomeStatus;
    use std::net::{IpAddr, Ipv4Addr};
    use std::str::FromStr;

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::new(52, 92, 1, 1));

    fn orchestrator(dns: FakeDns, store: Arc<FakeStore>) -> ScanOrchestrator {
        ScanOrchestrator::new(
            Arc::new(dns),
            store,
            InstanceClassifier::default(),
            Arc::new(RecordingSink::new()),
        )
    }

    fn listing_only() -> ProbeConfig {
        ProbeConfig {
            attempt_listing: true,
            ..ProbeConfig::default()
        }
    }

    #[test]
    fn skip_reasons() {
        let cfg = listing_only();
        assert_eq!(
            skip_reason(&ClassifiedInstance::unknown(), &cfg),
            Some(SkipReason::Unclassified)
        );
        assert_eq!(
            skip_reason(
                &ClassifiedInstance::new(InstanceType::ObjectStore, None),
                &cfg
            ),
            Some(SkipReason::MissingRegion)
        );
        assert_eq!(
            skip_reason(
                &ClassifiedInstance::new(InstanceType::Compute, Some("us-east-2".into())),
                &cfg
            ),
            Some(SkipReason::NotStorage)
        );

        let bucket = ClassifiedInstance::new(InstanceType::ObjectStore, Some("us-east-2".into()));
        assert_eq!(skip_reason(&bucket, &cfg), None);
        assert_eq!(
            skip_reason(&bucket, &ProbeConfig::default()),
            Some(SkipReason::NoProbesRequested)
        );
    }

    #[tokio::test]
    async fn unknown_instance_is_never_probed() {
        let dns = FakeDns::new()
            .with_host("www.example.com", &[IP])
            .with_ptr(IP, "server-1.example.net");
        let store = Arc::new(FakeStore::new().with_object("a.txt", b"a"));

        let result = orchestrator(dns, store.clone())
            .run(Target::from_str("www.example.com").unwrap(), &ProbeConfig::all(None))
            .await
            .unwrap();

        assert_eq!(result.skip_reason(), Some(SkipReason::Unclassified));
        assert!(result.probes().is_empty());
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn region_less_bucket_is_never_probed() {
        let dns = FakeDns::new()
            .with_host("files.example.com", &[IP])
            .with_ptr(IP, "s3-1-w.amazonaws.com");
        let store = Arc::new(FakeStore::new());

        let result = orchestrator(dns, store.clone())
            .run(Target::from_str("files.example.com").unwrap(), &listing_only())
            .await
            .unwrap();

        assert_eq!(result.instance().instance_type(), InstanceType::ObjectStore);
        assert_eq!(result.skip_reason(), Some(SkipReason::MissingRegion));
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test]
    async fn classified_bucket_is_probed_under_target_host() {
        let dns = FakeDns::new()
            .with_host("files.example.com", &[IP])
            .with_ptr(IP, "s3-us-west-2-w.amazonaws.com.");
        let store = Arc::new(FakeStore::new().with_object("a.txt", b"a"));

        let result = orchestrator(dns, store.clone())
            .run(
                Target::from_str("http://files.example.com/index.html").unwrap(),
                &listing_only(),
            )
            .await
            .unwrap();

        assert!(result.was_probed());
        assert_eq!(result.probes().listing.status(), OutcomeStatus::Succeeded);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test]
    async fn unresolvable_target_is_an_error() {
        let result = orchestrator(FakeDns::new(), Arc::new(FakeStore::new()))
            .run(Target::from_str("gone.example.com").unwrap(), &listing_only())
            .await;
        assert!(matches!(result, Err(PipelineError::Resolution(_))));
    }

    #[tokio::test]
    async fn invalid_config_fails_before_resolving() {
        let cfg = ProbeConfig {
            max_concurrent_downloads: 0,
            ..listing_only()
        };
        let result = orchestrator(FakeDns::new(), Arc::new(FakeStore::new()))
            .run(Target::from_str("gone.example.com").unwrap(), &cfg)
            .await;
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn cancellation_between_stages_skips_probing() {
        let dns = FakeDns::new()
            .with_host("files.example.com", &[IP])
            .with_ptr(IP, "s3.us-east-1.amazonaws.com");
        let store = Arc::new(FakeStore::new().with_object("a.txt", b"a"));
        let cancel = CancelSignal::new();
        cancel.cancel();

        let result = orchestrator(dns, store.clone())
            .with_cancel(cancel)
            .run(Target::from_str("files.example.com").unwrap(), &listing_only())
            .await
            .unwrap();

        assert_eq!(result.skip_reason(), Some(SkipReason::Cancelled));
        assert_eq!(store.list_calls(), 0);
    }
}

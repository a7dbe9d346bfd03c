//! Anonymous permission probes against a classified bucket.
//!
//! Order of operations: upload first (it does not depend on anything), then the
//! listing, then downloads of whatever the listing returned. The outcomes are
//! independent; a rejected upload does not stop the listing.
//!
//! Nothing here returns an error. Every storage failure becomes a `Denied` or
//! `Failed` outcome, because a rejection is exactly what a well-configured
//! bucket is expected to answer.

use std::path::Path;
use std::sync::Arc;

use bucketscout_common::cancel::CancelSignal;
use bucketscout_common::config::ProbeConfig;
use bucketscout_common::error::StorageError;
use bucketscout_common::events::{EventSink, ScanEvent};
use bucketscout_common::model::instance::ClassifiedInstance;
use bucketscout_common::model::probe::{
    Failure, Listing, Outcome, ProbeKind, ProbeResult, TransferSummary,
};
use tracing::{info_span, Instrument};

use crate::storage::ObjectStore;

mod download;

pub use download::{KeyPath, key_to_relative_path};

pub struct PermissionProbe {
    store: Arc<dyn ObjectStore>,
    events: Arc<dyn EventSink>,
    cancel: CancelSignal,
}

impl PermissionProbe {
    pub fn new(store: Arc<dyn ObjectStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            events,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the probes selected in `config` against `bucket`.
    ///
    /// The instance must be probeable (storage type with a region); otherwise
    /// every outcome stays `NotAttempted`.
    pub async fn probe(
        &self,
        instance: &ClassifiedInstance,
        bucket: &str,
        config: &ProbeConfig,
    ) -> ProbeResult {
        let Some(region) = instance.probe_region() else {
            return ProbeResult::not_attempted();
        };

        let upload = match &config.attempt_upload {
            Some(path) => {
                self.probe_upload(bucket, region, path)
                    .instrument(info_span!("upload", bucket))
                    .await
            }
            None => Outcome::NotAttempted,
        };
        self.finished(ProbeKind::Upload, &upload, None);

        let listing = if config.wants_listing() && !self.cancel.is_cancelled() {
            self.probe_listing(bucket, region)
                .instrument(info_span!("listing", bucket))
                .await
        } else {
            Outcome::NotAttempted
        };
        let listing_detail = listing.succeeded().map(|listing| {
            let truncated = if listing.truncated { ", truncated" } else { "" };
            format!("{} objects{truncated}", listing.objects.len())
        });
        self.finished(ProbeKind::Listing, &listing, listing_detail);

        let download = match &listing {
            Outcome::Succeeded(found)
                if config.attempt_download
                    && !found.objects.is_empty()
                    && !self.cancel.is_cancelled() =>
            {
                download::download_all(
                    download::DownloadJob {
                        store: self.store.clone(),
                        events: self.events.clone(),
                        cancel: self.cancel.clone(),
                        bucket,
                        region,
                        destination: &config.download_destination_dir,
                        workers: config.max_concurrent_downloads,
                    },
                    &found.objects,
                )
                .instrument(info_span!("download", bucket))
                .await
            }
            _ => Outcome::NotAttempted,
        };
        let download_detail = download
            .succeeded()
            .map(|summary| format!("{} objects, {} bytes", summary.objects, summary.bytes));
        self.finished(ProbeKind::Download, &download, download_detail);

        ProbeResult {
            listing,
            download,
            upload,
        }
    }

    async fn probe_listing(&self, bucket: &str, region: &str) -> Outcome<Listing> {
        match self.store.list_objects(bucket, region).await {
            Ok(listing) => {
                for object in &listing.objects {
                    self.events.emit(ScanEvent::ObjectListed {
                        object: object.clone(),
                    });
                }
                Outcome::Succeeded(listing)
            }
            Err(e) => storage_outcome(e),
        }
    }

    async fn probe_upload(&self, bucket: &str, region: &str, path: &Path) -> Outcome<TransferSummary> {
        let Some(key) = path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
            return Outcome::Failed(Failure::new(format!(
                "{} has no file name",
                path.display()
            )));
        };

        let body = match tokio::fs::read(path).await {
            Ok(body) => body,
            Err(e) => {
                return Outcome::Failed(Failure::new(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let bytes = body.len() as u64;

        match self.store.put_object(bucket, region, &key, body).await {
            Ok(()) => Outcome::Succeeded(TransferSummary {
                objects: 1,
                bytes,
                skipped: 0,
            }),
            Err(e) => storage_outcome(e),
        }
    }

    fn finished<T>(&self, probe: ProbeKind, outcome: &Outcome<T>, detail: Option<String>) {
        let detail = detail.or_else(|| outcome.failure().map(|failure| failure.reason.clone()));
        self.events.emit(ScanEvent::ProbeFinished {
            probe,
            status: outcome.status(),
            detail,
        });
    }
}

fn storage_outcome<T>(err: StorageError) -> Outcome<T> {
    if err.is_denied() {
        Outcome::Denied
    } else {
        Outcome::Failed(Failure::new(err.to_string()))
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

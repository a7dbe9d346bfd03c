//! Bounded worker pool that downloads every listed object to disk.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bucketscout_common::cancel::CancelSignal;
use bucketscout_common::error::StorageError;
use bucketscout_common::events::{EventSink, ScanEvent};
use bucketscout_common::model::probe::{
    FailedObject, Failure, ObjectDescriptor, Outcome, TransferSummary,
};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::storage::ObjectStore;

/// Where an object key lands beneath the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    File(PathBuf),
    /// A "folder" placeholder key ending in `/`; nothing to write.
    Directory,
    /// Would escape the destination or cannot name a file.
    Unsafe,
}

/// Turns the `/`-separated segments of a key into a relative path.
pub fn key_to_relative_path(key: &str) -> KeyPath {
    if key.ends_with('/') {
        return KeyPath::Directory;
    }

    let mut path = PathBuf::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return KeyPath::Unsafe,
            _ if segment.contains(['\\', '\0']) => return KeyPath::Unsafe,
            _ => path.push(segment),
        }
    }

    let stays_relative = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if path.as_os_str().is_empty() || !stays_relative {
        KeyPath::Unsafe
    } else {
        KeyPath::File(path)
    }
}

pub(super) struct DownloadJob<'a> {
    pub store: Arc<dyn ObjectStore>,
    pub events: Arc<dyn EventSink>,
    pub cancel: CancelSignal,
    pub bucket: &'a str,
    pub region: &'a str,
    pub destination: &'a Path,
    pub workers: usize,
}

/// Succeeds only if every object reached disk. A single failure never stops the
/// other transfers; the failure set names exactly the objects that did not make it.
/// Denials stay visible in the per-object reasons.
pub(super) async fn download_all(
    job: DownloadJob<'_>,
    objects: &[ObjectDescriptor],
) -> Outcome<TransferSummary> {
    let semaphore = Arc::new(Semaphore::new(job.workers.max(1)));
    let mut tasks: JoinSet<(String, Result<u64, StorageError>)> = JoinSet::new();
    let mut pending: BTreeSet<String> = BTreeSet::new();
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let mut failures: Vec<FailedObject> = Vec::new();
    let mut summary = TransferSummary::default();

    job.events.emit(ScanEvent::DownloadStarted {
        total: objects.len(),
    });

    for object in objects {
        let key = object.key.clone();
        let relative = match key_to_relative_path(&key) {
            KeyPath::File(relative) => relative,
            KeyPath::Directory => {
                debug!("Skipping directory placeholder {key}");
                summary.skipped += 1;
                continue;
            }
            KeyPath::Unsafe => {
                record_failure(&job, &mut failures, key, "unsafe object key".to_string());
                continue;
            }
        };

        // `a//b` and `a/b` land on the same file, as do `a` and the staging
        // file of `a`; the first key keeps it.
        let staging = partial_path(&relative);
        let owner = claimed.get(&relative).or_else(|| claimed.get(&staging));
        if let Some(owner) = owner {
            let reason = format!("path collides with {owner}");
            record_failure(&job, &mut failures, key, reason);
            continue;
        }

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            record_failure(&job, &mut failures, key, "worker pool closed".to_string());
            continue;
        };
        if job.cancel.is_cancelled() {
            record_failure(&job, &mut failures, key, "cancelled".to_string());
            continue;
        }

        let store = job.store.clone();
        let bucket = job.bucket.to_string();
        let region = job.region.to_string();
        let path = job.destination.join(&relative);
        claimed.insert(relative, key.clone());
        claimed.insert(staging, key.clone());
        pending.insert(key.clone());

        tasks.spawn(async move {
            let _permit = permit;
            let result = fetch_to_disk(store.as_ref(), &bucket, &region, &key, &path).await;
            (key, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let Ok((key, result)) = joined else {
            continue;
        };
        pending.remove(&key);
        match result {
            Ok(bytes) => {
                summary.objects += 1;
                summary.bytes += bytes;
                job.events.emit(ScanEvent::ObjectDownloaded { key, bytes });
            }
            Err(err) => record_failure(&job, &mut failures, key, err.to_string()),
        }
    }

    // Whatever is still pending belonged to a task that panicked.
    for key in std::mem::take(&mut pending) {
        record_failure(&job, &mut failures, key, "download task aborted".to_string());
    }

    aggregate(summary, failures, objects.len())
}

fn record_failure(
    job: &DownloadJob<'_>,
    failures: &mut Vec<FailedObject>,
    key: String,
    reason: String,
) {
    job.events.emit(ScanEvent::ObjectFailed {
        key: key.clone(),
        reason: reason.clone(),
    });
    failures.push(FailedObject::new(key, reason));
}

fn aggregate(
    summary: TransferSummary,
    mut failures: Vec<FailedObject>,
    total: usize,
) -> Outcome<TransferSummary> {
    if failures.is_empty() {
        return Outcome::Succeeded(summary);
    }

    failures.sort_by(|a, b| a.key.cmp(&b.key));
    let reason = format!("{} of {total} objects failed", failures.len());
    Outcome::Failed(Failure::with_objects(reason, failures))
}

/// Streams the object into `<path>.part` and renames it into place once the
/// whole body arrived, so a failed transfer never leaves a truncated file.
async fn fetch_to_disk(
    store: &dyn ObjectStore,
    bucket: &str,
    region: &str,
    key: &str,
    path: &Path,
) -> Result<u64, StorageError> {
    if let Some(parent) = path.parent() {
        // create_dir_all tolerates directories created concurrently by other workers.
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error(parent, e))?;
    }

    let partial = partial_path(path);
    let mut file = File::create(&partial)
        .await
        .map_err(|e| io_error(&partial, e))?;

    let written = match store.get_object(bucket, region, key, &mut file).await {
        Ok(bytes) => file
            .flush()
            .await
            .map(|()| bytes)
            .map_err(|e| io_error(&partial, e)),
        Err(e) => Err(e),
    };
    drop(file);

    let finished = match written {
        Ok(bytes) => tokio::fs::rename(&partial, path)
            .await
            .map(|()| bytes)
            .map_err(|e| io_error(path, e)),
        Err(e) => Err(e),
    };
    if finished.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    finished
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

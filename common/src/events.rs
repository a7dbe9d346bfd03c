//! # Scan Events
//!
//! Components never talk to a global logger. They report what they observe to an
//! [`EventSink`] handed to them at construction time; the CLI decides how the
//! events are rendered and the tests simply record them.

use std::net::IpAddr;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::model::instance::ClassifiedInstance;
use crate::model::probe::{ObjectDescriptor, OutcomeStatus, ProbeKind};
use crate::model::scan::SkipReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    AddressResolved { host: String, ip: IpAddr },
    ReverseNameResolved { ip: IpAddr, name: String },
    ReverseNameMissing { ip: IpAddr, reason: String },
    Classified { instance: ClassifiedInstance },
    ProbingSkipped { reason: SkipReason },
    ObjectListed { object: ObjectDescriptor },
    DownloadStarted { total: usize },
    ObjectDownloaded { key: String, bytes: u64 },
    ObjectFailed { key: String, reason: String },
    ProbeFinished {
        probe: ProbeKind,
        status: OutcomeStatus,
        detail: Option<String>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

/// Forwards every event to `tracing` at a severity matching its meaning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::AddressResolved { host, ip } => {
                info!("{host} resolves to {ip}");
            }
            ScanEvent::ReverseNameResolved { ip, name } => {
                info!("Reverse DNS lookup of {ip} returned {name}");
            }
            ScanEvent::ReverseNameMissing { ip, reason } => {
                warn!("Reverse DNS lookup of {ip} failed: {reason}");
            }
            ScanEvent::Classified { instance } => match instance.region() {
                Some(region) => info!(
                    "Instance identified as {} in {region}",
                    instance.instance_type()
                ),
                None if instance.is_known() => warn!(
                    "Instance identified as {} but no region was found",
                    instance.instance_type()
                ),
                None => info!("Instance type could not be determined"),
            },
            ScanEvent::ProbingSkipped { reason } => {
                info!("Skipping permission probes: {reason}");
            }
            ScanEvent::ObjectListed { object } => {
                let modified = object
                    .last_modified
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                info!("{} \t {} \t {}", object.key, object.size, modified);
            }
            ScanEvent::DownloadStarted { total } => {
                info!("Downloading {total} objects");
            }
            ScanEvent::ObjectDownloaded { key, bytes } => {
                debug!("Downloaded {key} ({bytes} bytes)");
            }
            ScanEvent::ObjectFailed { key, reason } => {
                warn!("Could not download {key}: {reason}");
            }
            ScanEvent::ProbeFinished {
                probe,
                status,
                detail,
            } => {
                let detail = detail.map(|d| format!(" ({d})")).unwrap_or_default();
                match status {
                    OutcomeStatus::Failed => warn!("{probe} probe failed{detail}"),
                    OutcomeStatus::NotAttempted => debug!("{probe} probe not attempted{detail}"),
                    _ => info!("Anonymous {probe} {status}{detail}"),
                }
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ScanEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

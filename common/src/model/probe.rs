//! Outcomes of the anonymous permission probes.

use std::fmt;

use chrono::{DateTime, Utc};

/// One row of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// The first page of a bucket listing, in the provider's order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    pub objects: Vec<ObjectDescriptor>,
    /// The provider reported more pages than the one consumed.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferSummary {
    pub objects: usize,
    pub bytes: u64,
    /// Directory placeholder keys that carry no content.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedObject {
    pub key: String,
    pub reason: String,
}

impl FailedObject {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Why a probe failed. Download failures also name every object that did not
/// make it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub reason: String,
    pub objects: Vec<FailedObject>,
}

impl Failure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            objects: Vec::new(),
        }
    }

    pub fn with_objects(reason: impl Into<String>, objects: Vec<FailedObject>) -> Self {
        Self {
            reason: reason.into(),
            objects,
        }
    }

    pub fn count(&self) -> usize {
        self.objects.len()
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|object| object.key.as_str())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// `Denied` means access control rejected the anonymous request. `Failed` means
/// something unexpected happened and the question could not be answered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome<T> {
    #[default]
    NotAttempted,
    Succeeded(T),
    Denied,
    Failed(Failure),
}

impl<T> Outcome<T> {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::NotAttempted => OutcomeStatus::NotAttempted,
            Self::Succeeded(_) => OutcomeStatus::Succeeded,
            Self::Denied => OutcomeStatus::Denied,
            Self::Failed(_) => OutcomeStatus::Failed,
        }
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            Self::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_attempted(&self) -> bool {
        !matches!(self, Self::NotAttempted)
    }
}

/// Payload-free view of an [`Outcome`], used in events and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    NotAttempted,
    Succeeded,
    Denied,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotAttempted => "not attempted",
            Self::Succeeded => "allowed",
            Self::Denied => "denied",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Listing,
    Download,
    Upload,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Listing => "listing",
            Self::Download => "download",
            Self::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub listing: Outcome<Listing>,
    pub download: Outcome<TransferSummary>,
    pub upload: Outcome<TransferSummary>,
}

impl ProbeResult {
    pub fn not_attempted() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !self.listing.is_attempted() && !self.download.is_attempted() && !self.upload.is_attempted()
    }

    /// Anything an anonymous caller was allowed to do.
    pub fn exposed(&self) -> bool {
        [
            self.listing.status(),
            self.download.status(),
            self.upload.status(),
        ]
        .contains(&OutcomeStatus::Succeeded)
    }
}

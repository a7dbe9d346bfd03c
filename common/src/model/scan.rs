use std::fmt;

use super::host::ResolvedHost;
use super::instance::ClassifiedInstance;
use super::probe::ProbeResult;
use super::target::Target;

/// Why the orchestrator did not run the permission probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The reverse name matched none of the provider's naming patterns.
    Unclassified,
    /// Classified, but not an object store (e.g. a compute instance).
    NotStorage,
    /// Classified as storage, but no region could be extracted.
    MissingRegion,
    /// The configuration asked for no probes at all.
    NoProbesRequested,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unclassified => "not a recognized storage endpoint",
            Self::NotStorage => "instance is not an object store",
            Self::MissingRegion => "storage endpoint has no extractable region",
            Self::NoProbesRequested => "no probes were requested",
            Self::Cancelled => "scan was cancelled",
        };
        f.write_str(text)
    }
}

/// The aggregate handed back to the caller. Built once per scan and read-only
/// from then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    target: Target,
    resolved: ResolvedHost,
    instance: ClassifiedInstance,
    probes: ProbeResult,
    skip_reason: Option<SkipReason>,
}

impl ScanResult {
    pub fn probed(
        target: Target,
        resolved: ResolvedHost,
        instance: ClassifiedInstance,
        probes: ProbeResult,
    ) -> Self {
        Self {
            target,
            resolved,
            instance,
            probes,
            skip_reason: None,
        }
    }

    pub fn skipped(
        target: Target,
        resolved: ResolvedHost,
        instance: ClassifiedInstance,
        reason: SkipReason,
    ) -> Self {
        Self {
            target,
            resolved,
            instance,
            probes: ProbeResult::not_attempted(),
            skip_reason: Some(reason),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn resolved(&self) -> &ResolvedHost {
        &self.resolved
    }

    pub fn instance(&self) -> &ClassifiedInstance {
        &self.instance
    }

    pub fn probes(&self) -> &ProbeResult {
        &self.probes
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    pub fn was_probed(&self) -> bool {
        self.skip_reason.is_none()
    }
}

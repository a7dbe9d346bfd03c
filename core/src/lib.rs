//! # bucketscout core
//!
//! The classification-and-probing pipeline.
//!
//! * [`resolver`]: forward and reverse DNS for the target.
//! * [`classifier`]: maps the reverse name onto an instance type and region.
//! * [`storage`]: the anonymous object-store client the probes talk through.
//! * [`probe`]: listing, download and upload checks.
//! * [`orchestrator`]: runs the stages in order and builds the scan result.
//!
//! Every collaborator with side effects (DNS, storage, events) is injected as a
//! trait object, so the whole pipeline runs against in-memory fakes in tests.

pub mod classifier;
pub mod orchestrator;
pub mod probe;
pub mod resolver;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use classifier::InstanceClassifier;
pub use orchestrator::ScanOrchestrator;
pub use probe::PermissionProbe;
pub use resolver::HostResolver;

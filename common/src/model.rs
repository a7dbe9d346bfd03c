//! # Domain Models
//!
//! Every stage of the pipeline consumes one of these values and returns a new one:
//!
//! * [`target::Target`] → [`host::ResolvedHost`] → [`instance::ClassifiedInstance`]
//!   → [`probe::ProbeResult`] → [`scan::ScanResult`].
//!
//! None of them is mutated after construction.

pub mod host;
pub mod instance;
pub mod probe;
pub mod scan;
pub mod target;

//! # bucketscout common
//!
//! Models, configuration and error types shared by the scanning core and the CLI.
//!
//! * **[`model`]**: the immutable values handed from one pipeline stage to the next.
//! * **[`config`]**: typed, defaulted probe and scan configuration.
//! * **[`error`]**: the error taxonomy of the pipeline.
//! * **[`events`]**: the event sink injected into every component.
//! * **[`cancel`]**: the cooperative cancellation signal.

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;
pub mod model;

//! # Observability
//!
//! Structured logging through `tracing`. Secret values, tokens and service account JWTs
//! are never recorded; spans carry the logical path and an operation id instead.

pub mod logging;

pub use logging::{build_subscriber, init_logging, LoggingConfig};

//! Telemetry: structured logging for the tenancy layer.
//!
//! Rejections raised by the codec, validator and gate are logged where they
//! are detected; the error counter lives next to the HTTP mapping in
//! [`crate::error`].

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};

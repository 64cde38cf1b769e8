//! Logging setup for Hermes services.
//!
//! Hermes crates emit `tracing` events:
//!
//! | Level | Events |
//! |-------|--------|
//! | `trace` | broker lookups, constructions, decoder misses |
//! | `debug` | pipeline phase transitions, short circuits, connection lifecycle |
//! | `warn` | skipped finalizers, response write errors, unencodable responses |
//! | `error` | accept failures, connection errors |
//!
//! This crate installs a subscriber for them. Configuration comes either from
//! the presets on [`LogConfig`] or from the `[logging]` section of a
//! [`hermes_config::HermesConfig`].
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_config::HermesConfig;
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! let config = HermesConfig::production();
//! init_logging(&LogConfig::from(&config.logging))?;
//! # Ok::<(), hermes_telemetry::TelemetryError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

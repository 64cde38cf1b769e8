//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive does not parse.
    #[error("invalid log filter {0}")]
    InvalidFilter(String),

    /// Failed to install the subscriber, usually because one is already set.
    #[error("cannot install log subscriber: {0}")]
    LoggingInit(String),
}

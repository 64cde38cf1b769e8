//! Subscriber installation.
//!
//! ```rust,no_run
//! use hermes_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(pets = 3, "store loaded");
//! # Ok::<(), hermes_telemetry::TelemetryError>(())
//! ```

use hermes_config::{LogFormat, LoggingConfig};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// What [`init_logging`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// When false, [`init_logging`] is a no-op.
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `hermes_core=trace,warn`.
    pub level: String,
    /// Line-delimited JSON or multi-line pretty output.
    pub format: LogFormat,
    /// Emit an event when a span opens and closes.
    pub span_events: bool,
    /// Source file and line on every event.
    pub location: bool,
    /// Thread id on every event.
    pub thread_ids: bool,
    /// Colors; never applied to JSON.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty, colored, `debug` level, with span timing and locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            location: true,
            thread_ids: false,
            ansi: true,
        }
    }

    /// JSON at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            location: false,
            thread_ids: false,
            ansi: false,
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let fmt = tracing_subscriber::fmt::layer()
            .with_span_events(spans)
            .with_file(self.location)
            .with_line_number(self.location)
            .with_thread_ids(self.thread_ids);

        match self.format {
            LogFormat::Json => fmt.json().with_ansi(false).boxed(),
            LogFormat::Pretty => fmt.pretty().with_ansi(self.ansi).boxed(),
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    /// Starts from the preset matching the section's format, then applies
    /// the section's explicit settings.
    fn from(section: &LoggingConfig) -> Self {
        let preset = match section.format {
            LogFormat::Json => Self::production(),
            LogFormat::Pretty => Self::development(),
        };
        Self {
            enabled: section.enabled,
            level: section.level.clone(),
            location: section.include_location,
            ansi: section.ansi_enabled,
            ..preset
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// [`TelemetryError::InvalidFilter`] when `config.level` does not parse,
/// [`TelemetryError::LoggingInit`] when a global subscriber already exists.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    tracing_subscriber::registry()
        .with(config.layer().with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
    Ok(())
}

/// Parses a filter directive.
///
/// # Errors
///
/// [`TelemetryError::InvalidFilter`] naming the directive.
pub fn create_env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| TelemetryError::InvalidFilter(format!("{directive}: {e}")))
}

//! The sections of a Hermes config file.
//!
//! Every section accepts partial input: omitted keys keep their defaults and
//! unknown keys are rejected.

use serde::{Deserialize, Serialize};

/// `[server]`: the HTTP listener.
///
/// ```
/// use hermes_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..ServerConfig::default()
/// };
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, `host:port`.
    pub http_addr: String,

    /// Seconds to wait for open connections after shutdown is triggered.
    pub shutdown_timeout_secs: u64,

    /// Connection cap; `0` disables it.
    pub max_connections: u32,

    /// Milliseconds allowed for receiving a request body.
    pub request_timeout_ms: u64,

    /// Bodies larger than this are refused with 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
            max_connections: 10_000,
            request_timeout_ms: 30_000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human readable.
    Pretty,
}

/// `[logging]`: what the subscriber installed at startup prints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// When `false` no subscriber is installed.
    pub enabled: bool,

    /// `EnvFilter` directive, e.g. `info` or `hermes_core=trace,info`.
    pub level: String,

    /// Line format.
    pub format: LogFormat,

    /// Colour output.
    pub ansi_enabled: bool,

    /// Attach file and line to every event.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi_enabled: false,
            include_location: false,
        }
    }
}

/// `[decoder]`: the standard request decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Answer 415 to non-empty bodies not declared as JSON.
    pub require_json_content_type: bool,
}

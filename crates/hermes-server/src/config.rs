//! Runtime settings for [`Server`](crate::Server).
//!
//! Defaults come from the `[server]` section of [`hermes_config`], so a
//! server built without a config file behaves like one loaded from an
//! empty file.
//!
//! ```rust
//! use hermes_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::default()
//!     .with_http_addr("127.0.0.1:3000")
//!     .with_max_body_bytes(64 * 1024);
//!
//! assert_eq!(config.socket_addr().unwrap().port(), 3000);
//! assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
//! ```

use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

/// Listener, body and shutdown limits for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
    max_connections: Option<usize>,
}

impl ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// The bind address parsed as a socket address.
    ///
    /// # Errors
    ///
    /// Fails for host names; only literal IP addresses are accepted.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.http_addr.parse()
    }

    /// How long shutdown waits for open connections to finish.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Deadline for receiving a complete request body.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Body size limit; larger bodies are answered with 413.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Cap on concurrent connections, `None` when unlimited.
    #[must_use]
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    /// Returns a copy bound to `addr`.
    #[must_use]
    pub fn with_http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Returns a copy with a different shutdown grace period.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns a copy with a different body deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns a copy with a different body size limit.
    #[must_use]
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Returns a copy with a different connection cap.
    #[must_use]
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&hermes_config::ServerConfig::default())
    }
}

impl From<&hermes_config::ServerConfig> for ServerConfig {
    /// A `max_connections` of 0 in the file means unlimited.
    fn from(section: &hermes_config::ServerConfig) -> Self {
        Self {
            http_addr: section.http_addr.clone(),
            shutdown_timeout: Duration::from_secs(section.shutdown_timeout_secs),
            request_timeout: Duration::from_millis(section.request_timeout_ms),
            max_body_bytes: section.max_body_bytes,
            max_connections: usize::try_from(section.max_connections)
                .ok()
                .filter(|&max| max != 0),
        }
    }
}

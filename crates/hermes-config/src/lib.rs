//! Typed configuration for Hermes services.
//!
//! A [`HermesConfig`] has one struct per file section:
//!
//! - [`ServerConfig`]: bind address, timeouts, connection and body limits
//! - [`LoggingConfig`]: filter directive, output format, decoration
//! - [`DecoderConfig`]: how strictly request bodies are checked
//!
//! [`ConfigLoader`] stacks a preset, a TOML or JSON file, an optional `.env`
//! file and `HERMES__SECTION__KEY` variables, then validates the result.
//! Unknown keys anywhere are an error.
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("hermes.toml")?
//!     .with_default_env()
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! A file with every key at its default:
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! max_connections = 10000     # 0 = unlimited
//! request_timeout_ms = 30000
//! max_body_bytes = 2097152
//!
//! [logging]
//! enabled = true
//! level = "info"              # EnvFilter directive
//! format = "json"             # or "pretty"
//! ansi_enabled = false
//! include_location = false
//!
//! [decoder]
//! require_json_content_type = false
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{DecoderConfig, LogFormat, LoggingConfig, ServerConfig};

//! The root configuration document and its presets.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DecoderConfig, LogFormat, LoggingConfig, ServerConfig};

/// Everything a Hermes service reads at startup, one field per file section.
///
/// Sections can be built in place; the rest keep their defaults:
///
/// ```
/// use hermes_config::{HermesConfig, ServerConfig};
///
/// let config = HermesConfig {
///     server: ServerConfig {
///         http_addr: "127.0.0.1:3000".to_string(),
///         ..ServerConfig::default()
///     },
///     ..HermesConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct HermesConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
    /// `[decoder]`
    pub decoder: DecoderConfig,
}

impl HermesConfig {
    /// Local development: loopback address, pretty `debug` logs with
    /// colors and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                http_addr: "127.0.0.1:8080".to_string(),
                ..ServerConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ansi_enabled: true,
                include_location: true,
                ..LoggingConfig::default()
            },
            decoder: DecoderConfig::default(),
        }
    }

    /// Deployed services: JSON logs at `info`, and JSON bodies must say so
    /// in their content type.
    #[must_use]
    pub fn production() -> Self {
        Self {
            decoder: DecoderConfig {
                require_json_content_type: true,
            },
            ..Self::default()
        }
    }

    /// Rejects values that deserialize fine but cannot run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending key as
    /// `section.key`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.check()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn check(&self) -> Result<(), ConfigError> {
        if self.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("'{}' is not an ip:port address", self.http_addr),
            ));
        }
        let limits = [
            ("server.shutdown_timeout_secs", self.shutdown_timeout_secs == 0),
            ("server.request_timeout_ms", self.request_timeout_ms == 0),
            ("server.max_body_bytes", self.max_body_bytes == 0),
        ];
        match limits.into_iter().find(|(_, zero)| *zero) {
            Some((field, _)) => Err(ConfigError::invalid_value(field, "must be greater than zero")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_field(config: &HermesConfig) -> Option<String> {
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn defaults_and_presets_validate() {
        for config in [
            HermesConfig::default(),
            HermesConfig::development(),
            HermesConfig::production(),
        ] {
            assert_eq!(invalid_field(&config), None);
        }
    }

    #[test]
    fn presets_differ_where_documented() {
        let dev = HermesConfig::development();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.logging.include_location);
        assert!(!dev.decoder.require_json_content_type);

        let prod = HermesConfig::production();
        assert_eq!(prod.logging, LoggingConfig::default());
        assert!(prod.decoder.require_json_content_type);
    }

    #[test]
    fn host_names_are_rejected() {
        let mut config = HermesConfig::default();
        config.server.http_addr = "localhost:80".to_string();
        assert_eq!(invalid_field(&config).as_deref(), Some("server.http_addr"));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = HermesConfig::default();
        config.server.request_timeout_ms = 0;
        assert_eq!(invalid_field(&config).as_deref(), Some("server.request_timeout_ms"));

        let mut config = HermesConfig::default();
        config.server.max_body_bytes = 0;
        assert_eq!(invalid_field(&config).as_deref(), Some("server.max_body_bytes"));

        let mut config = HermesConfig::default();
        config.server.max_connections = 0;
        assert_eq!(invalid_field(&config), None);
    }

    #[test]
    fn blank_level_is_rejected() {
        let mut config = HermesConfig::default();
        config.logging.level = "  ".to_string();
        assert_eq!(invalid_field(&config).as_deref(), Some("logging.level"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(toml::from_str::<HermesConfig>("[metrics]\nenabled = true\n").is_err());
        assert_eq!(toml::from_str::<HermesConfig>("").unwrap(), HermesConfig::default());
    }
}

//! Layered loading: preset, then file, then environment.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::{ConfigError, HermesConfig, LogFormat};

/// Prefix read by [`ConfigLoader::with_default_env`].
pub const DEFAULT_ENV_PREFIX: &str = "HERMES";

/// File formats accepted by [`ConfigLoader::with_file`].
#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn named(name: &str) -> Result<Self, ConfigError> {
        if name.eq_ignore_ascii_case("toml") {
            Ok(Self::Toml)
        } else if name.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(ConfigError::unsupported_format(name))
        }
    }

    fn parse(self, content: &str) -> Result<HermesConfig, ConfigError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

/// Builds a [`HermesConfig`] from layers, each replacing what came before.
///
/// A file replaces the whole document, so its omitted keys fall back to
/// their defaults rather than to the preset. Environment variables are read
/// last, at [`load`](Self::load), and touch single keys.
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_development()
///     .with_optional_file("hermes.toml")?
///     .with_dotenv()?
///     .with_default_env()
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from [`HermesConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current layers with [`HermesConfig::development`].
    ///
    /// ```
    /// let config = hermes_config::ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Replaces the current layers with [`HermesConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Reads a `.toml` or `.json` file, picking the parser by extension.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`], [`ConfigError::Read`],
    /// [`ConfigError::UnsupportedFormat`] for other extensions, or a parse
    /// error (unknown keys included).
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::file_not_found(path));
        }
        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        let format = Format::named(extension)?;
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.with_document(format, &content)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Same as `with_file` for a file that exists.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Parses an in-memory document; `format` is `toml` or `json`, in any
    /// case.
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .and_then(ConfigLoader::load)
    ///     .unwrap();
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// ```
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnsupportedFormat`] or a parse error.
    pub fn with_string(self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.with_document(Format::named(format)?, content)
    }

    fn with_document(mut self, format: Format, content: &str) -> Result<Self, ConfigError> {
        self.config = format.parse(content)?;
        Ok(self)
    }

    /// Reads `PREFIX__SECTION__KEY` variables at load time, e.g.
    /// `HERMES__SERVER__HTTP_ADDR=0.0.0.0:9000`. Variables naming no known
    /// key are ignored.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_ascii_uppercase());
        self
    }

    /// [`with_env_prefix`](Self::with_env_prefix) with `HERMES`.
    #[must_use]
    pub fn with_default_env(self) -> Self {
        self.with_env_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Exports the nearest `.env` file (this directory or a parent) into the
    /// process environment, if there is one. Variables already set win.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Dotenv`] for a file that does not parse.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(err) if !err.not_found() => Err(err.into()),
            _ => Ok(self),
        }
    }

    /// Exports one specific `.env` file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Dotenv`] if it is missing or malformed.
    pub fn with_dotenv_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Applies environment overrides, then validates.
    ///
    /// ```
    /// let config = hermes_config::ConfigLoader::new().load().unwrap();
    /// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    /// ```
    ///
    /// # Errors
    ///
    /// [`ConfigError::EnvVar`] for an override that does not parse, or the
    /// first failure from [`HermesConfig::validate`].
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            override_from(&mut self.config, &prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// The layers so far, without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }
}

fn override_from(
    config: &mut HermesConfig,
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    let head = format!("{prefix}__");
    for (var, value) in vars {
        let Some(path) = var.strip_prefix(&head) else {
            continue;
        };
        let Some((section, key)) = path.split_once("__") else {
            continue;
        };
        set_key(config, section, key, value.trim())
            .map_err(|reason| ConfigError::env_parse_error(&var, reason))?;
    }
    Ok(())
}

fn set_key(config: &mut HermesConfig, section: &str, key: &str, value: &str) -> Result<(), &'static str> {
    let server = &mut config.server;
    let logging = &mut config.logging;
    match (section, key) {
        ("SERVER", "HTTP_ADDR") => server.http_addr = value.to_string(),
        ("SERVER", "SHUTDOWN_TIMEOUT_SECS") => server.shutdown_timeout_secs = number(value)?,
        ("SERVER", "MAX_CONNECTIONS") => server.max_connections = number(value)?,
        ("SERVER", "REQUEST_TIMEOUT_MS") => server.request_timeout_ms = number(value)?,
        ("SERVER", "MAX_BODY_BYTES") => server.max_body_bytes = number(value)?,
        ("LOGGING", "ENABLED") => logging.enabled = flag(value)?,
        ("LOGGING", "LEVEL") => logging.level = value.to_string(),
        ("LOGGING", "FORMAT") => logging.format = log_format(value)?,
        ("LOGGING", "ANSI_ENABLED") => logging.ansi_enabled = flag(value)?,
        ("LOGGING", "INCLUDE_LOCATION") => logging.include_location = flag(value)?,
        ("DECODER", "REQUIRE_JSON_CONTENT_TYPE") => {
            config.decoder.require_json_content_type = flag(value)?;
        }
        _ => {}
    }
    Ok(())
}

fn number<T: FromStr>(value: &str) -> Result<T, &'static str> {
    value.parse().map_err(|_| "expected a non-negative integer")
}

fn flag(value: &str) -> Result<bool, &'static str> {
    const TRUE: [&str; 4] = ["true", "1", "yes", "on"];
    const FALSE: [&str; 4] = ["false", "0", "no", "off"];
    if TRUE.iter().any(|t| value.eq_ignore_ascii_case(t)) {
        Ok(true)
    } else if FALSE.iter().any(|f| value.eq_ignore_ascii_case(f)) {
        Ok(false)
    } else {
        Err("expected true/false, yes/no, on/off or 1/0")
    }
}

fn log_format(value: &str) -> Result<LogFormat, &'static str> {
    if value.eq_ignore_ascii_case("json") {
        Ok(LogFormat::Json)
    } else if value.eq_ignore_ascii_case("pretty") {
        Ok(LogFormat::Pretty)
    } else {
        Err("expected json or pretty")
    }
}

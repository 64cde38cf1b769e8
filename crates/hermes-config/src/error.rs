//! Errors raised while assembling a [`HermesConfig`](crate::HermesConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why configuration could not be loaded or validated.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required config file does not exist.
    #[error("config file {} does not exist", path.display())]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A config file exists but could not be read.
    #[error("cannot read config file {}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// I/O error from the filesystem.
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, or TOML that does not match the schema.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or JSON that does not match the schema.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// The source is neither TOML nor JSON.
    #[error("unsupported config format '{format}' (expected toml or json)")]
    UnsupportedFormat {
        /// Extension or format name that was given.
        format: String,
    },

    /// A loaded value failed validation.
    #[error("{field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field, e.g. `server.http_addr`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be parsed.
    #[error("environment variable {var}: {reason}")]
    EnvVar {
        /// Full variable name, prefix included.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A `.env` file exists but is malformed or unreadable.
    #[error("cannot load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Builds a validation error for `field`.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvVar {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

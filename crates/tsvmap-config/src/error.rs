//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a [`crate::Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A key carried a value that could not be parsed or is out of range.
    #[error("Invalid value for '{key}': '{value}' ({reason})")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// Offending value
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The database URL uses a scheme other than SQLite.
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),

    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// File that was being parsed
        path: PathBuf,
        /// Parser message
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

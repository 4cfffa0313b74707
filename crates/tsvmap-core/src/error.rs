//! Error types for the sync engine and conversion service

use crate::rule_file::FormatError;
use std::path::PathBuf;
use thiserror::Error;
use tsvmap_store::SqliteError;

/// Errors raised inside the core.
///
/// Service methods convert these into failed outcomes at their boundary;
/// they only escape from constructors and query helpers.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The rule file is malformed; nothing from it was applied.
    #[error("Invalid rule file {path}: {error}")]
    Format {
        path: PathBuf,
        #[source]
        error: FormatError,
    },

    /// The rule file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No rule set name can be derived from the path.
    #[error("Cannot derive a rule set name from {0}")]
    InvalidPath(PathBuf),

    /// Another live file already owns the rule set name.
    #[error("Rule set '{name}' is already sourced from {existing}")]
    Conflict { name: String, existing: PathBuf },

    /// Store failure; the surrounding transaction was rolled back.
    #[error("Database error: {0}")]
    Store(#[from] SqliteError),
}

impl CoreError {
    /// Whether the error is local to one rule file's content.
    pub fn is_format_error(&self) -> bool {
        matches!(self, CoreError::Format { .. })
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

//! Error types for SQLite storage

use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored value could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl SqliteError {
    /// Whether the error is a UNIQUE/CHECK/FOREIGN KEY violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

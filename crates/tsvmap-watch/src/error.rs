//! Error types for the rule file watcher.

use thiserror::Error;

/// Errors that can occur while watching rule files.
#[derive(Error, Debug)]
pub enum Error {
    /// The watch directory is missing or not a directory.
    #[error("Invalid watch directory: {0}")]
    InvalidPath(String),

    /// File system watching error.
    #[error("File watching error: {0}")]
    Watch(String),

    /// A change or delete callback failed.
    #[error("Event handling error: {0}")]
    Handler(String),

    /// Watcher is already running.
    #[error("Rule file watcher is already running")]
    AlreadyRunning,
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, Error>;

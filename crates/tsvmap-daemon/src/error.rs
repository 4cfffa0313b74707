//! Daemon error type

use thiserror::Error;
use tsvmap_config::ConfigError;
use tsvmap_core::CoreError;
use tsvmap_store::SqliteError;

/// Errors surfaced by [`crate::Engine`]
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Store(#[from] SqliteError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Watcher error: {0}")]
    Watch(#[from] tsvmap_watch::Error),
}

impl DaemonError {
    /// Whether the failure came from the rule store
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            DaemonError::Store(_) | DaemonError::Core(CoreError::Store(_))
        )
    }
}

pub type DaemonResult<T> = Result<T, DaemonError>;

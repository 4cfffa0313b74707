//! Connection settings for the SQLite store

use std::path::{Path, PathBuf};

/// SQLite connection configuration
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file, or `:memory:`
    pub path: PathBuf,
    /// Enable write-ahead logging (ignored for in-memory databases)
    pub wal_mode: bool,
    /// Enforce foreign keys; cascade delete depends on this
    pub foreign_keys: bool,
    /// How long a writer waits for a lock held by another connection
    pub busy_timeout_ms: u32,
    /// Page cache size (negative values are KiB)
    pub cache_size: i64,
}

impl SqliteConfig {
    /// Configuration for a file database at `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Configuration for a transient in-memory database
    pub fn memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            wal_mode: false,
            ..Self::default()
        }
    }

    /// Whether this configuration points at an in-memory database
    pub fn is_memory(&self) -> bool {
        self.path.to_str() == Some(":memory:")
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tsvmap.db"),
            wal_mode: true,
            foreign_keys: true,
            busy_timeout_ms: 5000,
            cache_size: -8000,
        }
    }
}

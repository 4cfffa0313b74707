//! Watcher configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-path debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;
/// Default delete grace delay in milliseconds.
pub const DEFAULT_DELETE_GRACE_MS: u64 = 500;
/// Default bound on `stop()` in milliseconds.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 5000;
/// Default backend coalescing window in milliseconds.
pub const DEFAULT_BACKEND_DEBOUNCE_MS: u64 = 100;

/// Configuration for a [`RuleFileWatcher`](crate::RuleFileWatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Directory watched (non-recursively)
    pub watch_dir: PathBuf,
    /// Rule file extension, without the dot
    pub extension: String,
    /// Events for a path within this window of the last processed one are dropped
    pub debounce_ms: u64,
    /// How long a deleted rule file may take to reappear
    pub delete_grace_ms: u64,
    /// Upper bound on waiting for the reconciler during `stop()`
    pub stop_timeout_ms: u64,
    /// Coalescing window of the notify debouncer
    pub backend_debounce_ms: u64,
}

impl WatcherConfig {
    /// Configuration with defaults for `watch_dir`.
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            extension: "tsv".to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            delete_grace_ms: DEFAULT_DELETE_GRACE_MS,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            backend_debounce_ms: DEFAULT_BACKEND_DEBOUNCE_MS,
        }
    }

    /// Set the rule file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Set the per-path debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = debounce.as_millis() as u64;
        self
    }

    /// Set the delete grace delay.
    pub fn with_delete_grace(mut self, grace: Duration) -> Self {
        self.delete_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Set the stop timeout.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the backend coalescing window.
    pub fn with_backend_debounce(mut self, debounce: Duration) -> Self {
        self.backend_debounce_ms = debounce.as_millis() as u64;
        self
    }

    /// Watched directory.
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Per-path debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delete grace delay.
    pub fn delete_grace(&self) -> Duration {
        Duration::from_millis(self.delete_grace_ms)
    }

    /// Stop timeout.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Backend coalescing window.
    pub fn backend_debounce(&self) -> Duration {
        Duration::from_millis(self.backend_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = WatcherConfig::new("/rules");
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.delete_grace(), Duration::from_millis(500));
        assert_eq!(config.extension, "tsv");

        let config = config
            .with_extension(".map")
            .with_debounce(Duration::from_millis(20))
            .with_delete_grace(Duration::from_millis(5));
        assert_eq!(config.extension, "map");
        assert_eq!(config.debounce_ms, 20);
        assert_eq!(config.delete_grace_ms, 5);
    }
}

//! Per-path leading-edge debouncing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::trace;

/// Drops events for a path that arrive within `window` of the last
/// processed event for the same path.
#[derive(Debug)]
pub struct PathDebouncer {
    window: Duration,
    last_processed: HashMap<PathBuf, Instant>,
}

impl PathDebouncer {
    /// Create a debouncer with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_processed: HashMap::new(),
        }
    }

    /// Record an event at `now`; returns whether it should be processed.
    pub fn should_process(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_processed.get(path) {
            if now.saturating_duration_since(*last) < self.window {
                trace!("Debounced event for {}", path.display());
                return false;
            }
        }
        self.last_processed.insert(path.to_path_buf(), now);
        true
    }

    /// Forget a path, so its next event is processed immediately.
    pub fn forget(&mut self, path: &Path) {
        self.last_processed.remove(path);
    }

    /// Drop entries older than the window.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.last_processed
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.last_processed.len()
    }

    /// Whether no path is tracked.
    pub fn is_empty(&self) -> bool {
        self.last_processed.is_empty()
    }
}

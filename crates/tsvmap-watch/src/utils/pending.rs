//! Cancellable delete timers keyed by rule set name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A grace timer that ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDelete {
    /// Rule set name
    pub name: String,
    /// Deleted file
    pub path: PathBuf,
    /// Generation of the timer that fired
    pub generation: u64,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Deletes waiting out their grace delay.
///
/// Each scheduled delete owns a timer task that posts a [`DueDelete`] when
/// it expires. The generation number lets the consumer ignore a timer that
/// was replaced or cancelled after it had already fired.
pub struct PendingDeletes {
    grace: Duration,
    due_tx: mpsc::UnboundedSender<DueDelete>,
    timers: HashMap<String, Timer>,
    next_generation: u64,
    count: Arc<AtomicUsize>,
}

impl PendingDeletes {
    /// Create an empty set whose timers report on `due_tx`.
    pub fn new(grace: Duration, due_tx: mpsc::UnboundedSender<DueDelete>) -> Self {
        Self {
            grace,
            due_tx,
            timers: HashMap::new(),
            next_generation: 0,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter mirroring [`len`](Self::len), for status reporting.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }

    /// Start (or restart) the grace timer for `name`, deleted at `path`.
    /// Must run inside a tokio runtime.
    pub fn schedule(&mut self, name: &str, path: &Path) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;

        let grace = self.grace;
        let due_tx = self.due_tx.clone();
        let due = DueDelete {
            name: name.to_string(),
            path: path.to_path_buf(),
            generation,
        };
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            // the receiver is gone once the watcher stopped
            let _ = due_tx.send(due);
        });

        if let Some(previous) = self.timers.insert(name.to_string(), Timer { generation, handle }) {
            previous.handle.abort();
        }
        debug!(rule_set = name, generation, "Delete pending");
        self.sync_count();
        generation
    }

    /// Cancel the pending delete for `name`; returns whether one existed.
    pub fn cancel(&mut self, name: &str) -> bool {
        let cancelled = match self.timers.remove(name) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        };
        self.sync_count();
        cancelled
    }

    /// Claim an expired timer; `false` if it was cancelled or superseded.
    pub fn take_due(&mut self, due: &DueDelete) -> bool {
        let current = self
            .timers
            .get(&due.name)
            .map(|timer| timer.generation == due.generation)
            .unwrap_or(false);
        if current {
            self.timers.remove(&due.name);
            self.sync_count();
        }
        current
    }

    /// Number of pending deletes.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Abort every timer.
    pub fn clear(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.handle.abort();
        }
        self.sync_count();
    }

    fn sync_count(&self) {
        self.count.store(self.timers.len(), Ordering::Relaxed);
    }
}

impl Drop for PendingDeletes {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for PendingDeletes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDeletes")
            .field("grace", &self.grace)
            .field("pending", &self.timers.keys().collect::<Vec<_>>())
            .finish()
    }
}

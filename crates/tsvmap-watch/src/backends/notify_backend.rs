//! Notify-based file watching backend.

use crate::{
    error::{Error, Result},
    events::{FileEvent, FileEventKind},
};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, DebounceEventResult, Debouncer, RecommendedCache,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Debounced notify watcher on a single directory.
///
/// Owns the notification thread; events are forwarded to an unbounded
/// channel as [`FileEvent`]s.
pub struct NotifyBackend {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    path: PathBuf,
}

impl NotifyBackend {
    /// Watch `path` non-recursively, coalescing raw events over `debounce`.
    pub fn start(
        path: &Path,
        debounce: Duration,
        sender: mpsc::UnboundedSender<FileEvent>,
    ) -> Result<Self> {
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        for file_event in Self::convert_notify_event(&event.event) {
                            if let Err(e) = sender.send(file_event) {
                                // reconciler already gone; the backend is being stopped
                                debug!("Dropping file event: {}", e);
                            }
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        error!("Notify error: {:?}", error);
                    }
                }
            }
        })
        .map_err(|e| Error::Watch(format!("Failed to create notify watcher: {}", e)))?;

        debouncer
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("Failed to watch {}: {}", path.display(), e)))?;

        info!("Notify watcher started on {}", path.display());
        Ok(Self {
            debouncer,
            path: path.to_path_buf(),
        })
    }

    /// Watched directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unregister the watch and join the notification thread.
    pub fn stop(self) {
        let path = self.path;
        self.debouncer.stop();
        info!("Notify watcher stopped on {}", path.display());
    }

    /// Convert a notify event into zero or more file events.
    pub(crate) fn convert_notify_event(event: &Event) -> Vec<FileEvent> {
        let per_path = |kind: FileEventKind| -> Vec<FileEvent> {
            event
                .paths
                .iter()
                .map(|p| FileEvent::new(kind, p.clone()))
                .collect()
        };
        let by_existence = || -> Vec<FileEvent> {
            event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        FileEventKind::Modified
                    } else {
                        FileEventKind::Deleted
                    };
                    FileEvent::new(kind, p.clone())
                })
                .collect()
        };

        match event.kind {
            EventKind::Create(_) => per_path(FileEventKind::Created),
            EventKind::Remove(_) => per_path(FileEventKind::Deleted),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
                [from, to, ..] => vec![
                    FileEvent::new(FileEventKind::Deleted, from.clone()),
                    FileEvent::new(FileEventKind::Created, to.clone()),
                ],
                _ => by_existence(),
            },
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                per_path(FileEventKind::Deleted)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => per_path(FileEventKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) | EventKind::Any => by_existence(),
            EventKind::Modify(_) => per_path(FileEventKind::Modified),
            EventKind::Access(_) | EventKind::Other => Vec::new(),
        }
    }
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("path", &self.path)
            .finish()
    }
}

//! File event types delivered by the backend to the reconciler.

use std::path::PathBuf;

/// Represents a file system event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Kind of file event.
    pub kind: FileEventKind,

    /// Path to the file or directory.
    pub path: PathBuf,

    /// Whether this is a directory.
    pub is_dir: bool,
}

impl FileEvent {
    /// Create a new file event.
    pub fn new(kind: FileEventKind, path: PathBuf) -> Self {
        let is_dir = path.is_dir();
        Self { kind, path, is_dir }
    }

    /// Shorthand for a created event.
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Created, path.into())
    }

    /// Shorthand for a modified event.
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Modified, path.into())
    }

    /// Shorthand for a deleted event.
    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(FileEventKind::Deleted, path.into())
    }
}

/// Kinds of file events the reconciler acts on.
///
/// Renames arrive as a `Deleted` for the old path followed by a `Created`
/// for the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was deleted.
    Deleted,
}

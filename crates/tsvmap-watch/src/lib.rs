//! # tsvmap rule file watcher
//!
//! Watches a directory of rule files and forwards changes to a
//! [`RuleFileHandler`]:
//!
//! ```text
//! notify thread ──▶ NotifyBackend ──(mpsc)──▶ reconciler task ──▶ handler
//!                                                  │   ▲
//!                                                  ▼   │ due deletes
//!                                              PendingDeletes timers
//! ```
//!
//! - create/modify: debounced per path, then `on_changed(path)`
//! - delete: held for a grace delay, then `on_deleted(path)` unless a file
//!   with the same rule set name reappeared in the meantime
//!
//! Callbacks run one at a time on the blocking pool; their errors are logged
//! and never stop the watcher.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod backends;
pub mod config;
pub mod error;
mod events;
pub mod traits;
mod utils;
mod watcher;

pub use backends::NotifyBackend;
pub use config::WatcherConfig;
pub use error::{Error, Result};
pub use events::{FileEvent, FileEventKind};
pub use traits::{FnHandler, RuleFileHandler};
pub use utils::{DueDelete, PathDebouncer, PendingDeletes};
pub use watcher::{RuleFileWatcher, WatcherState, WatcherStatus};

//! Callback seam between the watcher and whatever applies changes.

use crate::error::Result;
use std::path::Path;

/// Receives rule file changes from the watcher.
///
/// Calls are made from the blocking thread pool, one at a time, so
/// implementations may do synchronous store work. Errors are logged by the
/// watcher and never stop it.
pub trait RuleFileHandler: Send + Sync + 'static {
    /// A rule file was created or modified.
    fn on_changed(&self, path: &Path) -> Result<()>;

    /// The rule file at `path` is gone for good.
    ///
    /// Another file with the same stem may still own the rule set;
    /// implementations only remove what `path` sourced.
    fn on_deleted(&self, path: &Path) -> Result<()>;
}

/// Adapts two closures into a [`RuleFileHandler`].
pub struct FnHandler<C, D> {
    on_changed: C,
    on_deleted: D,
}

impl<C, D> FnHandler<C, D>
where
    C: Fn(&Path) -> Result<()> + Send + Sync + 'static,
    D: Fn(&Path) -> Result<()> + Send + Sync + 'static,
{
    /// Create a handler from a change callback and a delete callback.
    pub fn new(on_changed: C, on_deleted: D) -> Self {
        Self {
            on_changed,
            on_deleted,
        }
    }
}

impl<C, D> RuleFileHandler for FnHandler<C, D>
where
    C: Fn(&Path) -> Result<()> + Send + Sync + 'static,
    D: Fn(&Path) -> Result<()> + Send + Sync + 'static,
{
    fn on_changed(&self, path: &Path) -> Result<()> {
        (self.on_changed)(path)
    }

    fn on_deleted(&self, path: &Path) -> Result<()> {
        (self.on_deleted)(path)
    }
}

impl<C, D> std::fmt::Debug for FnHandler<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHandler(<functions>)")
    }
}

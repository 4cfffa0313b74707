//! Bookkeeping used by the reconciler.

mod debounce;
mod pending;

pub use debounce::PathDebouncer;
pub use pending::{DueDelete, PendingDeletes};

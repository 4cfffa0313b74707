//! # tsvmap core
//!
//! Keeps a SQLite rule store synchronized with a directory of tab-separated
//! rule files and answers exact-match conversion lookups against it.
//!
//! - [`hashing`] fingerprints raw file bytes so unchanged files are skipped
//! - [`rule_file`] parses and validates `source<TAB>target` files
//! - [`diff`] plans inserts/updates/deletes against the stored rows
//! - [`SyncService`] applies plans, one transaction per file
//! - [`ConversionService`] performs lookups and records usage
//!
//! Both services fold per-file and per-lookup failures into outcome values
//! ([`SyncOutcome`], [`ConversionOutcome`]); only setup problems surface as
//! [`CoreError`].

pub mod convert;
pub mod diff;
pub mod error;
pub mod hashing;
pub mod outcome;
pub mod rule_file;
pub mod sync;

pub use convert::ConversionService;
pub use diff::ReconcilePlan;
pub use error::{CoreError, CoreResult};
pub use outcome::{
    ConversionOutcome, OutcomeStatus, RuleSetInfo, SyncOperation, SyncOutcome, SyncSummary,
};
pub use rule_file::{FormatError, RuleEntry, RuleFile};
pub use sync::{SyncOptions, SyncService};

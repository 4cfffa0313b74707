//! SQLite rule store for tsvmap
//!
//! Persists rule sets and their conversion rules. The store is a derived
//! cache of the rule files on disk: rows are only written by the sync
//! engine, and usage counters by the conversion service.
//!
//! ## Features
//!
//! - **Cascade delete**: removing a rule set removes all of its rules
//! - **Exact-match index**: `UNIQUE(rule_set_id, source_text)` backs lookups
//! - **WAL Mode**: readers are not blocked by the single writer
//! - **Thread Safety**: Arc<Mutex<Connection>> pattern for concurrent access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tsvmap_store::{rule_sets, SqliteConfig, SqlitePool};
//!
//! let pool = SqlitePool::new(SqliteConfig::new("./tsvmap.db"))?;
//! let names = pool.with_connection(|conn| rule_sets::list_names(conn))?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod rule_sets;
pub mod rules;
pub mod schema;

// Re-exports
pub use config::SqliteConfig;
pub use connection::{DbStats, SqlitePool};
pub use error::{SqliteError, SqliteResult};
pub use rule_sets::{NewRuleSet, RuleSetRecord};
pub use rules::{RuleRecord, StoredRule, MAX_SOURCE_CHARS, MAX_TARGET_CHARS};

/// Connection handle passed to the query helpers
pub use rusqlite::Connection;

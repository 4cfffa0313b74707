//! SQLite connection management
//!
//! Uses a simple Arc<Mutex<Connection>> pattern. Every logical operation
//! holds the guard for its whole duration, so two writers to the same rule
//! set are serialized in-process; the guard is released when the closure
//! returns, on success and error alike.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
///
/// For SQLite in WAL mode, we can have multiple readers but only one writer.
/// This simple wrapper uses a mutex for thread safety.
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.config.path)
            .finish()
    }
}

impl SqlitePool {
    /// Open the database described by `config` and apply the schema
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening SQLite rule store");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        SqliteError::Connection(format!("Failed to create directory: {}", e))
                    })?;
                }
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };

        pool.initialize()?;

        Ok(pool)
    }

    /// Create an in-memory store for testing
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    /// The configuration this store was opened with
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside an immediate write transaction.
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls it back.
    pub fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<SqliteError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(SqliteError::from)?;
        Ok(value)
    }

    /// Cheap reachability check
    pub fn ping(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM rule_sets", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(())
        })
    }

    /// Initialize the database (configure pragmas and apply schema)
    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;

            info!("SQLite rule store initialized");
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.wal_mode && !self.config.is_memory() {
            // journal_mode returns the resulting mode as a row
            let _mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        conn.busy_timeout(std::time::Duration::from_millis(
            self.config.busy_timeout_ms as u64,
        ))?;

        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> SqliteResult<DbStats> {
        self.with_connection(|conn| {
            let rule_sets: i64 =
                conn.query_row("SELECT COUNT(*) FROM rule_sets", [], |row| row.get(0))?;
            let rules: i64 =
                conn.query_row("SELECT COUNT(*) FROM conversion_rules", [], |row| row.get(0))?;

            Ok(DbStats {
                rule_sets: rule_sets as u64,
                rules: rules as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub rule_sets: u64,
    pub rules: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_pool() {
        let pool = SqlitePool::memory().expect("Failed to create memory pool");

        pool.with_connection(|conn| {
            let result: i64 = conn.query_row("SELECT 1 + 1", [], |row| row.get(0))?;
            assert_eq!(result, 2);
            Ok(())
        })
        .expect("Query failed");
    }

    #[test]
    fn test_file_pool_uses_wal() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("rules.db");

        let pool = SqlitePool::new(SqliteConfig::new(&db_path)).expect("Failed to create pool");
        assert!(db_path.exists());

        pool.with_connection(|conn| {
            let mode: String = conn.query_row("PRAGMA journal_mode;", [], |row| row.get(0))?;
            assert_eq!(mode.to_lowercase(), "wal");
            Ok(())
        })
        .expect("Query failed");
    }

    #[test]
    fn test_ping_and_stats() {
        let pool = SqlitePool::memory().unwrap();
        pool.ping().expect("ping should succeed");

        let stats = pool.stats().unwrap();
        assert_eq!(stats.rule_sets, 0);
        assert_eq!(stats.rules, 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let pool = SqlitePool::memory().unwrap();

        let result: SqliteResult<()> = pool.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO rule_sets (name, file_path, file_hash, rule_count, created_at, updated_at)
                 VALUES ('a', '/a.tsv', 'h', 0, 'now', 'now')",
                [],
            )?;
            Err(SqliteError::Corrupt("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = pool
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM rule_sets", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}

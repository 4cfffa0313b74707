//! Row access for the `conversion_rules` table

use crate::error::SqliteResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// Maximum length of a lookup key, in characters
pub const MAX_SOURCE_CHARS: usize = 1000;
/// Maximum length of a replacement, in characters
pub const MAX_TARGET_CHARS: usize = 4000;

/// The parts of a stored rule the diff needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRule {
    pub id: i64,
    pub target_text: String,
}

/// A rule row as returned by lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub id: i64,
    pub rule_set_id: i64,
    pub source_text: String,
    pub target_text: String,
    pub usage_count: u64,
    pub tsv_file_name: String,
}

/// All rules of a rule set keyed by source text
pub fn load_rule_map(conn: &Connection, rule_set_id: i64) -> SqliteResult<HashMap<String, StoredRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_text, target_text FROM conversion_rules WHERE rule_set_id = ?1",
    )?;
    let rows = stmt.query_map([rule_set_id], |row| {
        Ok((
            row.get::<_, String>(1)?,
            StoredRule {
                id: row.get(0)?,
                target_text: row.get(2)?,
            },
        ))
    })?;

    let mut map = HashMap::new();
    for row in rows {
        let (source, rule) = row?;
        map.insert(source, rule);
    }
    Ok(map)
}

/// Insert one rule
pub fn insert(
    conn: &Connection,
    rule_set_id: i64,
    source_text: &str,
    target_text: &str,
    tsv_file_name: &str,
    now: DateTime<Utc>,
) -> SqliteResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO conversion_rules
             (rule_set_id, source_text, target_text, usage_count, tsv_file_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
    )?;
    stmt.execute(params![
        rule_set_id,
        source_text,
        target_text,
        tsv_file_name,
        now.to_rfc3339()
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Replace the target of an existing rule; usage is preserved
pub fn update_target(
    conn: &Connection,
    id: i64,
    target_text: &str,
    tsv_file_name: &str,
    now: DateTime<Utc>,
) -> SqliteResult<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE conversion_rules SET target_text = ?2, tsv_file_name = ?3, updated_at = ?4
         WHERE id = ?1",
    )?;
    stmt.execute(params![id, target_text, tsv_file_name, now.to_rfc3339()])?;
    Ok(())
}

/// Delete one rule
pub fn delete(conn: &Connection, id: i64) -> SqliteResult<()> {
    let mut stmt = conn.prepare_cached("DELETE FROM conversion_rules WHERE id = ?1")?;
    stmt.execute([id])?;
    Ok(())
}

/// Number of rules owned by a rule set
pub fn count(conn: &Connection, rule_set_id: i64) -> SqliteResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversion_rules WHERE rule_set_id = ?1",
        [rule_set_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Exact-match lookup through the (rule_set_id, source_text) unique index
pub fn lookup(
    conn: &Connection,
    rule_set_id: i64,
    source_text: &str,
) -> SqliteResult<Option<RuleRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, rule_set_id, source_text, target_text, usage_count, tsv_file_name
         FROM conversion_rules
         WHERE rule_set_id = ?1 AND source_text = ?2",
    )?;
    let record = stmt
        .query_row(params![rule_set_id, source_text], |row| {
            Ok(RuleRecord {
                id: row.get(0)?,
                rule_set_id: row.get(1)?,
                source_text: row.get(2)?,
                target_text: row.get(3)?,
                usage_count: row.get::<_, i64>(4)?.max(0) as u64,
                tsv_file_name: row.get(5)?,
            })
        })
        .optional()?;
    Ok(record)
}

/// Bump the usage counter of one rule.
///
/// Returns `false` when the rule vanished (e.g. removed by a concurrent
/// resync), which callers treat as a lost increment.
pub fn increment_usage(conn: &Connection, id: i64) -> SqliteResult<bool> {
    let mut stmt = conn.prepare_cached(
        "UPDATE conversion_rules SET usage_count = usage_count + 1 WHERE id = ?1",
    )?;
    Ok(stmt.execute([id])? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlitePool;
    use crate::rule_sets::{self, NewRuleSet};
    use std::path::Path;

    fn pool_with_set() -> (SqlitePool, i64) {
        let pool = SqlitePool::memory().unwrap();
        let id = pool
            .with_connection(|conn| {
                rule_sets::insert(
                    conn,
                    &NewRuleSet {
                        name: "greetings",
                        file_path: Path::new("/rules/greetings.tsv"),
                        file_hash: "abc",
                        description: None,
                        rule_count: 0,
                    },
                    Utc::now(),
                )
            })
            .unwrap();
        (pool, id)
    }

    #[test]
    fn test_insert_lookup_and_usage() {
        let (pool, set_id) = pool_with_set();
        pool.with_connection(|conn| {
            let id = insert(conn, set_id, "hello", "hi", "greetings.tsv", Utc::now())?;

            let found = lookup(conn, set_id, "hello")?.expect("rule should exist");
            assert_eq!(found.id, id);
            assert_eq!(found.target_text, "hi");
            assert_eq!(found.usage_count, 0);

            assert!(increment_usage(conn, id)?);
            assert!(increment_usage(conn, id)?);
            assert_eq!(lookup(conn, set_id, "hello")?.unwrap().usage_count, 2);
            assert_eq!(rule_sets::total_usage(conn, set_id)?, 2);

            assert_eq!(lookup(conn, set_id, "Hello")?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_delete_and_map() {
        let (pool, set_id) = pool_with_set();
        pool.with_connection(|conn| {
            let a = insert(conn, set_id, "a", "1", "greetings.tsv", Utc::now())?;
            let b = insert(conn, set_id, "b", "2", "greetings.tsv", Utc::now())?;

            update_target(conn, a, "one", "greetings.tsv", Utc::now())?;
            delete(conn, b)?;

            let map = load_rule_map(conn, set_id)?;
            assert_eq!(map.len(), 1);
            assert_eq!(map["a"].target_text, "one");
            assert_eq!(count(conn, set_id)?, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_increment_missing_rule_is_not_an_error() {
        let (pool, _) = pool_with_set();
        let bumped = pool
            .with_connection(|conn| increment_usage(conn, 9999))
            .unwrap();
        assert!(!bumped);
    }

    #[test]
    fn test_overlong_source_is_rejected_by_schema() {
        let (pool, set_id) = pool_with_set();
        let long = "x".repeat(MAX_SOURCE_CHARS + 1);
        let err = pool
            .with_connection(|conn| insert(conn, set_id, &long, "y", "greetings.tsv", Utc::now()))
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }
}

//! Row access for the `rule_sets` table

use crate::error::{SqliteError, SqliteResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A stored rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetRecord {
    pub id: i64,
    pub name: String,
    pub file_path: PathBuf,
    pub file_hash: String,
    pub description: Option<String>,
    pub rule_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for inserting a rule set
#[derive(Debug, Clone)]
pub struct NewRuleSet<'a> {
    pub name: &'a str,
    pub file_path: &'a Path,
    pub file_hash: &'a str,
    pub description: Option<&'a str>,
    pub rule_count: u64,
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, file_path, file_hash, description, rule_count, created_at, updated_at
     FROM rule_sets";

/// Look up a rule set by its unique name
pub fn find_by_name(conn: &Connection, name: &str) -> SqliteResult<Option<RuleSetRecord>> {
    let sql = format!("{} WHERE name = ?1", SELECT_COLUMNS);
    let row = conn
        .query_row(&sql, [name], row_to_raw)
        .optional()?;
    row.map(RawRuleSet::into_record).transpose()
}

/// All rule sets ordered by name
pub fn list(conn: &Connection) -> SqliteResult<Vec<RuleSetRecord>> {
    let sql = format!("{} ORDER BY name", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_raw)?;

    let mut records = Vec::new();
    for raw in rows {
        records.push(raw?.into_record()?);
    }
    Ok(records)
}

/// All rule set names ordered lexicographically
pub fn list_names(conn: &Connection) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM rule_sets ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Insert a rule set and return its id
pub fn insert(conn: &Connection, new: &NewRuleSet<'_>, now: DateTime<Utc>) -> SqliteResult<i64> {
    let now = now.to_rfc3339();
    conn.execute(
        "INSERT INTO rule_sets (name, file_path, file_hash, description, rule_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            new.name,
            path_to_str(new.file_path)?,
            new.file_hash,
            new.description,
            new.rule_count as i64,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(rule_set = new.name, id, "Inserted rule set");
    Ok(id)
}

/// Record the result of a resync: new hash, path and cached rule count
pub fn update_sync_state(
    conn: &Connection,
    id: i64,
    file_path: &Path,
    file_hash: &str,
    rule_count: u64,
    now: DateTime<Utc>,
) -> SqliteResult<()> {
    let affected = conn.execute(
        "UPDATE rule_sets
         SET file_path = ?2, file_hash = ?3, rule_count = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            id,
            path_to_str(file_path)?,
            file_hash,
            rule_count as i64,
            now.to_rfc3339()
        ],
    )?;

    if affected == 0 {
        return Err(SqliteError::NotFound(format!("rule set {}", id)));
    }
    Ok(())
}

/// Delete a rule set by name; its rules go with it via ON DELETE CASCADE.
///
/// Returns the number of rules that were owned by the deleted set, or
/// `None` if no such rule set existed.
pub fn delete_by_name(conn: &Connection, name: &str) -> SqliteResult<Option<u64>> {
    let Some(record) = find_by_name(conn, name)? else {
        return Ok(None);
    };

    let owned: i64 = conn.query_row(
        "SELECT COUNT(*) FROM conversion_rules WHERE rule_set_id = ?1",
        [record.id],
        |row| row.get(0),
    )?;
    conn.execute("DELETE FROM rule_sets WHERE id = ?1", [record.id])?;
    debug!(rule_set = name, rules = owned, "Deleted rule set");

    Ok(Some(owned as u64))
}

/// Total usage across all rules of a rule set
pub fn total_usage(conn: &Connection, id: i64) -> SqliteResult<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(usage_count), 0) FROM conversion_rules WHERE rule_set_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

fn path_to_str(path: &Path) -> SqliteResult<&str> {
    path.to_str()
        .ok_or_else(|| SqliteError::Corrupt(format!("non UTF-8 path: {}", path.display())))
}

/// Row as stored, before timestamp decoding
struct RawRuleSet {
    id: i64,
    name: String,
    file_path: String,
    file_hash: String,
    description: Option<String>,
    rule_count: i64,
    created_at: String,
    updated_at: String,
}

impl RawRuleSet {
    fn into_record(self) -> SqliteResult<RuleSetRecord> {
        Ok(RuleSetRecord {
            id: self.id,
            name: self.name,
            file_path: PathBuf::from(self.file_path),
            file_hash: self.file_hash,
            description: self.description,
            rule_count: self.rule_count.max(0) as u64,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRuleSet> {
    Ok(RawRuleSet {
        id: row.get(0)?,
        name: row.get(1)?,
        file_path: row.get(2)?,
        file_hash: row.get(3)?,
        description: row.get(4)?,
        rule_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn parse_timestamp(value: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqliteError::Corrupt(format!("bad timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SqlitePool;

    fn insert_named(pool: &SqlitePool, name: &str) -> i64 {
        let path = PathBuf::from(format!("/rules/{}.tsv", name));
        pool.with_connection(|conn| {
            insert(
                conn,
                &NewRuleSet {
                    name,
                    file_path: &path,
                    file_hash: "abc",
                    description: None,
                    rule_count: 0,
                },
                Utc::now(),
            )
        })
        .unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        let pool = SqlitePool::memory().unwrap();
        let id = insert_named(&pool, "greetings");

        let by_name = pool
            .with_connection(|conn| find_by_name(conn, "greetings"))
            .unwrap()
            .expect("rule set should exist");
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.file_path, PathBuf::from("/rules/greetings.tsv"));
        assert_eq!(by_name.file_hash, "abc");
    }

    #[test]
    fn test_names_are_unique() {
        let pool = SqlitePool::memory().unwrap();
        insert_named(&pool, "greetings");

        let other_path = PathBuf::from("/elsewhere/greetings.tsv");
        let err = pool
            .with_connection(|conn| {
                insert(
                    conn,
                    &NewRuleSet {
                        name: "greetings",
                        file_path: &other_path,
                        file_hash: "def",
                        description: None,
                        rule_count: 0,
                    },
                    Utc::now(),
                )
            })
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_list_names_sorted() {
        let pool = SqlitePool::memory().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            insert_named(&pool, name);
        }
        let names = pool.with_connection(|conn| list_names(conn)).unwrap();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_delete_missing_returns_none() {
        let pool = SqlitePool::memory().unwrap();
        let deleted = pool
            .with_connection(|conn| delete_by_name(conn, "nope"))
            .unwrap();
        assert_eq!(deleted, None);
    }
}

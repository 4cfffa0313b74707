//! Exact-match conversion lookups

use crate::error::CoreResult;
use crate::outcome::{ConversionOutcome, RuleSetInfo};
use tracing::{debug, warn};
use tsvmap_store::{rule_sets, rules, RuleSetRecord, SqlitePool, SqliteResult};

/// Answers conversion requests against the rule store
#[derive(Debug, Clone)]
pub struct ConversionService {
    pool: SqlitePool,
}

impl ConversionService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert `text` using the rule set `rule_set_name`.
    ///
    /// The whole input is the lookup key. A miss returns the input unchanged
    /// with `rules_applied = 0`; it is not an error.
    pub fn convert_text(&self, text: &str, rule_set_name: &str) -> ConversionOutcome {
        if text.trim().is_empty() {
            return ConversionOutcome::warning(text, "Empty input, nothing to convert");
        }

        let lookup = self.pool.with_connection(|conn| {
            let Some(set) = rule_sets::find_by_name(conn, rule_set_name)? else {
                return Ok(None);
            };
            Ok(Some(rules::lookup(conn, set.id, text)?))
        });

        match lookup {
            Ok(None) => {
                debug!(rule_set = rule_set_name, "Conversion against unknown rule set");
                ConversionOutcome::error(text, format!("Rule set '{}' not found", rule_set_name))
            }
            Ok(Some(None)) => ConversionOutcome::converted(text, text.to_string(), 0),
            Ok(Some(Some(rule))) => {
                self.record_usage(rule.id, rule_set_name);
                ConversionOutcome::converted(text, rule.target_text, 1)
            }
            Err(err) => {
                warn!(rule_set = rule_set_name, "Conversion lookup failed: {}", err);
                ConversionOutcome::error(text, format!("Database error: {}", err))
            }
        }
    }

    /// Bump a rule's usage counter. Failures are logged and otherwise ignored.
    fn record_usage(&self, rule_id: i64, rule_set_name: &str) {
        match self
            .pool
            .with_connection(|conn| rules::increment_usage(conn, rule_id))
        {
            Ok(true) => {}
            Ok(false) => debug!(
                rule_set = rule_set_name,
                rule_id, "Rule removed before usage could be recorded"
            ),
            Err(err) => warn!(
                rule_set = rule_set_name,
                rule_id, "Failed to record rule usage: {}", err
            ),
        }
    }

    /// Names of all rule sets, sorted
    pub fn list_rule_sets(&self) -> CoreResult<Vec<String>> {
        Ok(self.pool.with_connection(|conn| rule_sets::list_names(conn))?)
    }

    /// Descriptive record for one rule set, `None` when it does not exist
    pub fn get_rule_set_info(&self, name: &str) -> CoreResult<Option<RuleSetInfo>> {
        let info = self.pool.with_connection(|conn| {
            let Some(record) = rule_sets::find_by_name(conn, name)? else {
                return Ok(None);
            };
            let total_usage = rule_sets::total_usage(conn, record.id)?;
            Ok(Some(to_info(record, total_usage)))
        })?;
        Ok(info)
    }

    /// Records for every rule set, in name order
    pub fn list_rule_set_infos(&self) -> CoreResult<Vec<RuleSetInfo>> {
        let infos = self.pool.with_connection(|conn| {
            rule_sets::list(conn)?
                .into_iter()
                .map(|record| -> SqliteResult<RuleSetInfo> {
                    let total_usage = rule_sets::total_usage(conn, record.id)?;
                    Ok(to_info(record, total_usage))
                })
                .collect()
        })?;
        Ok(infos)
    }

    pub fn health_check(&self) -> bool {
        match self.pool.ping() {
            Ok(()) => true,
            Err(err) => {
                warn!("Conversion service health check failed: {}", err);
                false
            }
        }
    }
}

fn to_info(record: RuleSetRecord, total_usage: u64) -> RuleSetInfo {
    RuleSetInfo {
        name: record.name,
        file_path: record.file_path,
        file_hash: record.file_hash,
        description: record.description,
        rule_count: record.rule_count,
        total_usage,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;
    use tsvmap_store::NewRuleSet;

    fn seeded() -> ConversionService {
        let pool = SqlitePool::memory().unwrap();
        pool.with_connection(|conn| {
            let id = rule_sets::insert(
                conn,
                &NewRuleSet {
                    name: "greetings",
                    file_path: Path::new("/rules/greetings.tsv"),
                    file_hash: "abc",
                    description: Some("salutations"),
                    rule_count: 2,
                },
                Utc::now(),
            )?;
            rules::insert(conn, id, "hello", "hi", "greetings.tsv", Utc::now())?;
            rules::insert(conn, id, "bye", "later", "greetings.tsv", Utc::now())?;
            Ok(())
        })
        .unwrap();
        ConversionService::new(pool)
    }

    #[test]
    fn test_hit_applies_one_rule() {
        let service = seeded();
        let outcome = service.convert_text("hello", "greetings");
        assert!(outcome.is_success());
        assert_eq!(outcome.converted_text.as_deref(), Some("hi"));
        assert_eq!(outcome.rules_applied, 1);
    }

    #[test]
    fn test_miss_returns_input_unchanged() {
        let outcome = seeded().convert_text("zzz", "greetings");
        assert!(outcome.is_success());
        assert_eq!(outcome.converted_text.as_deref(), Some("zzz"));
        assert_eq!(outcome.rules_applied, 0);
    }

    #[test]
    fn test_lookup_is_exact() {
        let outcome = seeded().convert_text("hello ", "greetings");
        assert_eq!(outcome.rules_applied, 0);
        assert_eq!(outcome.text(), "hello ");
    }

    #[test]
    fn test_unknown_rule_set_is_error() {
        let outcome = seeded().convert_text("hello", "missing");
        assert!(outcome.is_error());
        assert_eq!(outcome.converted_text, None);
        assert!(outcome.error_message.unwrap().contains("not found"));
    }

    #[test]
    fn test_blank_input_warns_without_lookup() {
        let outcome = seeded().convert_text("   ", "missing");
        assert_eq!(outcome.status, crate::outcome::OutcomeStatus::Warning);
        assert_eq!(outcome.converted_text.as_deref(), Some("   "));
    }

    #[test]
    fn test_usage_is_summed_in_info() {
        let service = seeded();
        service.convert_text("hello", "greetings");
        service.convert_text("hello", "greetings");
        service.convert_text("bye", "greetings");
        service.convert_text("nothing", "greetings");

        let info = service.get_rule_set_info("greetings").unwrap().unwrap();
        assert_eq!(info.total_usage, 3);
        assert_eq!(info.rule_count, 2);
        assert_eq!(info.file_hash, "abc");
        assert_eq!(info.description.as_deref(), Some("salutations"));

        assert!(service.get_rule_set_info("missing").unwrap().is_none());
    }

    #[test]
    fn test_failed_usage_write_still_converts() {
        let service = seeded();
        service
            .pool
            .with_connection(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_usage BEFORE UPDATE OF usage_count ON conversion_rules
                     BEGIN SELECT RAISE(ABORT, 'usage writes rejected'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let outcome = service.convert_text("hello", "greetings");
        assert_eq!(outcome.status, crate::outcome::OutcomeStatus::Success);
        assert_eq!(outcome.converted_text.as_deref(), Some("hi"));
        assert_eq!(outcome.rules_applied, 1);

        let info = service.get_rule_set_info("greetings").unwrap().unwrap();
        assert_eq!(info.total_usage, 0);
    }

    #[test]
    fn test_listing() {
        let service = seeded();
        assert_eq!(service.list_rule_sets().unwrap(), vec!["greetings".to_string()]);
        assert_eq!(service.list_rule_set_infos().unwrap().len(), 1);
        assert!(service.health_check());
    }
}

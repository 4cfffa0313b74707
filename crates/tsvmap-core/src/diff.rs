//! Reconciliation plans between a rule file and the stored rows
//!
//! Diffing is a key-set comparison: line order never matters, and a key
//! whose target is unchanged produces no entry at all.

use crate::rule_file::RuleFile;
use serde::Serialize;
use std::collections::HashMap;
use tsvmap_store::StoredRule;

/// A rule to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedInsert {
    pub source: String,
    pub target: String,
}

/// A stored rule whose target changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpdate {
    pub id: i64,
    pub source: String,
    pub target: String,
}

/// A stored rule that no longer exists in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDelete {
    pub id: i64,
    pub source: String,
}

/// Set-difference plan; each list is sorted by source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub inserts: Vec<PlannedInsert>,
    pub updates: Vec<PlannedUpdate>,
    pub deletes: Vec<PlannedDelete>,
}

impl ReconcilePlan {
    /// Plan for a rule set that does not exist yet
    pub fn for_new(file: &RuleFile) -> Self {
        Self::compute(file, &HashMap::new())
    }

    /// Compare the file against the rows currently stored for its rule set
    pub fn compute(file: &RuleFile, stored: &HashMap<String, StoredRule>) -> Self {
        let wanted = file.as_map();
        let mut plan = Self::default();

        for (source, target) in &wanted {
            match stored.get(*source) {
                None => plan.inserts.push(PlannedInsert {
                    source: source.to_string(),
                    target: target.to_string(),
                }),
                Some(rule) if rule.target_text != *target => plan.updates.push(PlannedUpdate {
                    id: rule.id,
                    source: source.to_string(),
                    target: target.to_string(),
                }),
                Some(_) => {}
            }
        }

        for (source, rule) in stored {
            if !wanted.contains_key(source.as_str()) {
                plan.deletes.push(PlannedDelete {
                    id: rule.id,
                    source: source.clone(),
                });
            }
        }

        plan.inserts.sort_by(|a, b| a.source.cmp(&b.source));
        plan.updates.sort_by(|a, b| a.source.cmp(&b.source));
        plan.deletes.sort_by(|a, b| a.source.cmp(&b.source));
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(rows: &[(i64, &str, &str)]) -> HashMap<String, StoredRule> {
        rows.iter()
            .map(|(id, source, target)| {
                (
                    source.to_string(),
                    StoredRule {
                        id: *id,
                        target_text: target.to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_add_delete_and_untouched() {
        let current = stored(&[(1, "a", "1"), (2, "b", "2")]);
        let file = RuleFile::parse(b"a\t1\nc\t3\n").unwrap();

        let plan = ReconcilePlan::compute(&file, &current);

        assert_eq!(
            plan.inserts,
            vec![PlannedInsert {
                source: "c".to_string(),
                target: "3".to_string()
            }]
        );
        assert!(plan.updates.is_empty(), "unchanged key must not be updated");
        assert_eq!(
            plan.deletes,
            vec![PlannedDelete {
                id: 2,
                source: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_changed_target_is_an_update() {
        let current = stored(&[(7, "hello", "hi"), (8, "bye", "later")]);
        let file = RuleFile::parse(b"hello\tyo\nbye\tlater\n").unwrap();

        let plan = ReconcilePlan::compute(&file, &current);
        assert!(plan.inserts.is_empty());
        assert!(plan.deletes.is_empty());
        assert_eq!(
            plan.updates,
            vec![PlannedUpdate {
                id: 7,
                source: "hello".to_string(),
                target: "yo".to_string()
            }]
        );
    }

    #[test]
    fn test_reordered_file_yields_empty_plan() {
        let current = stored(&[(1, "a", "1"), (2, "b", "2")]);
        let file = RuleFile::parse(b"b\t2\na\t1\n").unwrap();
        assert!(ReconcilePlan::compute(&file, &current).is_empty());
    }

    #[test]
    fn test_new_rule_set_inserts_everything_sorted() {
        let file = RuleFile::parse(b"z\t26\na\t1\nm\t13\n").unwrap();
        let plan = ReconcilePlan::for_new(&file);
        let sources: Vec<_> = plan.inserts.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "m", "z"]);
        assert!(plan.updates.is_empty() && plan.deletes.is_empty());
    }

    #[test]
    fn test_emptied_file_deletes_everything() {
        let current = stored(&[(1, "a", "1"), (2, "b", "2")]);
        let plan = ReconcilePlan::compute(&RuleFile::default(), &current);
        assert_eq!(plan.deletes.len(), 2);
        assert!(plan.inserts.is_empty());
    }
}

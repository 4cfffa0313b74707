//! Structured results returned by the sync and conversion services

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What a sync did (or attempted, for failed outcomes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Skip,
    Delete,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Skip => "skip",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Warning,
    Error,
}

/// Result of one sync or removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub operation: SyncOperation,
    pub status: OutcomeStatus,
    pub rule_set_name: String,
    pub file_path: Option<PathBuf>,
    pub rules_processed: u64,
    pub rules_added: u64,
    pub rules_updated: u64,
    pub rules_deleted: u64,
    pub file_hash: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl SyncOutcome {
    pub(crate) fn new(operation: SyncOperation, rule_set_name: impl Into<String>) -> Self {
        Self {
            operation,
            status: OutcomeStatus::Success,
            rule_set_name: rule_set_name.into(),
            file_path: None,
            rules_processed: 0,
            rules_added: 0,
            rules_updated: 0,
            rules_deleted: 0,
            file_hash: None,
            message: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn failed(
        operation: SyncOperation,
        rule_set_name: impl Into<String>,
        error: impl ToString,
    ) -> Self {
        Self {
            status: OutcomeStatus::Error,
            error: Some(error.to_string()),
            ..Self::new(operation, rule_set_name)
        }
    }

    pub(crate) fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub(crate) fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }

    /// Whether the store was modified
    pub fn changed_store(&self) -> bool {
        self.status == OutcomeStatus::Success && self.operation != SyncOperation::Skip
    }
}

/// Aggregate counts over a batch of outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub warnings: usize,
    pub failed: usize,
    pub rules_added: u64,
    pub rules_updated: u64,
    pub rules_deleted: u64,
}

impl SyncSummary {
    pub fn from_outcomes(outcomes: &[SyncOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Error => {
                    summary.failed += 1;
                    continue;
                }
                OutcomeStatus::Warning => summary.warnings += 1,
                OutcomeStatus::Success => {}
            }
            match outcome.operation {
                SyncOperation::Create => summary.created += 1,
                SyncOperation::Update => summary.updated += 1,
                SyncOperation::Skip => summary.skipped += 1,
                SyncOperation::Delete if outcome.status == OutcomeStatus::Success => {
                    summary.deleted += 1
                }
                SyncOperation::Delete => {}
            }
            summary.rules_added += outcome.rules_added;
            summary.rules_updated += outcome.rules_updated;
            summary.rules_deleted += outcome.rules_deleted;
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.deleted + self.warnings + self.failed
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped, {} deleted, {} failed (+{} ~{} -{} rules)",
            self.created,
            self.updated,
            self.skipped,
            self.deleted,
            self.failed,
            self.rules_added,
            self.rules_updated,
            self.rules_deleted
        )
    }
}

/// Result of one conversion lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    pub status: OutcomeStatus,
    pub original_text: String,
    pub converted_text: Option<String>,
    pub rules_applied: u32,
    pub error_message: Option<String>,
}

impl ConversionOutcome {
    pub(crate) fn converted(original: &str, converted: String, rules_applied: u32) -> Self {
        Self {
            status: OutcomeStatus::Success,
            original_text: original.to_string(),
            converted_text: Some(converted),
            rules_applied,
            error_message: None,
        }
    }

    pub(crate) fn warning(original: &str, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Warning,
            original_text: original.to_string(),
            converted_text: Some(original.to_string()),
            rules_applied: 0,
            error_message: Some(message.into()),
        }
    }

    pub(crate) fn error(original: &str, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Error,
            original_text: original.to_string(),
            converted_text: None,
            rules_applied: 0,
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == OutcomeStatus::Error
    }

    /// The text a caller should use: the replacement, or the input unchanged
    pub fn text(&self) -> &str {
        self.converted_text.as_deref().unwrap_or(&self.original_text)
    }
}

/// Descriptive record for one rule set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSetInfo {
    pub name: String,
    pub file_path: PathBuf,
    pub file_hash: String,
    pub description: Option<String>,
    pub rule_count: u64,
    pub total_usage: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut created = SyncOutcome::new(SyncOperation::Create, "a");
        created.rules_added = 3;
        let skipped = SyncOutcome::new(SyncOperation::Skip, "b");
        let failed = SyncOutcome::failed(SyncOperation::Update, "c", "boom");
        let mut missing = SyncOutcome::new(SyncOperation::Delete, "d");
        missing.status = OutcomeStatus::Warning;

        let summary = SyncSummary::from_outcomes(&[created, skipped, failed, missing]);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.rules_added, 3);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn test_outcome_serializes_lowercase() {
        let outcome = SyncOutcome::new(SyncOperation::Create, "greetings");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["operation"], "create");
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn test_conversion_text_falls_back_to_input() {
        let outcome = ConversionOutcome::error("zzz", "no such rule set");
        assert_eq!(outcome.text(), "zzz");
        assert_eq!(outcome.converted_text, None);
    }
}

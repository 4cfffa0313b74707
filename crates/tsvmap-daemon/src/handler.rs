//! Watcher callbacks backed by the sync service

use std::path::Path;
use tracing::debug;
use tsvmap_core::{SyncOutcome, SyncService};
use tsvmap_watch::{Error, RuleFileHandler};

/// Routes watcher callbacks into [`SyncService`].
///
/// Failed outcomes are reported back as handler errors so the watcher logs
/// them; warnings (e.g. removing an unknown rule set, or a delete of a file
/// that did not own its rule set) are not failures.
#[derive(Debug, Clone)]
pub struct SyncHandler {
    sync: SyncService,
}

impl SyncHandler {
    pub fn new(sync: SyncService) -> Self {
        Self { sync }
    }
}

impl RuleFileHandler for SyncHandler {
    fn on_changed(&self, path: &Path) -> tsvmap_watch::Result<()> {
        let outcome = self.sync.sync_file(path);
        debug!(
            rule_set = %outcome.rule_set_name,
            operation = %outcome.operation,
            "Watcher sync finished"
        );
        into_result(outcome)
    }

    fn on_deleted(&self, path: &Path) -> tsvmap_watch::Result<()> {
        into_result(self.sync.remove_rule_set_for_path(path))
    }
}

fn into_result(outcome: SyncOutcome) -> tsvmap_watch::Result<()> {
    if outcome.is_error() {
        let message = outcome
            .error
            .unwrap_or_else(|| format!("{} of '{}' failed", outcome.operation, outcome.rule_set_name));
        return Err(Error::Handler(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tsvmap_core::{ConversionService, SyncOptions};
    use tsvmap_store::SqlitePool;

    #[test]
    fn test_delete_of_stray_file_keeps_owner_rules() {
        let pool = SqlitePool::memory().unwrap();
        let handler = SyncHandler::new(SyncService::new(pool.clone(), SyncOptions::default()));
        let convert = ConversionService::new(pool);

        let rules = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let owner = rules.path().join("a.tsv");
        std::fs::write(&owner, "k\tv\n").unwrap();
        handler.on_changed(&owner).unwrap();

        let stray = elsewhere.path().join("a.tsv");
        std::fs::write(&stray, "k\tother\n").unwrap();
        assert!(matches!(handler.on_changed(&stray), Err(Error::Handler(_))));
        std::fs::remove_file(&stray).unwrap();

        handler.on_deleted(&stray).unwrap();
        assert_eq!(convert.convert_text("k", "a").text(), "v");

        std::fs::remove_file(&owner).unwrap();
        handler.on_deleted(&owner).unwrap();
        assert!(convert.convert_text("k", "a").is_error());
    }
}

//! Synchronization of rule files into the store
//!
//! Every file is applied in its own immediate transaction: either the rule
//! set ends up matching the file exactly (rows, hash and cached count), or
//! nothing is written. Directory syncs carry on past per-file failures.

use crate::diff::ReconcilePlan;
use crate::error::{CoreError, CoreResult};
use crate::hashing;
use crate::outcome::{OutcomeStatus, SyncOperation, SyncOutcome};
use crate::rule_file::{self, RuleFile};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tsvmap_config::{has_extension, rule_set_name};
use tsvmap_store::{rule_sets, rules, Connection, NewRuleSet, SqlitePool};

/// Options for [`SyncService`]
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Extension of rule files considered by directory syncs
    pub file_extension: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            file_extension: "tsv".to_string(),
        }
    }
}

/// Reconciles rule files with the rule store
#[derive(Debug, Clone)]
pub struct SyncService {
    pool: SqlitePool,
    options: SyncOptions,
}

impl SyncService {
    pub fn new(pool: SqlitePool, options: SyncOptions) -> Self {
        Self { pool, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Whether `path` is a rule file by extension
    pub fn is_rule_file(&self, path: &Path) -> bool {
        has_extension(path, &self.options.file_extension)
    }

    /// Bring the rule set named after `path` in line with the file.
    pub fn sync_file(&self, path: &Path) -> SyncOutcome {
        let started = Instant::now();
        let path = absolute_path(path);

        let Some(name) = rule_set_name(&path) else {
            let err = CoreError::InvalidPath(path.clone());
            warn!(path = %path.display(), "{}", err);
            return SyncOutcome::failed(SyncOperation::Skip, "", err)
                .with_path(path)
                .with_elapsed(started.elapsed());
        };

        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(source) => {
                let err = CoreError::Io {
                    path: path.clone(),
                    source,
                };
                let operation = self.attempted_operation(&name);
                warn!(rule_set = %name, "{}", err);
                return SyncOutcome::failed(operation, name, err)
                    .with_path(path)
                    .with_elapsed(started.elapsed());
            }
        };
        let file_hash = hashing::fingerprint(&data);

        let mut attempted = SyncOperation::Skip;
        let result = self.pool.with_transaction(|tx| {
            self.apply(tx, &name, &path, &data, &file_hash, &mut attempted)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_format_error() {
                    warn!(rule_set = %name, "{}", err);
                } else {
                    error!(rule_set = %name, operation = %attempted, "Sync failed: {}", err);
                }
                let mut failed = SyncOutcome::failed(attempted, name, err);
                failed.file_hash = Some(file_hash);
                failed
            }
        }
        .with_path(path)
        .with_elapsed(started.elapsed());

        if outcome.is_success() {
            match outcome.operation {
                SyncOperation::Skip => debug!(
                    rule_set = %outcome.rule_set_name,
                    "Rule file unchanged, skipping"
                ),
                _ => info!(
                    rule_set = %outcome.rule_set_name,
                    operation = %outcome.operation,
                    added = outcome.rules_added,
                    updated = outcome.rules_updated,
                    deleted = outcome.rules_deleted,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Rule set synchronized"
                ),
            }
        }
        outcome
    }

    /// Runs inside the per-file transaction; any `Err` rolls it back.
    fn apply(
        &self,
        tx: &Connection,
        name: &str,
        path: &Path,
        data: &[u8],
        file_hash: &str,
        attempted: &mut SyncOperation,
    ) -> CoreResult<SyncOutcome> {
        let existing = rule_sets::find_by_name(tx, name)?;
        let now = Utc::now();
        let tsv_file_name = rule_file::provenance(path);

        let Some(existing) = existing else {
            *attempted = SyncOperation::Create;
            let file = parse(path, data)?;
            let plan = ReconcilePlan::for_new(&file);

            let id = rule_sets::insert(
                tx,
                &NewRuleSet {
                    name,
                    file_path: path,
                    file_hash,
                    description: None,
                    rule_count: file.len() as u64,
                },
                now,
            )?;
            for insert in &plan.inserts {
                rules::insert(tx, id, &insert.source, &insert.target, &tsv_file_name, now)?;
            }

            let mut outcome = SyncOutcome::new(SyncOperation::Create, name);
            outcome.rules_processed = file.len() as u64;
            outcome.rules_added = plan.inserts.len() as u64;
            outcome.file_hash = Some(file_hash.to_string());
            return Ok(outcome);
        };

        *attempted = SyncOperation::Update;

        let rehomed = existing.file_path != path;
        if rehomed && existing.file_path.exists() {
            return Err(CoreError::Conflict {
                name: name.to_string(),
                existing: existing.file_path,
            });
        }

        if !rehomed && existing.file_hash == file_hash {
            *attempted = SyncOperation::Skip;
            let mut outcome = SyncOutcome::new(SyncOperation::Skip, name);
            outcome.file_hash = Some(file_hash.to_string());
            outcome.message = Some("File unchanged".to_string());
            return Ok(outcome);
        }

        let file = parse(path, data)?;
        let stored = rules::load_rule_map(tx, existing.id)?;
        let plan = ReconcilePlan::compute(&file, &stored);
        if plan.is_empty() {
            debug!(rule_set = name, "File changed but its rules did not");
        } else {
            debug!(
                rule_set = name,
                inserts = plan.inserts.len(),
                updates = plan.updates.len(),
                deletes = plan.deletes.len(),
                "Applying reconcile plan"
            );
        }

        for delete in &plan.deletes {
            rules::delete(tx, delete.id)?;
        }
        for update in &plan.updates {
            rules::update_target(tx, update.id, &update.target, &tsv_file_name, now)?;
        }
        for insert in &plan.inserts {
            rules::insert(tx, existing.id, &insert.source, &insert.target, &tsv_file_name, now)?;
        }

        let rule_count = rules::count(tx, existing.id)?;
        rule_sets::update_sync_state(tx, existing.id, path, file_hash, rule_count, now)?;

        let mut outcome = SyncOutcome::new(SyncOperation::Update, name);
        outcome.rules_processed = file.len() as u64;
        outcome.rules_added = plan.inserts.len() as u64;
        outcome.rules_updated = plan.updates.len() as u64;
        outcome.rules_deleted = plan.deletes.len() as u64;
        outcome.file_hash = Some(file_hash.to_string());
        if rehomed {
            warn!(
                rule_set = name,
                from = %existing.file_path.display(),
                to = %path.display(),
                "Rule set source moved"
            );
            outcome.message = Some(format!(
                "Source moved from {}",
                existing.file_path.display()
            ));
        }
        Ok(outcome)
    }

    /// Label for a sync that failed before its transaction started
    fn attempted_operation(&self, name: &str) -> SyncOperation {
        match self
            .pool
            .with_connection(|conn| rule_sets::find_by_name(conn, name))
        {
            Ok(Some(_)) => SyncOperation::Update,
            Ok(None) => SyncOperation::Create,
            Err(_) => SyncOperation::Skip,
        }
    }

    /// Sync every rule file directly inside `dir`, in file-name order.
    ///
    /// Each file gets its own transaction; a failure does not stop the batch
    /// or undo files synced before it.
    pub fn sync_directory(&self, dir: &Path) -> Vec<SyncOutcome> {
        let started = Instant::now();
        let files = match self.rule_files_in(dir) {
            Ok(files) => files,
            Err(err) => {
                error!(dir = %dir.display(), "Cannot enumerate rule directory: {}", err);
                return vec![SyncOutcome::failed(
                    SyncOperation::Skip,
                    dir.display().to_string(),
                    err,
                )
                .with_path(dir)
                .with_elapsed(started.elapsed())];
            }
        };

        info!(dir = %dir.display(), files = files.len(), "Syncing rule directory");
        files.iter().map(|path| self.sync_file(path)).collect()
    }

    /// Eligible rule files in `dir`, sorted by file name
    pub fn rule_files_in(&self, dir: &Path) -> CoreResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(CoreError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "not an existing directory",
                ),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|source| CoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && self.is_rule_file(&path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Delete a rule set and its rules.
    ///
    /// Removing a rule set that does not exist is a warning, not an error.
    pub fn remove_rule_set(&self, name: &str) -> SyncOutcome {
        let started = Instant::now();
        let result = self.pool.with_transaction(|tx| -> CoreResult<Removal> {
            Ok(match rule_sets::delete_by_name(tx, name)? {
                Some(removed) => Removal::Deleted(removed),
                None => Removal::Missing,
            })
        });
        removal_outcome(name, result).with_elapsed(started.elapsed())
    }

    /// Remove the rule set named after a deleted rule file.
    ///
    /// Only a rule set whose recorded source file is gone is removed; while
    /// that file exists it owns the name, even if `path` was a different
    /// file with the same stem.
    pub fn remove_rule_set_for_path(&self, path: &Path) -> SyncOutcome {
        let started = Instant::now();
        let path = absolute_path(path);

        let Some(name) = rule_set_name(&path) else {
            let err = CoreError::InvalidPath(path.clone());
            warn!(path = %path.display(), "{}", err);
            return SyncOutcome::failed(SyncOperation::Delete, "", err)
                .with_path(path)
                .with_elapsed(started.elapsed());
        };

        let result = self.pool.with_transaction(|tx| -> CoreResult<Removal> {
            let Some(record) = rule_sets::find_by_name(tx, &name)? else {
                return Ok(Removal::Missing);
            };
            if record.file_path.exists() {
                return Ok(Removal::Kept(record.file_path));
            }
            Ok(match rule_sets::delete_by_name(tx, &name)? {
                Some(removed) => Removal::Deleted(removed),
                None => Removal::Missing,
            })
        });

        removal_outcome(&name, result)
            .with_path(path)
            .with_elapsed(started.elapsed())
    }

    /// Remove rule sets whose source file no longer exists on disk
    pub fn prune_missing(&self) -> Vec<SyncOutcome> {
        let records = match self.pool.with_connection(|conn| rule_sets::list(conn)) {
            Ok(records) => records,
            Err(err) => {
                error!("Failed to list rule sets for pruning: {}", err);
                return vec![SyncOutcome::failed(SyncOperation::Delete, "", CoreError::from(err))];
            }
        };

        records
            .into_iter()
            .filter(|record| !record.file_path.exists())
            .map(|record| {
                info!(
                    rule_set = %record.name,
                    path = %record.file_path.display(),
                    "Source file missing, pruning rule set"
                );
                self.remove_rule_set(&record.name)
                    .with_path(record.file_path)
            })
            .collect()
    }

    /// Whether the store answers queries
    pub fn health_check(&self) -> bool {
        match self.pool.ping() {
            Ok(()) => true,
            Err(err) => {
                warn!("Sync service health check failed: {}", err);
                false
            }
        }
    }
}

fn parse(path: &Path, data: &[u8]) -> CoreResult<RuleFile> {
    RuleFile::parse(data).map_err(|error| CoreError::Format {
        path: path.to_path_buf(),
        error,
    })
}

/// Result of a removal transaction
enum Removal {
    Deleted(u64),
    Missing,
    /// Recorded source file still exists
    Kept(PathBuf),
}

fn removal_outcome(name: &str, result: CoreResult<Removal>) -> SyncOutcome {
    match result {
        Ok(Removal::Deleted(removed)) => {
            info!(rule_set = name, rules = removed, "Rule set removed");
            let mut outcome = SyncOutcome::new(SyncOperation::Delete, name);
            outcome.rules_deleted = removed;
            outcome
        }
        Ok(Removal::Missing) => {
            warn!(rule_set = name, "Rule set not found, nothing to remove");
            let mut outcome = SyncOutcome::new(SyncOperation::Delete, name);
            outcome.status = OutcomeStatus::Warning;
            outcome.message = Some(format!("Rule set '{}' not found", name));
            outcome
        }
        Ok(Removal::Kept(source)) => {
            warn!(
                rule_set = name,
                source = %source.display(),
                "Rule set still sourced from an existing file, not removed"
            );
            let mut outcome = SyncOutcome::new(SyncOperation::Delete, name);
            outcome.status = OutcomeStatus::Warning;
            outcome.message = Some(format!(
                "Rule set '{}' is sourced from {}, not removed",
                name,
                source.display()
            ));
            outcome
        }
        Err(err) => {
            error!(rule_set = name, "Failed to remove rule set: {}", err);
            SyncOutcome::failed(SyncOperation::Delete, name, err)
        }
    }
}

/// Absolute form of `path`. Symlinks are not resolved, so a linked rule
/// file is named and recorded after the link.
fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> SyncService {
        SyncService::new(SqlitePool::memory().unwrap(), SyncOptions::default())
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_create_then_skip_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "greetings.tsv", "hello\thi\nbye\tlater\n");
        let sync = service();

        let first = sync.sync_file(&path);
        assert_eq!(first.operation, SyncOperation::Create);
        assert!(first.is_success(), "{:?}", first.error);
        assert_eq!(first.rules_added, 2);
        assert_eq!(first.rule_set_name, "greetings");
        assert_eq!(first.file_hash.as_deref().map(str::len), Some(64));

        let second = sync.sync_file(&path);
        assert_eq!(second.operation, SyncOperation::Skip);
        assert!(second.is_success());
        assert!(!second.changed_store());
        assert_eq!(second.rules_added + second.rules_updated + second.rules_deleted, 0);
    }

    #[test]
    fn test_malformed_file_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.tsv", "a\t1\nb\t2\na\t3\n");
        let sync = service();

        let outcome = sync.sync_file(&path);
        assert!(outcome.is_error());
        assert_eq!(outcome.operation, SyncOperation::Create);
        assert!(outcome.error.unwrap().contains("duplicate"));

        let stats = sync.pool.stats().unwrap();
        assert_eq!(stats.rule_sets, 0);
        assert_eq!(stats.rules, 0);
    }

    #[test]
    fn test_failed_update_keeps_previous_rules() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "greetings.tsv", "hello\thi\n");
        let sync = service();
        assert!(sync.sync_file(&path).is_success());

        std::fs::write(&path, "hello\tyo\nbroken line\n").unwrap();
        let outcome = sync.sync_file(&path);
        assert!(outcome.is_error());
        assert_eq!(outcome.operation, SyncOperation::Update);

        let target = sync
            .pool
            .with_connection(|conn| {
                let set = rule_sets::find_by_name(conn, "greetings")?.unwrap();
                Ok(rules::lookup(conn, set.id, "hello")?.unwrap().target_text)
            })
            .unwrap();
        assert_eq!(target, "hi");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let outcome = service().sync_file(&dir.path().join("ghost.tsv"));
        assert!(outcome.is_error());
        assert_eq!(outcome.operation, SyncOperation::Create);
        assert_eq!(outcome.rule_set_name, "ghost");
    }

    #[test]
    fn test_remove_missing_rule_set_warns() {
        let outcome = service().remove_rule_set("nope");
        assert_eq!(outcome.operation, SyncOperation::Delete);
        assert_eq!(outcome.status, OutcomeStatus::Warning);
        assert_eq!(outcome.message.as_deref(), Some("Rule set 'nope' not found"));
    }

    #[test]
    fn test_rule_files_in_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.tsv", "x\ty\n");
        write(&dir, "a.TSV", "x\ty\n");
        write(&dir, "notes.txt", "ignored");
        std::fs::create_dir(dir.path().join("nested.tsv")).unwrap();

        let files = service().rule_files_in(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TSV", "b.tsv"]);
    }

    #[test]
    fn test_sync_missing_directory_yields_single_failure() {
        let dir = TempDir::new().unwrap();
        let outcomes = service().sync_directory(&dir.path().join("absent"));
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_error());
    }

    #[test]
    fn test_delete_of_non_owner_keeps_rule_set() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let owner = write(&dir, "a.tsv", "k\tv\n");
        let sync = service();
        assert!(sync.sync_file(&owner).is_success());

        let outcome = sync.remove_rule_set_for_path(&other.path().join("a.tsv"));
        assert_eq!(outcome.operation, SyncOperation::Delete);
        assert_eq!(outcome.status, OutcomeStatus::Warning);
        assert_eq!(outcome.rules_deleted, 0);
        assert_eq!(sync.pool.stats().unwrap().rules, 1);
    }

    #[test]
    fn test_delete_of_owner_removes_rule_set() {
        let dir = TempDir::new().unwrap();
        let owner = write(&dir, "a.tsv", "k\tv\nx\ty\n");
        let sync = service();
        assert!(sync.sync_file(&owner).is_success());

        std::fs::remove_file(&owner).unwrap();
        let outcome = sync.remove_rule_set_for_path(&owner);
        assert!(outcome.is_success());
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.rules_deleted, 2);
        assert_eq!(sync.pool.stats().unwrap().rule_sets, 0);
    }

    #[test]
    fn test_health_check() {
        assert!(service().health_check());
    }
}

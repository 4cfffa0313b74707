//! Facade over the store, both services and the watcher

use crate::error::DaemonResult;
use crate::handler::SyncHandler;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tsvmap_config::{Config, DatabaseLocation};
use tsvmap_core::{
    ConversionOutcome, ConversionService, CoreResult, RuleSetInfo, SyncOptions, SyncOutcome,
    SyncService,
};
use tsvmap_store::{SqliteConfig, SqlitePool};
use tsvmap_watch::{RuleFileWatcher, WatcherConfig, WatcherStatus};

/// Health report keys
pub mod components {
    pub const DATABASE: &str = "database";
    pub const SYNC_SERVICE: &str = "sync_service";
    pub const CONVERSION_SERVICE: &str = "conversion_service";
    pub const FILE_WATCHER: &str = "file_watcher";
}

/// Owns the rule store and everything built on it.
pub struct Engine {
    config: Config,
    pool: SqlitePool,
    sync: SyncService,
    convert: ConversionService,
    watcher: Option<RuleFileWatcher>,
}

impl Engine {
    /// Open the store named by `config.database_url` and wire the services.
    ///
    /// This is the only fallible step of startup that should abort the
    /// process.
    pub fn open(config: Config) -> DaemonResult<Self> {
        let store_config = match config.database_location()? {
            DatabaseLocation::Memory => SqliteConfig::memory(),
            DatabaseLocation::File(path) => SqliteConfig::new(path),
        };
        let pool = SqlitePool::new(store_config)?;

        let sync = SyncService::new(
            pool.clone(),
            SyncOptions {
                file_extension: config.watch.file_extension.clone(),
            },
        );
        let convert = ConversionService::new(pool.clone());

        info!(database_url = %config.database_url, "Engine ready");
        Ok(Self {
            config,
            pool,
            sync,
            convert,
            watcher: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sync_service(&self) -> &SyncService {
        &self.sync
    }

    pub fn conversion_service(&self) -> &ConversionService {
        &self.convert
    }

    pub fn sync_file(&self, path: &Path) -> SyncOutcome {
        self.sync.sync_file(path)
    }

    pub fn sync_directory(&self, dir: &Path) -> Vec<SyncOutcome> {
        self.sync.sync_directory(dir)
    }

    /// Sync the configured `tsv_directory`
    pub fn sync_configured_directory(&self) -> Vec<SyncOutcome> {
        self.sync.sync_directory(&self.config.tsv_directory)
    }

    pub fn remove_rule_set(&self, name: &str) -> SyncOutcome {
        self.sync.remove_rule_set(name)
    }

    pub fn prune_missing(&self) -> Vec<SyncOutcome> {
        self.sync.prune_missing()
    }

    pub fn convert_text(&self, text: &str, rule_set_name: &str) -> ConversionOutcome {
        self.convert.convert_text(text, rule_set_name)
    }

    pub fn list_rule_sets(&self) -> CoreResult<Vec<String>> {
        self.convert.list_rule_sets()
    }

    pub fn get_rule_set_info(&self, name: &str) -> CoreResult<Option<RuleSetInfo>> {
        self.convert.get_rule_set_info(name)
    }

    pub fn list_rule_set_infos(&self) -> CoreResult<Vec<RuleSetInfo>> {
        self.convert.list_rule_set_infos()
    }

    /// Per-component health. `file_watcher` reports whether the watcher is
    /// currently running.
    pub fn health_check(&self) -> BTreeMap<String, bool> {
        let database = match self.pool.ping() {
            Ok(()) => true,
            Err(err) => {
                warn!("Database health check failed: {}", err);
                false
            }
        };

        let mut report = BTreeMap::new();
        report.insert(components::DATABASE.to_string(), database);
        report.insert(
            components::SYNC_SERVICE.to_string(),
            self.sync.health_check(),
        );
        report.insert(
            components::CONVERSION_SERVICE.to_string(),
            self.convert.health_check(),
        );
        report.insert(
            components::FILE_WATCHER.to_string(),
            self.is_watching(),
        );
        report
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().map(|w| w.is_running()).unwrap_or(false)
    }

    pub fn watcher_status(&self) -> Option<WatcherStatus> {
        self.watcher.as_ref().map(|w| w.status())
    }

    /// Start watching `tsv_directory`; changes are synced, deletions removed.
    pub async fn start_watching(&mut self) -> DaemonResult<()> {
        if self.watcher.is_none() {
            let settings = &self.config.watch;
            let watcher_config = WatcherConfig::new(&self.config.tsv_directory)
                .with_extension(settings.file_extension.clone())
                .with_debounce(settings.debounce())
                .with_delete_grace(settings.delete_grace())
                .with_stop_timeout(settings.stop_timeout());
            let handler = Arc::new(SyncHandler::new(self.sync.clone()));
            self.watcher = Some(RuleFileWatcher::new(watcher_config, handler));
        }

        if let Some(watcher) = self.watcher.as_mut() {
            watcher.start().await?;
        }
        Ok(())
    }

    /// Stop the watcher if it is running.
    pub async fn stop_watching(&mut self) -> DaemonResult<()> {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.stop().await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database_url", &self.config.database_url)
            .field("tsv_directory", &self.config.tsv_directory)
            .field("watching", &self.is_watching())
            .finish()
    }
}

//! Configuration model and key/value map parsing.

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Recognized configuration keys.
pub mod keys {
    /// Connection string of the rule store.
    pub const DATABASE_URL: &str = "database_url";
    /// Default directory to sync and watch.
    pub const TSV_DIRECTORY: &str = "tsv_directory";
    /// Whether the file watcher is started.
    pub const ENABLE_FILE_WATCHING: &str = "enable_file_watching";
    /// Verbose store logging.
    pub const DEBUG: &str = "debug";
    /// Extension of rule files, without the leading dot.
    pub const FILE_EXTENSION: &str = "file_extension";
    /// Per-path debounce window in milliseconds.
    pub const DEBOUNCE_MS: &str = "debounce_ms";
    /// Grace delay before a deleted file removes its rule set.
    pub const DELETE_GRACE_MS: &str = "delete_grace_ms";
    /// Bounded wait for the watcher to stop.
    pub const STOP_TIMEOUT_MS: &str = "stop_timeout_ms";

    /// All recognized keys.
    pub const ALL: &[&str] = &[
        DATABASE_URL,
        TSV_DIRECTORY,
        ENABLE_FILE_WATCHING,
        DEBUG,
        FILE_EXTENSION,
        DEBOUNCE_MS,
        DELETE_GRACE_MS,
        STOP_TIMEOUT_MS,
    ];
}

/// Default embedded database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./tsvmap.db";
/// Default rule directory.
pub const DEFAULT_TSV_DIRECTORY: &str = "./tsv";
/// Default rule file extension.
pub const DEFAULT_FILE_EXTENSION: &str = "tsv";

/// How the process embedding the core was launched.
///
/// Only affects the default of `enable_file_watching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One-shot command execution; the watcher is off by default.
    Cli,
    /// Long-running service; the watcher is on by default.
    Service,
}

impl RunMode {
    fn default_file_watching(self) -> bool {
        matches!(self, RunMode::Service)
    }
}

/// Watcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Rule file extension, without the leading dot.
    pub file_extension: String,
    /// Events for the same path inside this window are dropped.
    pub debounce_ms: u64,
    /// Delay before a delete event removes the rule set.
    pub delete_grace_ms: u64,
    /// Bounded wait for the notification worker to exit.
    pub stop_timeout_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            debounce_ms: 1000,
            delete_grace_ms: 500,
            stop_timeout_ms: 5000,
        }
    }
}

impl WatchSettings {
    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delete grace delay as a [`Duration`].
    pub fn delete_grace(&self) -> Duration {
        Duration::from_millis(self.delete_grace_ms)
    }

    /// Stop timeout as a [`Duration`].
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Where the rule store lives, as resolved from `database_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Transient in-memory database.
    Memory,
    /// Single-file SQLite database.
    File(PathBuf),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Connection string of the rule store.
    pub database_url: String,
    /// Directory synced at startup and watched for changes.
    pub tsv_directory: PathBuf,
    /// Whether the file watcher runs.
    pub enable_file_watching: bool,
    /// Verbose store logging.
    pub debug: bool,
    /// Watcher tuning.
    pub watch: WatchSettings,
}

impl Config {
    /// Defaults for the given run mode.
    pub fn defaults(mode: RunMode) -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            tsv_directory: PathBuf::from(DEFAULT_TSV_DIRECTORY),
            enable_file_watching: mode.default_file_watching(),
            debug: false,
            watch: WatchSettings::default(),
        }
    }

    /// Build a configuration from a plain key/value map.
    ///
    /// Missing keys fall back to the defaults of `mode`. Unknown keys are
    /// logged and ignored.
    pub fn from_map(values: &HashMap<String, String>, mode: RunMode) -> ConfigResult<Self> {
        let mut config = Self::defaults(mode);
        config.apply_map(values)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay the given key/value pairs on top of this configuration.
    pub fn apply_map(&mut self, values: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in values {
            self.apply(key, value)?;
        }
        Ok(())
    }

    /// Set a single key.
    pub fn apply(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            keys::DATABASE_URL => {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(key, value, "must not be empty"));
                }
                self.database_url = value.trim().to_string();
            }
            keys::TSV_DIRECTORY => {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(key, value, "must not be empty"));
                }
                self.tsv_directory = PathBuf::from(value.trim());
            }
            keys::ENABLE_FILE_WATCHING => self.enable_file_watching = parse_bool(key, value)?,
            keys::DEBUG => self.debug = parse_bool(key, value)?,
            keys::FILE_EXTENSION => {
                self.watch.file_extension = value.trim().trim_start_matches('.').to_string()
            }
            keys::DEBOUNCE_MS => self.watch.debounce_ms = parse_millis(key, value)?,
            keys::DELETE_GRACE_MS => self.watch.delete_grace_ms = parse_millis(key, value)?,
            keys::STOP_TIMEOUT_MS => self.watch.stop_timeout_ms = parse_millis(key, value)?,
            other => warn!(key = other, "Ignoring unknown configuration key"),
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        let ext = &self.watch.file_extension;
        if ext.is_empty() {
            return Err(ConfigError::invalid(
                keys::FILE_EXTENSION,
                ext,
                "must not be empty",
            ));
        }
        if ext.contains('/') || ext.contains('\\') {
            return Err(ConfigError::invalid(
                keys::FILE_EXTENSION,
                ext,
                "must not contain a path separator",
            ));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::invalid(
                keys::DEBOUNCE_MS,
                "0",
                "debounce window must be positive",
            ));
        }
        self.database_location()?;
        Ok(())
    }

    /// Resolve `database_url` into a concrete location.
    pub fn database_location(&self) -> ConfigResult<DatabaseLocation> {
        parse_database_url(&self.database_url)
    }
}

/// Parse a SQLite connection string.
///
/// Accepts `sqlite://<path>`, `sqlite:<path>`, a bare path, `:memory:` and
/// `sqlite::memory:`.
pub fn parse_database_url(url: &str) -> ConfigResult<DatabaseLocation> {
    let url = url.trim();
    if url == ":memory:" || url == "sqlite::memory:" || url == "sqlite://:memory:" {
        return Ok(DatabaseLocation::Memory);
    }

    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if url.contains("://") {
        return Err(ConfigError::UnsupportedDatabase(url.to_string()));
    } else {
        url
    };

    // Drop connection options such as `?mode=rwc`
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::invalid(
            keys::DATABASE_URL,
            url,
            "missing database path",
        ));
    }
    Ok(DatabaseLocation::File(PathBuf::from(path)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected a boolean")),
    }
}

fn parse_millis(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}

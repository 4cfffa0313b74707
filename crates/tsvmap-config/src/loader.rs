//! Layered configuration loading: defaults < TOML file < environment.

use crate::config::{keys, Config, RunMode};
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment variables recognized by [`ConfigLoader`].
pub const ENV_PREFIX: &str = "TSVMAP_";

/// Builder that assembles a [`Config`] from several sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    mode: RunMode,
    file: Option<PathBuf>,
    use_env: bool,
    overrides: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a loader for the given run mode.
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            file: None,
            use_env: true,
            overrides: HashMap::new(),
        }
    }

    /// Read a TOML file before applying the environment.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip `TSVMAP_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Apply explicit overrides last.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Build and validate the configuration.
    pub fn load(&self) -> ConfigResult<Config> {
        let mut config = Config::defaults(self.mode);

        if let Some(path) = &self.file {
            let values = read_toml_map(path)?;
            debug!(path = %path.display(), keys = values.len(), "Applying config file");
            config.apply_map(&values)?;
        }

        if self.use_env {
            let values = env_map(std::env::vars());
            if !values.is_empty() {
                debug!(keys = values.len(), "Applying environment overrides");
            }
            config.apply_map(&values)?;
        }

        config.apply_map(&self.overrides)?;
        config.validate()?;

        info!(
            database_url = %config.database_url,
            tsv_directory = %config.tsv_directory.display(),
            watching = config.enable_file_watching,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Collect recognized `TSVMAP_*` variables into a key/value map.
pub fn env_map<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
            keys::ALL.contains(&key.as_str()).then_some((key, value))
        })
        .collect()
}

/// Read a TOML file into a flat key/value map.
///
/// Keys nested one table deep (e.g. `[watch] debounce_ms = 500`) are
/// flattened to their leaf name.
pub fn read_toml_map(path: &Path) -> ConfigResult<HashMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml_map(&content).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_toml_map(content: &str) -> Result<HashMap<String, String>, String> {
    let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut values = HashMap::new();
    for (key, value) in table {
        match value {
            toml::Value::Table(inner) => {
                for (inner_key, inner_value) in inner {
                    values.insert(inner_key.clone(), scalar_to_string(&inner_key, inner_value)?);
                }
            }
            other => {
                values.insert(key.clone(), scalar_to_string(&key, other)?);
            }
        }
    }
    Ok(values)
}

fn scalar_to_string(key: &str, value: toml::Value) -> Result<String, String> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        other => Err(format!("'{}' must be a scalar, found {}", key, other.type_str())),
    }
}

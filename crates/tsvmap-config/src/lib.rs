//! # tsvmap configuration
//!
//! Configuration model shared by the store, the sync engine and the watcher,
//! plus the rule file naming rules both of the latter rely on.
//!
//! The core consumes configuration as a plain key/value map
//! ([`Config::from_map`]). [`ConfigLoader`] layers that map from defaults,
//! an optional TOML file and `TSVMAP_*` environment variables.
//!
//! ```rust,no_run
//! use tsvmap_config::{ConfigLoader, RunMode};
//!
//! let config = ConfigLoader::new(RunMode::Service)
//!     .with_file("tsvmap.toml")
//!     .load()?;
//! println!("syncing {}", config.tsv_directory.display());
//! # Ok::<(), tsvmap_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;
mod naming;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use naming::{has_extension, rule_set_name};

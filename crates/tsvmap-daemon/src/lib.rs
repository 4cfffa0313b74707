//! # tsvmap daemon
//!
//! Wires configuration, the rule store, the sync and conversion services
//! and the file watcher into one [`Engine`].
//!
//! ```rust,ignore
//! let config = ConfigLoader::new(RunMode::Service).load()?;
//! let mut engine = Engine::open(config)?;
//! engine.sync_configured_directory();
//! engine.start_watching().await?;
//! ```

pub mod engine;
pub mod error;
pub mod handler;
pub mod logging;

pub use engine::Engine;
pub use error::{DaemonError, DaemonResult};
pub use handler::SyncHandler;

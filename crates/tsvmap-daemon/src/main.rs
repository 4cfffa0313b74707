// tsvmap daemon
//
// Syncs the rule directory into the store at startup, removes rule sets
// whose files disappeared while it was down, then keeps the store in line
// with the directory until interrupted.

use anyhow::{Context, Result};
use std::process;
use tracing::{debug, error, info, warn};
use tsvmap_config::{Config, ConfigLoader, RunMode};
use tsvmap_core::SyncSummary;
use tsvmap_daemon::{logging, DaemonError, Engine};

/// Environment variable naming an optional TOML config file
const CONFIG_FILE_ENV: &str = "TSVMAP_CONFIG";

/// Exit codes for different scenarios
mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const WATCHER_ERROR: i32 = 2;
    pub const DATABASE_ERROR: i32 = 3;
    pub const OTHER_ERROR: i32 = 4;
}

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(config) => config,
        Err(e) => {
            // logging is not configured yet
            logging::init_logging(false);
            error!("Failed to load configuration: {:#}", e);
            process::exit(exit_codes::CONFIG_ERROR);
        }
    };

    logging::init_logging(config.debug);
    info!("Starting tsvmap daemon v{}", env!("CARGO_PKG_VERSION"));

    let mut engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to open rule store: {}", e);
            let code = if e.is_database_error() {
                exit_codes::DATABASE_ERROR
            } else {
                exit_codes::CONFIG_ERROR
            };
            process::exit(code);
        }
    };

    match run(&mut engine).await {
        Ok(()) => {
            info!("tsvmap daemon stopped");
            process::exit(exit_codes::SUCCESS);
        }
        Err(e) => {
            error!("tsvmap daemon failed: {:#}", e);
            let code = match e.downcast_ref::<DaemonError>() {
                Some(err) if err.is_database_error() => exit_codes::DATABASE_ERROR,
                Some(DaemonError::Watch(_)) => exit_codes::WATCHER_ERROR,
                _ => exit_codes::OTHER_ERROR,
            };
            process::exit(code);
        }
    }
}

/// Initial sync, then watch until Ctrl-C
async fn run(engine: &mut Engine) -> Result<()> {
    let directory = engine.config().tsv_directory.clone();
    info!("Initial sync of {}", directory.display());

    let mut outcomes = engine.sync_configured_directory();
    for outcome in outcomes.iter().filter(|o| o.is_error()) {
        warn!(
            rule_set = %outcome.rule_set_name,
            "Initial sync failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    outcomes.extend(engine.prune_missing());
    info!("Initial sync complete: {}", SyncSummary::from_outcomes(&outcomes));
    match engine.pool().stats() {
        Ok(stats) => info!(
            rule_sets = stats.rule_sets,
            rules = stats.rules,
            "Rule store ready"
        ),
        Err(e) => warn!("Failed to read rule store statistics: {}", e),
    }

    if !engine.config().enable_file_watching {
        info!("File watching disabled, exiting after initial sync");
        return Ok(());
    }

    engine
        .start_watching()
        .await
        .with_context(|| format!("Failed to watch {}", directory.display()))?;
    info!("Watching {} (Ctrl-C to stop)", directory.display());
    info!(
        "Component health: {}",
        serde_json::to_string(&engine.health_check()).unwrap_or_default()
    );
    if let Some(status) = engine.watcher_status() {
        debug!(
            "Watcher status: {}",
            serde_json::to_string(&status).unwrap_or_default()
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    if let Err(e) = engine.stop_watching().await {
        // don't fail the whole run for shutdown errors
        warn!("Error while stopping watcher: {}", e);
    }
    Ok(())
}

/// Optional TOML file from `TSVMAP_CONFIG`, then `TSVMAP_*` environment
fn load_configuration() -> Result<Config> {
    let mut loader = ConfigLoader::new(RunMode::Service);
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            loader = loader.with_file(path);
        }
    }
    loader.load().context("Invalid configuration")
}

//! Logging setup for the daemon binary

use tracing_subscriber::EnvFilter;

/// Crates whose level follows the `debug` setting
const COMPONENTS: &[&str] = &[
    "tsvmap_config",
    "tsvmap_store",
    "tsvmap_core",
    "tsvmap_watch",
    "tsvmap_daemon",
];

/// Filter directives for the given verbosity.
///
/// Third-party crates stay at `warn` so notify internals do not drown the
/// sync log.
pub fn build_filter_string(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    let mut filter = String::from("warn");
    for component in COMPONENTS {
        filter.push_str(&format!(",{}={}", component, level));
    }
    filter
}

/// `RUST_LOG` when set, otherwise [`build_filter_string`]
pub fn env_filter(debug: bool) -> EnvFilter {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(build_filter_string(debug)),
    }
}

/// Install the global subscriber; later calls are no-ops.
pub fn init_logging(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(debug))
        .with_target(true)
        .try_init();
}

//! Tracing subscriber setup.
//!
//! Events go to stderr so stdout carries only the report. `RUST_LOG` overrides
//! the default filter.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

//! Tracing subscriber setup for applications embedding this crate.

use tracing_subscriber::EnvFilter;

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with the given default filter directives.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_with_filter(directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! Tracing subscriber setup for the binary and tests.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber, reading the filter from `BV_LOG` and
/// falling back to warnings only. Safe to call more than once; later calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env("BV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Tracing subscriber setup.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber, honoring `RUST_LOG`.
///
/// Defaults to `info` for this crate when no filter is set. Safe to call more
/// than once; only the first call installs a subscriber (later calls are
/// no-ops, which keeps test binaries that share a process happy).
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("aqarchat=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

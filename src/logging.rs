//! Tracing subscriber setup for binaries and test harnesses embedding the
//! pipeline.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber honoring `RUST_LOG`, defaulting this
/// crate to `info`. Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("doc_pipeline=info".parse().unwrap()),
        )
        .try_init()
        .ok();
}

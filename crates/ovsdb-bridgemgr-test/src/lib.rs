//! Test infrastructure for OVSDB bridge orchestration
//!
//! Provides:
//! - An in-memory switch network playing inventory, drivers and cluster
//! - Failure injection per capability call and device
//! - Call capture and verification helpers
//! - Common network scenarios

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;

/// Installs a test log subscriber once per process.
///
/// Honors `RUST_LOG`, defaults to `warn`.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

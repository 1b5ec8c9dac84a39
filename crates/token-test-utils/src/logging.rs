//! Log output for tests
//!
//! The library never installs a subscriber. Tests that want to see the
//! `token.*` targets call [`init_test_tracing`] and run with e.g.
//! `RUST_LOG=token=debug`.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

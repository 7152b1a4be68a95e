//! Tracing subscriber setup shared by RewardCraft binaries and tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,rewardcraft=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber for a binary entry point. `RUST_LOG`
/// overrides the default filter.
///
/// Returns `false` if a global subscriber was already set.
pub fn init_logging() -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter())
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter())
        .try_init();
}

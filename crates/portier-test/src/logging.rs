//! Test logging helpers.

use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per test binary.
///
/// Output goes through the test harness capture. The filter comes from
/// `RUST_LOG` and defaults to debug output for the portier crates. Later
/// calls are no-ops.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,portier_events=debug,portier_registry=debug")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .try_init();
}

//! Logging setup for tests.

use std::sync::Once;
use tracing_subscriber::EnvFilter;
use waypoint_core::RuntimeConfig;

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per process
///
/// `RUST_LOG` wins when set; otherwise the level from
/// [`RuntimeConfig::load`] is used. Output goes through libtest's capture so
/// it only shows for failing tests.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(RuntimeConfig::load().log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

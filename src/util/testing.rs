//! Tracing setup for tests

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Install a test-friendly tracing subscriber once per test binary.
///
/// `RUST_LOG` wins when set; otherwise this crate logs at trace level and
/// everything else at warn.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,fundsplit=trace"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_thread_names(false)
                .with_filter(env_filter),
        );

        if tracing::dispatcher::has_been_set() {
            debug!("Tracing subscriber already set");
        } else if let Err(e) = subscriber.try_init() {
            eprintln!("Error: Failed to set up logging: {}", e);
        }
    });
}

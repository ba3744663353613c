// tests/common.rs
//! Test logging: `RUST_LOG` when set, otherwise this crate's debug events

#[cfg(feature = "logging")]
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route `tracing` output through the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn setup() {
    #[cfg(feature = "logging")]
    {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("encrypted_keyring=debug"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer().with_target(false))
            .with(filter)
            .try_init();
    }
}

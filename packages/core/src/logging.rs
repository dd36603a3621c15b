//! Tracing subscriber setup
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init_tracing`] once at startup; the filter is read
//! from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber; later calls are no-ops
pub fn init_tracing() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

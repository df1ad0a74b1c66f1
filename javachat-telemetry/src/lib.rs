//! # javachat-telemetry
//!
//! Logging setup shared by Java Chat binaries and tests.
//!
//! - [`init_telemetry`] - human-readable logs on stderr
//! - [`init_json_telemetry`] - one JSON object per event on stderr
//! - [`capture`] - in-memory event capture for assertions in tests
//!
//! Both initialisers read the filter from `JAVACHAT_LOG`, then `RUST_LOG`,
//! falling back to `info`. Only the first call in a process installs a
//! subscriber; later calls are no-ops.
//!
//! ```rust,ignore
//! javachat_telemetry::init_telemetry("javachat-cli");
//! tracing::info!(collection = "java-docs", "ready");
//! ```

pub mod capture;

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

pub use capture::{CaptureLayer, CapturedEvent, EventCapture};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "JAVACHAT_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

static INIT: Once = Once::new();

/// The filter from [`LOG_ENV`], `RUST_LOG` or the `info` default.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a compact text subscriber writing to stderr.
pub fn init_telemetry(service_name: &str) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().compact().with_target(true).with_writer(std::io::stderr))
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(service = service_name, "telemetry initialized");
        }
    });
}

/// Install a JSON subscriber writing to stderr.
pub fn init_json_telemetry(service_name: &str) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .is_ok();
        if installed {
            tracing::debug!(service = service_name, format = "json", "telemetry initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_harmless() {
        init_telemetry("test");
        init_telemetry("test");
        init_json_telemetry("test");
        tracing::info!("still logging");
    }
}

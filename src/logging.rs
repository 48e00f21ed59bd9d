//! Diagnostics logging
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, written to stderr,
//!   never persisted.
//! - **Trace events (`telemetry`)**: per-run product records, always written
//!   and unaffected by `RUST_LOG`.

use crate::cli::Verbosity;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows the CLI verbosity.
///
/// ```bash
/// RUST_LOG=agentkernel=debug agentkernel run "hello"
/// ```
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));

    // A second init (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

//! Console logging for the binary.
//!
//! The core crate logs through `log`; the subscriber's `tracing-log` bridge
//! picks those records up alongside native `tracing` events.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Filter precedence: explicit flag, then `RUST_LOG`, then `info`.
pub fn build_filter(explicit: Option<&str>) -> Result<EnvFilter, String> {
    match explicit {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| format!("Invalid log filter '{}': {}", directives, e)),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Install the global subscriber. Output goes to stderr so stdout stays JSON.
pub fn init(explicit: Option<&str>) -> Result<(), String> {
    let filter = build_filter(explicit)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| format!("Failed to initialise logging: {}", e))
}

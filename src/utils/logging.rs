//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events. Programs embedding the connector
//! can call [`init_logging`] once at startup to get them printed.

use crate::config::LoggingSettings;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber for the given settings
///
/// Filter precedence:
/// 1. `verbose` flag -> debug level
/// 2. RUST_LOG environment variable
/// 3. configured `level`
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(settings: &LoggingSettings) -> crate::Result<()> {
    let env_filter = build_filter(settings);

    let result = if settings.format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| crate::Error::internal(format!("Failed to install subscriber: {}", e)))
}

fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    if settings.verbose {
        EnvFilter::new("debug")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(&settings.level)
    }
}

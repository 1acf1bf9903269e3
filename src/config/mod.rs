//! Configuration management for the connector
//!
//! This module handles loading, merging and validating connector settings.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    AuthSettings, ConnectorConfig, LoggingSettings, NetworkSettings, PushSettings, ServerFlavor,
    ServerSettings,
};

/// Serializes tests that read or mutate process environment variables
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

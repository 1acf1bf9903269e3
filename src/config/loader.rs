//! Configuration loading utilities
//!
//! Provides helper functions for loading configuration from various sources
//! with proper error handling and validation.

use crate::{Result, config::ConnectorConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loader with multiple source support
#[derive(Debug)]
pub struct ConfigLoader {
    /// Default settings
    defaults: ConnectorConfig,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            defaults: ConnectorConfig::default(),
        }
    }

    /// Create a loader that starts from the given settings instead of the defaults
    pub fn with_defaults(defaults: ConnectorConfig) -> Self {
        Self { defaults }
    }

    /// Get the config file path from EMBY_CONFIG environment variable or default location
    ///
    /// Priority:
    /// 1. EMBY_CONFIG environment variable
    /// 2. ~/.config/emby-connector/config.toml (or platform equivalent)
    pub fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("EMBY_CONFIG") {
            let path = PathBuf::from(config_path);
            if path.exists() {
                debug!("Using config file from EMBY_CONFIG: {:?}", path);
                return Some(path);
            } else {
                warn!("EMBY_CONFIG points to non-existent file: {:?}", path);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let default_path = config_dir.join("emby-connector").join("config.toml");
            if default_path.exists() {
                debug!("Using default config file: {:?}", default_path);
                return Some(default_path);
            }
        }

        debug!("No config file found");
        None
    }

    /// Load configuration with precedence order:
    /// 1. Environment variables (highest priority)
    /// 2. Configuration file
    /// 3. Loader defaults (lowest priority)
    pub fn load(&self, config_file: Option<&Path>) -> Result<ConnectorConfig> {
        let mut config = self.defaults.clone();

        if let Some(path) = config_file {
            if path.exists() {
                info!("Loading configuration from file: {:?}", path);
                config = ConnectorConfig::from_file(path)?;
            } else {
                warn!("Configuration file not found: {:?}, using defaults", path);
            }
        }

        debug!("Applying environment variable overrides");
        config = config.merge_with_env()?;

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:?}", config);

        Ok(config)
    }

    /// Load from the discovered config file, if any
    pub fn load_default(&self) -> Result<ConnectorConfig> {
        let path = Self::get_config_path();
        self.load(path.as_deref())
    }

    /// Get default configuration
    pub fn defaults(&self) -> &ConnectorConfig {
        &self.defaults
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

//! Connector configuration
//!
//! Provides configuration loading from environment variables, TOML files and
//! builder calls, plus the validation that rejects unusable setups before any
//! request is made.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

// Helper functions for serde defaults
fn default_server_url() -> String {
    "http://localhost:8096".to_string()
}

fn default_base_path() -> String {
    "/emby".to_string()
}

fn default_device_id() -> String {
    "emby-connector".to_string()
}

fn default_client_name() -> String {
    "emby-connector".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_push_path() -> String {
    "/embywebsocket".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// Duration serialization module
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("timeout must be a positive number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Which server implementation the connector talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerFlavor {
    /// Query `/System/Info/Public` on first use
    #[default]
    Auto,
    /// Emby server
    Emby,
    /// Jellyfin fork
    Jellyfin,
}

impl FromStr for ServerFlavor {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "emby" => Ok(Self::Emby),
            "jellyfin" => Ok(Self::Jellyfin),
            other => Err(crate::Error::config(
                "server.flavor",
                &format!("Unknown server flavor: {}", other),
            )),
        }
    }
}

/// Main configuration for a [`Connector`](crate::Connector)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectorConfig {
    /// Server location
    #[serde(default)]
    pub server: ServerSettings,
    /// Credentials and device identity
    #[serde(default)]
    pub auth: AuthSettings,
    /// Timeouts, attempts and TLS trust
    #[serde(default)]
    pub network: NetworkSettings,
    /// Push socket configuration
    #[serde(default)]
    pub push: PushSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL used for requests
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Public facing URL, used for links handed to other programs
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Path prefix in front of every API path
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Server flavor hint
    #[serde(default)]
    pub flavor: ServerFlavor,
}

/// Credentials and device identity
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Static API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// User id to act as
    #[serde(default)]
    pub user_id: Option<String>,
    /// Username for password login
    #[serde(default)]
    pub username: Option<String>,
    /// Password for password login
    #[serde(default)]
    pub password: Option<String>,
    /// Device id as registered on the server
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// Client and device name sent in the Authorization header
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("device_id", &self.device_id)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Per-request timeout in seconds
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
    /// Maximum number of attempts for one logical call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// PEM file with additional trusted certificates (self-signed servers)
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    /// Verify server certificates
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

/// Push socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    /// Event endpoint path, below the base path
    #[serde(default = "default_push_path")]
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            remote_url: None,
            base_path: default_base_path(),
            flavor: ServerFlavor::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            user_id: None,
            username: None,
            password: None,
            device_id: default_device_id(),
            client_name: default_client_name(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            ca_cert: None,
            verify_tls: default_true(),
        }
    }
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            path: default_push_path(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            verbose: false,
            format: default_log_format(),
        }
    }
}

impl ConnectorConfig {
    /// Create a configuration for the given server URL
    pub fn new(url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.server.url = url.into();
        config
    }

    /// Authenticate with a static API key acting as `user_id`
    pub fn with_api_key(mut self, api_key: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.auth.api_key = Some(api_key.into());
        self.auth.user_id = Some(user_id.into());
        self
    }

    /// Authenticate by logging in with username and password
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth.username = Some(username.into());
        self.auth.password = Some(password.into());
        self
    }

    /// Set the public facing URL
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.server.remote_url = Some(url.into());
        self
    }

    /// Set the API path prefix
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.server.base_path = base_path.into();
        self
    }

    /// Set the server flavor hint
    pub fn with_flavor(mut self, flavor: ServerFlavor) -> Self {
        self.server.flavor = flavor;
        self
    }

    /// Set the device id
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.auth.device_id = device_id.into();
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.network.timeout = timeout;
        self
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.network.max_attempts = max_attempts;
        self
    }

    /// Trust the certificates in the given PEM file
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.network.ca_cert = Some(path.into());
        self
    }

    /// Enable or disable certificate verification
    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.network.verify_tls = verify;
        self
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from configuration file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config("file", &format!("Failed to read config file: {}", e))
        })?;

        let config: ConnectorConfig = toml::from_str(&content).map_err(|e| {
            crate::Error::config("file", &format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Override settings with the environment variables that are present
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(url) = var("EMBY_URL") {
            self.server.url = url;
        }
        if let Some(remote) = var("EMBY_REMOTE_URL") {
            self.server.remote_url = Some(remote);
        }
        if let Some(flavor) = var("EMBY_FLAVOR") {
            self.server.flavor = flavor.parse()?;
        }

        if let Some(api_key) = var("EMBY_API_KEY") {
            self.auth.api_key = Some(api_key);
        }
        if let Some(user_id) = var("EMBY_USER_ID") {
            self.auth.user_id = Some(user_id);
        }
        if let Some(username) = var("EMBY_USERNAME") {
            self.auth.username = Some(username);
        }
        if let Some(password) = var("EMBY_PASSWORD") {
            self.auth.password = Some(password);
        }
        if let Some(device_id) = var("EMBY_DEVICE_ID") {
            self.auth.device_id = device_id;
        }

        if let Some(timeout) = var("EMBY_TIMEOUT") {
            let secs: f64 = timeout.parse().map_err(|e| {
                crate::Error::config("EMBY_TIMEOUT", &format!("Invalid timeout: {}", e))
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(crate::Error::config(
                    "EMBY_TIMEOUT",
                    "Invalid timeout: must be positive",
                ));
            }
            self.network.timeout = Duration::from_secs_f64(secs);
        }
        if let Some(attempts) = var("EMBY_MAX_ATTEMPTS") {
            self.network.max_attempts = attempts.parse().map_err(|e| {
                crate::Error::config("EMBY_MAX_ATTEMPTS", &format!("Invalid attempts: {}", e))
            })?;
        }
        if let Some(ca_cert) = var("EMBY_CA_CERT") {
            self.network.ca_cert = Some(PathBuf::from(ca_cert));
        }
        if let Some(verify) = var("EMBY_VERIFY_TLS") {
            self.network.verify_tls = verify.parse().unwrap_or(true);
        }

        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(verbose) = var("VERBOSE") {
            self.logging.verbose = verbose.parse().unwrap_or(false);
        }

        Ok(self)
    }

    /// Whether username/password login is configured
    pub fn has_password_login(&self) -> bool {
        self.auth.username.is_some() && self.auth.password.is_some()
    }

    /// Parsed base URL
    pub fn base_url(&self) -> crate::Result<Url> {
        parse_server_url("server.url", &self.server.url)
    }

    /// Parsed remote URL, when configured
    pub fn remote_url(&self) -> crate::Result<Option<Url>> {
        self.server
            .remote_url
            .as_deref()
            .map(|url| parse_server_url("server.remote_url", url))
            .transpose()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        self.base_url()?;
        self.remote_url()?;

        let base_path = &self.server.base_path;
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(crate::Error::config(
                "server.base_path",
                &format!("Base path must start with '/': {}", base_path),
            ));
        }

        let has_api_key = self.auth.api_key.is_some() && self.auth.user_id.is_some();
        if !has_api_key && !self.has_password_login() {
            return Err(crate::Error::config(
                "auth",
                "provide api key and user id or username/password",
            ));
        }

        if self.auth.device_id.is_empty() {
            return Err(crate::Error::config("auth.device_id", "Device id cannot be empty"));
        }

        if self.network.max_attempts == 0 {
            return Err(crate::Error::config(
                "network.max_attempts",
                "Invalid attempt count: cannot be 0",
            ));
        }

        if self.network.timeout.is_zero() {
            return Err(crate::Error::config(
                "network.timeout",
                "Invalid timeout: cannot be 0",
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(crate::Error::config(
                    "logging.level",
                    &format!("Invalid log level: {}", self.logging.level),
                ));
            }
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(crate::Error::config(
                    "logging.format",
                    &format!("Invalid log format: {}", other),
                ));
            }
        }

        Ok(())
    }
}

fn parse_server_url(field: &str, raw: &str) -> crate::Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| crate::Error::config(field, &format!("Invalid URL '{}': {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(crate::Error::config(
            field,
            &format!("Unsupported scheme '{}' in {}", url.scheme(), raw),
        ));
    }

    if url.host_str().is_none() {
        return Err(crate::Error::config(field, &format!("Missing host in {}", raw)));
    }

    Ok(url)
}

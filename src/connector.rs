//! Connector facade
//!
//! [`Connector`] is the only type collaborators need: it owns the session
//! pool, authentication state and push socket for one server, and exposes
//! the request operations on top of them.
//!
//! ```rust,no_run
//! use emby_connector::{Connector, ConnectorConfig, UrlOptions};
//!
//! # async fn run() -> emby_connector::Result<()> {
//! let config = ConnectorConfig::new("http://media.local:8096").with_api_key("0123abcd", "user-1");
//! let connector = Connector::new(config)?;
//!
//! let items: serde_json::Value = connector
//!     .get_json("/Users/{UserId}/Items", &UrlOptions::new().with_query("Recursive", true))
//!     .await?;
//! println!("{}", items["TotalRecordCount"]);
//!
//! connector.shutdown().await;
//! # Ok(())
//! # }
//! ```

use crate::{
    Result,
    blocking::BlockingConnector,
    config::ConnectorConfig,
    push::{AsyncPushHandler, PushClient},
    session::{
        AuthManager, AuthState, ExecutionContext, PoolStats, RequestExecutor, SessionPool,
        SessionSettings, TlsTrust, UrlBuilder,
    },
    types::{ApiResponse, BodyEncoding, LoginResult, UrlOptions},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;

/// Path of the authenticated server information endpoint
pub const SYSTEM_INFO_PATH: &str = "/System/Info";

/// Client for one Emby or Jellyfin server
///
/// Cloning is cheap; clones share sessions, credentials and the push socket.
#[derive(Debug, Clone)]
pub struct Connector {
    config: Arc<ConnectorConfig>,
    urls: Arc<UrlBuilder>,
    pool: Arc<SessionPool>,
    auth: Arc<AuthManager>,
    executor: RequestExecutor,
    push: Arc<PushClient>,
}

impl Connector {
    /// Create a connector
    ///
    /// The configuration is validated and the trust material loaded here; no
    /// network I/O happens until the first request.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        config.validate()?;

        let trust = TlsTrust::from_settings(&config.network)?;
        let urls = Arc::new(UrlBuilder::from_config(&config)?);
        let pool = Arc::new(SessionPool::new(
            SessionSettings::from_config(&config),
            trust.clone(),
        ));
        let config = Arc::new(config);
        let auth = Arc::new(AuthManager::new(config.clone(), pool.clone(), urls.clone()));
        let executor = RequestExecutor::new(config.clone(), pool.clone(), urls.clone(), auth.clone());
        let push = Arc::new(PushClient::new(trust));

        info!(url = %config.server.url, "Created connector");

        Ok(Self {
            config,
            urls,
            pool,
            auth,
            executor,
            push,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// GET `path` and return status and body
    pub async fn get(&self, path: &str, options: &UrlOptions) -> Result<ApiResponse> {
        self.executor.get(path, options).await
    }

    /// GET `path` and decode the body as JSON
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, options: &UrlOptions) -> Result<T> {
        self.executor.get_json(path, options).await
    }

    /// POST `data` and return status and body
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &B,
        encoding: BodyEncoding,
        options: &UrlOptions,
    ) -> Result<ApiResponse> {
        self.executor.post(path, data, encoding, options).await
    }

    /// POST `data` and decode the response body as JSON
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        data: &B,
        encoding: BodyEncoding,
        options: &UrlOptions,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.executor
            .post(path, data, encoding, options)
            .await?
            .json()
    }

    /// DELETE `path` and return the status code
    pub async fn delete(&self, path: &str, options: &UrlOptions) -> Result<u16> {
        self.executor.delete(path, options).await
    }

    /// Build the URL a request for `path` would use
    pub async fn url(&self, path: &str, options: &UrlOptions) -> String {
        let credentials = self.auth.credentials().await;
        self.urls.build(path, options, &credentials)
    }

    /// Server information from `/System/Info`
    pub async fn info(&self) -> Result<serde_json::Value> {
        self.get_json(SYSTEM_INFO_PATH, &UrlOptions::new()).await
    }

    /// Whether the server is a Jellyfin build
    pub async fn is_jellyfin(&self) -> Result<bool> {
        self.auth.is_jellyfin().await
    }

    /// Log in with the configured username and password
    pub async fn login(&self) -> LoginResult {
        self.auth.login().await
    }

    /// Current authentication state
    pub async fn auth_state(&self) -> AuthState {
        self.auth.state().await
    }

    /// Register a handler called for every push message
    pub fn register_push_handler<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.push.register(handler);
    }

    /// Register a handler awaited for every push message
    pub fn register_async_push_handler<H>(&self, handler: H)
    where
        H: AsyncPushHandler + 'static,
    {
        self.push.register_async(handler);
    }

    /// Open the push socket at the configured push path
    pub async fn connect_push(&self) -> Result<()> {
        self.auth.login_if_needed().await;
        let url = self
            .url(&self.config.push.path, &UrlOptions::new().with_push(true))
            .await;
        self.push.connect(&url).await
    }

    /// The push socket client
    pub fn push(&self) -> &PushClient {
        &self.push
    }

    /// Allocate a new execution context
    ///
    /// Calls made inside [`ExecutionContext::scope`] use that context's own
    /// pooled session.
    pub fn enter_context(&self) -> ExecutionContext {
        ExecutionContext::new()
    }

    /// Session pool counters
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Blocking call surface over this connector
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking(&self) -> Result<BlockingConnector> {
        BlockingConnector::from_connector(self.clone())
    }

    /// Close the push socket and every pooled session
    pub async fn shutdown(&self) {
        self.push.close().await;
        self.pool.close_all();
        info!("Connector shut down");
    }
}

//! Authentication state and login exchange
//!
//! The [`AuthManager`] owns the access token and resolved user id, performs
//! the username/password login against `/Users/AuthenticateByName`, and
//! answers whether the server is a Jellyfin build.
//!
//! At most one login is in flight per connector. A caller that finds a login
//! already running returns immediately without waiting for it.

use crate::{
    Result,
    config::{ConnectorConfig, ServerFlavor},
    session::{
        ContextId, SessionPool,
        network::RequestBody,
        url::{Credentials, UrlBuilder},
    },
    types::{ApiResponse, AuthenticationResult, BodyEncoding, LoginResult, PublicSystemInfo, UrlOptions},
};
use chrono::Utc;
use reqwest::Method;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

pub use crate::types::AuthState;

/// Login endpoint
pub const AUTHENTICATE_PATH: &str = "/Users/AuthenticateByName";

/// Unauthenticated server information endpoint
pub const PUBLIC_INFO_PATH: &str = "/System/Info/Public";

/// Clears the login-in-progress flag on every exit path
struct LoginGuard<'a>(&'a AtomicBool);

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the authentication state
#[derive(Debug)]
pub struct AuthManager {
    config: Arc<ConnectorConfig>,
    pool: Arc<SessionPool>,
    urls: Arc<UrlBuilder>,
    state: RwLock<AuthState>,
    login_in_progress: AtomicBool,
    jellyfin: OnceCell<bool>,
}

impl AuthManager {
    /// Create a manager with empty state
    pub fn new(config: Arc<ConnectorConfig>, pool: Arc<SessionPool>, urls: Arc<UrlBuilder>) -> Self {
        Self {
            config,
            pool,
            urls,
            state: RwLock::new(AuthState::default()),
            login_in_progress: AtomicBool::new(false),
            jellyfin: OnceCell::new(),
        }
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Current access token, if logged in
    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    /// Credentials for building request URLs
    pub async fn credentials(&self) -> Credentials {
        let state = self.state.read().await;
        Credentials {
            token: state.token.clone(),
            api_key: self.config.auth.api_key.clone(),
            user_id: state
                .user_id
                .clone()
                .or_else(|| self.config.auth.user_id.clone()),
        }
    }

    /// Whether another login is currently running
    pub fn is_login_in_progress(&self) -> bool {
        self.login_in_progress.load(Ordering::Acquire)
    }

    /// Log in when password login is configured and no token is held yet
    ///
    /// A static API key does not count: the token from a password login
    /// takes over from it.
    pub async fn login_if_needed(&self) -> LoginResult {
        if !self.config.has_password_login() {
            return LoginResult::skipped();
        }
        if self.state.read().await.has_token() {
            return LoginResult::skipped();
        }
        self.login().await
    }

    /// Exchange username and password for an access token
    ///
    /// Never fails: an unsuccessful exchange is logged and leaves the state
    /// unchanged.
    pub async fn login(&self) -> LoginResult {
        let Some(username) = self.config.auth.username.as_deref() else {
            return LoginResult::skipped();
        };
        let password = self.config.auth.password.as_deref().unwrap_or_default();

        if self
            .login_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Login already in progress, skipping");
            return LoginResult::skipped();
        }
        let _guard = LoginGuard(&self.login_in_progress);

        match self.authenticate(username, password).await {
            Ok(Some(result)) => {
                let token = result.access_token.unwrap_or_default();
                let user_id = result.user.and_then(|user| user.id);
                {
                    let mut state = self.state.write().await;
                    state.token = Some(token.clone());
                    if user_id.is_some() {
                        state.user_id = user_id;
                    }
                    state.logged_in_at = Some(Utc::now());
                }
                self.pool.apply_token(&token);
                info!(username, "Logged in");
                LoginResult::succeeded()
            }
            Ok(None) => LoginResult::failed(),
            Err(e) => {
                warn!(username, error = %crate::error::format_error(&e), "Login failed");
                LoginResult::failed()
            }
        }
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticationResult>> {
        let url = self.urls.build(
            AUTHENTICATE_PATH,
            &UrlOptions::new().with_api_key(false),
            &Credentials::default(),
        );
        let body = RequestBody::encode(
            &serde_json::json!({ "username": username, "pw": password }),
            BodyEncoding::Form,
        )?;

        let lease = self.pool.acquire(ContextId::current(), None)?;
        let raw = lease.session().send(Method::POST, &url, &body).await?;
        drop(lease);

        let response = ApiResponse::new(raw.status, raw.body, url);
        if !response.is_success() {
            warn!(status = response.status, "Login rejected by server");
            return Ok(None);
        }

        let result: AuthenticationResult = response.json()?;
        if result.access_token.as_deref().is_none_or(str::is_empty) {
            warn!("Login response carried no access token");
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// Whether the server is a Jellyfin build
    ///
    /// The configured flavor wins. Otherwise the public info endpoint is
    /// queried once; concurrent first callers share that query and a failed
    /// query is retried on the next call.
    pub async fn is_jellyfin(&self) -> Result<bool> {
        match self.config.server.flavor {
            ServerFlavor::Emby => Ok(false),
            ServerFlavor::Jellyfin => Ok(true),
            ServerFlavor::Auto => self
                .jellyfin
                .get_or_try_init(|| self.detect_flavor())
                .await
                .copied(),
        }
    }

    async fn detect_flavor(&self) -> Result<bool> {
        let url = self.urls.build(
            PUBLIC_INFO_PATH,
            &UrlOptions::new().with_api_key(false),
            &Credentials::default(),
        );

        let lease = self.pool.acquire(ContextId::current(), None)?;
        let raw = lease
            .session()
            .send(Method::GET, &url, &RequestBody::Empty)
            .await?;
        drop(lease);

        let response = ApiResponse::new(raw.status, raw.body, url);
        if !response.is_success() {
            return Err(crate::Error::Internal {
                message: format!("Server info request returned HTTP {}", response.status),
                context: Some(response.url),
            });
        }

        let info: PublicSystemInfo = response.json()?;
        let jellyfin = info.is_jellyfin();
        debug!(product = ?info.product_name, jellyfin, "Detected server flavor");
        Ok(jellyfin)
    }
}

//! Request execution with an attempt budget
//!
//! One logical call is at most `max_attempts` HTTP attempts. Connection and
//! timeout failures move on to the next attempt immediately. A 401 with
//! password login configured triggers a login and also spends an attempt.
//! Every other response, whatever its status, is final. Running out of
//! attempts is a connectivity error, even when the last answer was a 401.

use crate::{
    Result,
    config::ConnectorConfig,
    session::{
        AuthManager, ContextId, SessionPool,
        network::RequestBody,
        url::UrlBuilder,
    },
    types::{ApiResponse, BodyEncoding, UrlOptions},
};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why the previous attempt did not produce a final response
#[derive(Debug)]
enum AttemptFailure {
    Transport { reason: String, timed_out: bool },
    Unauthorized,
}

/// Runs logical HTTP calls against the server
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    config: Arc<ConnectorConfig>,
    pool: Arc<SessionPool>,
    urls: Arc<UrlBuilder>,
    auth: Arc<AuthManager>,
}

impl RequestExecutor {
    /// Create an executor over shared connector state
    pub fn new(
        config: Arc<ConnectorConfig>,
        pool: Arc<SessionPool>,
        urls: Arc<UrlBuilder>,
        auth: Arc<AuthManager>,
    ) -> Self {
        Self {
            config,
            pool,
            urls,
            auth,
        }
    }

    /// Execute one logical call
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        options: &UrlOptions,
        body: &RequestBody,
    ) -> Result<ApiResponse> {
        self.auth.login_if_needed().await;

        let context = ContextId::current();
        let max_attempts = self.config.network.max_attempts;
        let mut last_url = String::new();
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            let credentials = self.auth.credentials().await;
            let lease = self.pool.acquire(context, credentials.token.as_deref())?;
            let url = self.urls.build(path, options, &credentials);
            debug!(%method, url = %url, attempt, context = %context, "Sending request");

            match lease.session().send(method.clone(), &url, body).await {
                Ok(raw) if raw.status == 401 && self.config.has_password_login() => {
                    warn!(url = %url, attempt, "Request unauthorized, logging in again");
                    self.auth.login().await;
                    drop(lease);
                    last_failure = Some(AttemptFailure::Unauthorized);
                }
                Ok(raw) => {
                    drop(lease);
                    debug!(url = %url, status = raw.status, "Request completed");
                    return Ok(ApiResponse::new(raw.status, raw.body, url));
                }
                Err(e) => {
                    drop(lease);
                    let timed_out = e.is_timeout();
                    let error = crate::Error::from(e);
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        timed_out,
                        "Request failed: {}",
                        crate::error::format_error(&error)
                    );
                    last_failure = Some(AttemptFailure::Transport {
                        reason: crate::error::format_error(&error),
                        timed_out,
                    });
                }
            }
            last_url = url;
        }

        Err(match last_failure {
            Some(AttemptFailure::Unauthorized) => crate::Error::connectivity(
                last_url,
                max_attempts,
                "server kept answering 401".to_string(),
                false,
            ),
            Some(AttemptFailure::Transport { reason, timed_out }) => {
                crate::Error::connectivity(last_url, max_attempts, reason, timed_out)
            }
            None => crate::Error::internal("request made no attempts"),
        })
    }

    /// GET and return the raw response
    pub async fn get(&self, path: &str, options: &UrlOptions) -> Result<ApiResponse> {
        self.execute(Method::GET, path, options, &RequestBody::Empty)
            .await
    }

    /// GET and decode the body as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &UrlOptions,
    ) -> Result<T> {
        self.get(path, options).await?.json()
    }

    /// POST `data` with the given encoding
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &B,
        encoding: BodyEncoding,
        options: &UrlOptions,
    ) -> Result<ApiResponse> {
        let body = RequestBody::encode(data, encoding)?;
        self.execute(Method::POST, path, options, &body).await
    }

    /// DELETE and return the status code
    pub async fn delete(&self, path: &str, options: &UrlOptions) -> Result<u16> {
        let response = self
            .execute(Method::DELETE, path, options, &RequestBody::Empty)
            .await?;
        Ok(response.status)
    }
}

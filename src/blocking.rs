//! Blocking call surface
//!
//! [`BlockingConnector`] drives the async core on its own current-thread
//! runtime. It runs every call in a dedicated execution context, so it never
//! shares a pooled session with async callers of the same [`Connector`].
//!
//! Messages can be sent over a push socket that the async side connected.
//! Connecting and receiving stay on the async [`Connector`]: the receive loop
//! needs a runtime that keeps running between calls.

use crate::{
    Result,
    config::ConnectorConfig,
    connector::Connector,
    session::{ContextId, ExecutionContext},
    types::{ApiResponse, BodyEncoding, LoginResult, UrlOptions},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};

/// Blocking client for one server
#[derive(Debug)]
pub struct BlockingConnector {
    inner: Connector,
    runtime: Runtime,
    context: ExecutionContext,
}

impl BlockingConnector {
    /// Create a blocking connector from configuration
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Self::from_connector(Connector::new(config)?)
    }

    /// Wrap an existing connector, sharing its credentials
    pub fn from_connector(inner: Connector) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner,
            runtime,
            context: ExecutionContext::new(),
        })
    }

    /// Context every blocking call runs in
    pub fn context(&self) -> ContextId {
        self.context.id()
    }

    /// The async connector underneath
    pub fn inner(&self) -> &Connector {
        &self.inner
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if Handle::try_current().is_ok() {
            return Err(crate::Error::internal(
                "blocking connector cannot be used from inside an async runtime",
            ));
        }
        self.runtime.block_on(self.context.scope(fut))
    }

    /// GET `path` and return status and body
    pub fn get(&self, path: &str, options: &UrlOptions) -> Result<ApiResponse> {
        self.block_on(self.inner.get(path, options))
    }

    /// GET `path` and decode the body as JSON
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, options: &UrlOptions) -> Result<T> {
        self.block_on(self.inner.get_json(path, options))
    }

    /// POST `data` and return status and body
    pub fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &B,
        encoding: BodyEncoding,
        options: &UrlOptions,
    ) -> Result<ApiResponse> {
        self.block_on(self.inner.post(path, data, encoding, options))
    }

    /// POST `data` and decode the response body as JSON
    pub fn post_json<B, T>(
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
        self.block_on(self.inner.post_json(path, data, encoding, options))
    }

    /// DELETE `path` and return the status code
    pub fn delete(&self, path: &str, options: &UrlOptions) -> Result<u16> {
        self.block_on(self.inner.delete(path, options))
    }

    /// Build the URL a request for `path` would use
    pub fn url(&self, path: &str, options: &UrlOptions) -> Result<String> {
        self.block_on(async { Ok(self.inner.url(path, options).await) })
    }

    /// Server information from `/System/Info`
    pub fn info(&self) -> Result<serde_json::Value> {
        self.block_on(self.inner.info())
    }

    /// Whether the server is a Jellyfin build
    pub fn is_jellyfin(&self) -> Result<bool> {
        self.block_on(self.inner.is_jellyfin())
    }

    /// Log in with the configured username and password
    pub fn login(&self) -> Result<LoginResult> {
        self.block_on(async { Ok(self.inner.login().await) })
    }

    /// Send a text message over the connected push socket
    pub fn send_push(&self, text: impl Into<String>) -> Result<()> {
        self.block_on(self.inner.push().send(text))
    }
}

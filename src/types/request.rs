//! Request type definitions
//!
//! Options that shape a request URL and the encoding of request bodies.

use serde::{Deserialize, Serialize};

/// How a POST payload is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded`
    Form,
    /// JSON encoded string body
    #[default]
    Json,
}

/// Options for building a request URL
///
/// The defaults attach the API key and device id and use the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    /// Use the push socket scheme (`ws`/`wss`)
    pub push: bool,
    /// Prefer the public facing URL when one is configured
    pub remote: bool,
    /// Append `api_key` and `deviceId`
    pub attach_api_key: bool,
    /// Append `userId`
    pub attach_user_id: bool,
    /// User id to use instead of the resolved one
    pub user_id: Option<String>,
    /// Additional query parameters, in insertion order
    pub query: Vec<(String, String)>,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            push: false,
            remote: false,
            attach_api_key: true,
            attach_user_id: false,
            user_id: None,
            query: Vec::new(),
        }
    }
}

impl UrlOptions {
    /// Create new URL options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the push socket scheme
    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Prefer the public facing URL
    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Attach API key and device id
    pub fn with_api_key(mut self, attach: bool) -> Self {
        self.attach_api_key = attach;
        self
    }

    /// Attach the resolved user id
    pub fn with_user_id(mut self, attach: bool) -> Self {
        self.attach_user_id = attach;
        self
    }

    /// Attach the given user id instead of the resolved one
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.attach_user_id = true;
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

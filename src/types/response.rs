//! Response type definitions
//!
//! Raw responses handed back to collaborators and the few server payloads the
//! session layer itself reads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Raw HTTP response: status and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// URL the response came from
    pub url: String,
}

impl ApiResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            url: url.into(),
        }
    }

    /// Check if the response indicates success (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    ///
    /// A body that does not decode yields [`Error::Decode`](crate::Error::Decode)
    /// carrying the status and raw body.
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| crate::Error::decode(self.status, self.body.as_str(), self.url.as_str(), &e))
    }
}

/// Body of `POST /Users/AuthenticateByName`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationResult {
    /// Access token for subsequent requests
    #[serde(rename = "AccessToken")]
    pub access_token: Option<String>,

    /// The authenticated user
    #[serde(rename = "User")]
    pub user: Option<AuthenticatedUser>,
}

/// User part of an authentication result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Server side user id
    #[serde(rename = "Id")]
    pub id: Option<String>,

    /// Display name
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// Body of `GET /System/Info/Public`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PublicSystemInfo {
    /// Product name, e.g. "Emby Server" or "Jellyfin Server"
    #[serde(rename = "ProductName", default)]
    pub product_name: Option<String>,

    /// Server name
    #[serde(rename = "ServerName", default)]
    pub server_name: Option<String>,

    /// Server version
    #[serde(rename = "Version", default)]
    pub version: Option<String>,

    /// Server id
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

impl PublicSystemInfo {
    /// Whether the product name identifies a Jellyfin server
    pub fn is_jellyfin(&self) -> bool {
        self.product_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains("jellyfin"))
    }
}

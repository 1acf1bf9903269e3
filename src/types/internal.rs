//! Internal type definitions
//!
//! Outcomes the session layer records for itself and for tests.

use chrono::{DateTime, Utc};

/// Outcome of a login attempt
///
/// The request path discards it; a failed login only shows up as an empty
/// token on later requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoginResult {
    /// A token was obtained and stored
    pub success: bool,
    /// An authenticate call was actually issued
    pub performed: bool,
}

impl LoginResult {
    /// Login was skipped (no username, or another login in flight)
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Login call was issued and produced a token
    pub fn succeeded() -> Self {
        Self {
            success: true,
            performed: true,
        }
    }

    /// Login call was issued but no token came back
    pub fn failed() -> Self {
        Self {
            success: false,
            performed: true,
        }
    }
}

/// Snapshot of the authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Access token from the last successful login
    pub token: Option<String>,
    /// User id resolved by the last successful login
    pub user_id: Option<String>,
    /// When the last successful login happened
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl AuthState {
    /// Whether an access token is present
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

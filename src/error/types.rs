//! Connector error types
//!
//! Provides error classification for the transport layer: which failures are
//! absorbed by the retry loop and which reach the caller.

use thiserror::Error;

/// Main error type for the connector
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request errors that are not retried
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error in {field}: {message}")]
    Config {
        /// The configuration field that has an error
        field: String,
        /// Error message describing the issue
        message: String,
    },

    /// Attempt budget exhausted on transport failures
    #[error("Server at {url} is probably down: no response after {attempts} attempts ({reason})")]
    Connectivity {
        /// URL of the last attempt
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Description of the last transport failure
        reason: String,
        /// Whether the last failure was a timeout
        timed_out: bool,
    },

    /// Response body was not the JSON the caller expected
    #[error("Failed to decode response from {url} (status {status}): {message}; body: {body}")]
    Decode {
        /// HTTP status of the response
        status: u16,
        /// Raw response body
        body: String,
        /// Request URL
        url: String,
        /// Decoder message
        message: String,
    },

    /// Push socket errors
    #[error("Push socket error: {message}")]
    Push {
        /// Error message describing the socket issue
        message: String,
    },

    /// Send attempted without a live push socket
    #[error("Push socket is not connected")]
    PushNotConnected,

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
        /// Additional context about where the error occurred
        context: Option<String>,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

fn has_io_source(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

impl Error {
    /// Create a configuration error
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a connectivity error after the attempt budget is spent
    pub fn connectivity<S: Into<String>>(
        url: S,
        attempts: u32,
        reason: S,
        timed_out: bool,
    ) -> Self {
        Self::Connectivity {
            url: url.into(),
            attempts,
            reason: reason.into(),
            timed_out,
        }
    }

    /// Create a decode error carrying the raw response for diagnostics
    pub fn decode(
        status: u16,
        body: impl Into<String>,
        url: impl Into<String>,
        source: &serde_json::Error,
    ) -> Self {
        Self::Decode {
            status,
            body: body.into(),
            url: url.into(),
            message: source.to_string(),
        }
    }

    /// Create a push socket error
    pub fn push<S: Into<String>>(message: S) -> Self {
        Self::Push {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Check if this is a transient transport failure
    ///
    /// Only connection-level and timeout failures qualify, including a
    /// connection dropped while the body was still being read. Everything
    /// the server actually answered is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || (e.is_body() && has_io_source(e))
            }
            _ => false,
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout(),
            Error::Connectivity { timed_out, .. } => *timed_out,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(..) => "http",
            Error::Json(..) => "json",
            Error::Io(..) => "io",
            Error::Config { .. } => "config",
            Error::Connectivity { .. } => "connectivity",
            Error::Decode { .. } => "decode",
            Error::Push { .. } => "push",
            Error::PushNotConnected => "push",
            Error::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("server.url", "missing");
        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error in server.url: missing");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_connectivity_error_names_server() {
        let err = Error::connectivity("http://media:8096/emby/Items", 3, "timed out", true);
        let message = err.to_string();
        assert!(message.contains("probably down"));
        assert!(message.contains("http://media:8096/emby/Items"));
        assert!(message.contains("3 attempts"));
        assert!(err.is_timeout());
        assert_eq!(err.category(), "connectivity");
    }

    #[test]
    fn test_decode_error_keeps_status_and_body() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = Error::decode(200, "not json", "http://media/emby/Items", &source);

        match &err {
            Error::Decode { status, body, .. } => {
                assert_eq!(*status, 200);
                assert_eq!(body, "not json");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("status 200"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_push_errors() {
        assert_eq!(
            Error::PushNotConnected.to_string(),
            "Push socket is not connected"
        );
        let err = Error::push("handshake refused");
        assert!(err.to_string().contains("handshake refused"));
        assert_eq!(err.category(), "push");
    }

    #[test]
    fn test_io_source_detection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let wrapped = Error::Io(io);
        assert!(has_io_source(&wrapped));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!has_io_source(&Error::Json(json)));
    }
}

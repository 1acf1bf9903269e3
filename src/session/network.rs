//! HTTP sessions and TLS trust
//!
//! This module builds the pooled HTTP sessions: a `reqwest` client carrying
//! the device `Authorization` header, the configured trust roots and the
//! request timeout, plus the access token once one is known.

use crate::{
    Result,
    config::{ConnectorConfig, NetworkSettings},
    session::ContextId,
    types::BodyEncoding,
    utils::version,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Header carrying the session access token
pub const TOKEN_HEADER: &str = "X-MediaBrowser-Token";

/// Certificate trust shared by HTTP sessions and the push socket
#[derive(Debug, Clone)]
pub struct TlsTrust {
    /// Extra root certificates (PEM)
    pub pem: Option<Vec<u8>>,
    /// Verify server certificates
    pub verify: bool,
}

impl TlsTrust {
    /// Load trust material from network settings
    pub fn from_settings(settings: &NetworkSettings) -> Result<Self> {
        let pem = match &settings.ca_cert {
            Some(path) => Some(std::fs::read(path).map_err(|e| {
                crate::Error::config(
                    "network.ca_cert",
                    &format!("Failed to read CA certificate {:?}: {}", path, e),
                )
            })?),
            None => None,
        };

        if let Some(pem) = &pem {
            reqwest::Certificate::from_pem(pem).map_err(|e| {
                crate::Error::config("network.ca_cert", &format!("Invalid CA certificate: {}", e))
            })?;
        }

        Ok(Self {
            pem,
            verify: settings.verify_tls,
        })
    }

    /// Trust roots for the push socket
    pub fn native_connector(&self) -> Result<native_tls::TlsConnector> {
        let mut builder = native_tls::TlsConnector::builder();
        if let Some(pem) = &self.pem {
            let cert = native_tls::Certificate::from_pem(pem)
                .map_err(|e| crate::Error::push(format!("Invalid CA certificate: {}", e)))?;
            builder.add_root_certificate(cert);
        }
        builder.danger_accept_invalid_certs(!self.verify);
        builder
            .build()
            .map_err(|e| crate::Error::push(format!("Failed to build TLS connector: {}", e)))
    }
}

impl Default for TlsTrust {
    fn default() -> Self {
        Self {
            pem: None,
            verify: true,
        }
    }
}

/// Settings every pooled session is created with
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Client and device display name
    pub client_name: String,
    /// Device id
    pub device_id: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl SessionSettings {
    /// Extract session settings from the connector configuration
    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self {
            client_name: config.auth.client_name.clone(),
            device_id: config.auth.device_id.clone(),
            timeout: config.network.timeout,
        }
    }

    /// Value of the `Authorization` header identifying this client
    pub fn authorization(&self) -> String {
        format!(
            "MediaBrowser Client=\"{0}\",Device=\"{0}\",DeviceId=\"{1}\",Version=\"{2}\"",
            self.client_name,
            self.device_id,
            version::get_version()
        )
    }
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` body
    Form(String),
    /// `application/json` body
    Json(String),
}

impl RequestBody {
    /// Encode `data` with the requested encoding
    ///
    /// Form encoding takes the top-level fields of a JSON object; string
    /// values are sent as-is, anything else in its JSON text form.
    pub fn encode<B: Serialize + ?Sized>(data: &B, encoding: BodyEncoding) -> Result<Self> {
        match encoding {
            BodyEncoding::Json => Ok(Self::Json(serde_json::to_string(data)?)),
            BodyEncoding::Form => {
                let value = serde_json::to_value(data)?;
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                match value {
                    serde_json::Value::Object(fields) => {
                        for (key, value) in fields {
                            match value {
                                serde_json::Value::String(s) => form.append_pair(&key, &s),
                                serde_json::Value::Null => form.append_pair(&key, ""),
                                other => form.append_pair(&key, &other.to_string()),
                            };
                        }
                    }
                    serde_json::Value::Null => {}
                    _ => {
                        return Err(crate::Error::internal(
                            "Form bodies must be built from an object",
                        ));
                    }
                }
                Ok(Self::Form(form.finish()))
            }
        }
    }
}

/// Status and body text of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// One pooled HTTP session bound to an execution context
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    context: ContextId,
    token: RwLock<Option<String>>,
    closed: AtomicBool,
}

impl HttpSession {
    /// Create a fully initialized session
    pub fn new(
        context: ContextId,
        settings: &SessionSettings,
        trust: &TlsTrust,
        token: Option<&str>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let authorization = HeaderValue::from_str(&settings.authorization()).map_err(|e| {
            crate::Error::config("auth", &format!("Invalid authorization header: {}", e))
        })?;
        headers.insert(AUTHORIZATION, authorization);

        let mut builder = Client::builder()
            .user_agent(version::user_agent())
            .default_headers(headers)
            .timeout(settings.timeout);

        if let Some(pem) = &trust.pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }
        if !trust.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;
        debug!(context = %context, "Created HTTP session");

        Ok(Self {
            client,
            context,
            token: RwLock::new(token.filter(|t| !t.is_empty()).map(str::to_string)),
            closed: AtomicBool::new(false),
        })
    }

    /// Context this session belongs to
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Replace the access token sent with every request
    pub fn set_token(&self, token: &str) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.to_string()).filter(|t| !t.is_empty());
    }

    /// Current access token
    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Issue one request and read the whole body
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
    ) -> std::result::Result<RawResponse, reqwest::Error> {
        let mut request = self.client.request(method, url);

        if let Some(token) = self.token() {
            request = request.header(TOKEN_HEADER, token);
        }

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Form(form) => request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(form.clone()),
            RequestBody::Json(json) => request
                .header(CONTENT_TYPE, "application/json")
                .body(json.clone()),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }

    /// Mark the session closed; returns false if it already was
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            debug!(context = %self.context, "Closed HTTP session");
        }
        first
    }

    /// Whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> SessionSettings {
        SessionSettings {
            client_name: "tests".to_string(),
            device_id: "dev-1".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_authorization_header() {
        let value = settings().authorization();
        assert!(value.starts_with("MediaBrowser Client=\"tests\",Device=\"tests\",DeviceId=\"dev-1\""));
        assert!(value.contains(&format!("Version=\"{}\"", version::VERSION)));
    }

    #[test]
    fn test_form_body_encoding() {
        let body = RequestBody::encode(
            &json!({"username": "alice", "pw": "p&ss", "limit": 3}),
            BodyEncoding::Form,
        )
        .unwrap();
        match body {
            RequestBody::Form(form) => {
                assert!(form.contains("username=alice"));
                assert!(form.contains("pw=p%26ss"));
                assert!(form.contains("limit=3"));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_form_body_rejects_non_object() {
        assert!(RequestBody::encode(&json!([1, 2]), BodyEncoding::Form).is_err());
    }

    #[test]
    fn test_json_body_encoding() {
        let body = RequestBody::encode(&json!({"Name": "x"}), BodyEncoding::Json).unwrap();
        assert_eq!(body, RequestBody::Json(r#"{"Name":"x"}"#.to_string()));
    }

    #[test]
    fn test_missing_ca_cert_is_config_error() {
        let mut network = NetworkSettings::default();
        network.ca_cert = Some("/definitely/not/here.pem".into());
        let err = TlsTrust::from_settings(&network).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_close_is_idempotent() {
        let session =
            HttpSession::new(ContextId::for_thread(), &settings(), &TlsTrust::default(), None).unwrap();
        assert!(session.close());
        assert!(!session.close());
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_send_carries_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/emby/System/Info"))
            .and(header(TOKEN_HEADER, "tok"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let session =
            HttpSession::new(ContextId::for_thread(), &settings(), &TlsTrust::default(), Some("tok"))
                .unwrap();
        let response = session
            .send(
                Method::GET,
                &format!("{}/emby/System/Info", server.uri()),
                &RequestBody::Empty,
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{}");
    }

    #[tokio::test]
    async fn test_token_update_applies_to_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(TOKEN_HEADER, "fresh"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session =
            HttpSession::new(ContextId::for_thread(), &settings(), &TlsTrust::default(), None).unwrap();
        assert!(session.token().is_none());
        session.set_token("fresh");

        let response = session
            .send(Method::GET, &server.uri(), &RequestBody::Empty)
            .await
            .unwrap();
        assert_eq!(response.status, 204);
    }
}

//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use emby_connector::{Connector, ConnectorConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test configuration factory
pub struct TestConfig;

impl TestConfig {
    /// Static API key configuration
    pub fn api_key(url: &str) -> ConnectorConfig {
        ConnectorConfig::new(url)
            .with_api_key("test-key", "user-1")
            .with_device_id("test-device")
            .with_timeout(Duration::from_secs(5))
    }

    /// Username/password configuration
    pub fn password(url: &str) -> ConnectorConfig {
        ConnectorConfig::new(url)
            .with_credentials("alice", "secret")
            .with_device_id("test-device")
            .with_timeout(Duration::from_secs(5))
    }

    /// API key plus username/password, so 401s trigger a fresh login
    pub fn api_key_and_password(url: &str) -> ConnectorConfig {
        Self::api_key(url).with_credentials("alice", "secret")
    }

    /// Connector for the given configuration
    pub fn connector(config: ConnectorConfig) -> Connector {
        Connector::new(config).unwrap()
    }
}

/// Test data factory
pub struct MockData;

impl MockData {
    /// Successful `/Users/AuthenticateByName` body
    pub fn login_response() -> serde_json::Value {
        json!({
            "AccessToken": "session-token",
            "ServerId": "server-1",
            "User": {"Id": "user-9", "Name": "alice"}
        })
    }

    /// `/System/Info/Public` body
    pub fn public_info(product: &str) -> serde_json::Value {
        json!({
            "LocalAddress": "http://127.0.0.1:8096",
            "ServerName": "test",
            "Version": "4.8.0.0",
            "ProductName": product,
            "Id": "server-1"
        })
    }

    /// `/System/Info` body
    pub fn system_info() -> serde_json::Value {
        json!({
            "ServerName": "test",
            "Version": "4.8.0.0",
            "OperatingSystem": "Linux",
            "Id": "server-1"
        })
    }
}

/// Mock server factory
pub struct MockServerFactory;

impl MockServerFactory {
    /// Create new mock server
    pub async fn new() -> MockServer {
        MockServer::start().await
    }

    /// Login endpoint answering with a token, expected `times` times
    pub async fn setup_login(server: &MockServer, times: u64) {
        Mock::given(method("POST"))
            .and(path("/emby/Users/AuthenticateByName"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockData::login_response()))
            .expect(times)
            .mount(server)
            .await;
    }

    /// Public info endpoint reporting `product`, expected `times` times
    pub async fn setup_public_info(server: &MockServer, product: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path("/emby/System/Info/Public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockData::public_info(product)))
            .expect(times)
            .mount(server)
            .await;
    }
}

/// Test utilities
pub struct TestUtils;

impl TestUtils {
    /// Initialize test logging
    pub fn init_logger() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    }

    /// Wait for async condition
    pub async fn wait_for_condition<F, Fut>(
        condition: F,
        timeout: std::time::Duration,
    ) -> anyhow::Result<()>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        use tokio::time::{sleep, timeout as tokio_timeout};

        tokio_timeout(timeout, async {
            loop {
                if condition().await {
                    return;
                }
                sleep(std::time::Duration::from_millis(20)).await;
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("Wait condition timeout"))
    }
}

//! Blocking surface integration tests
//!
//! The blocking connector drives the same core from synchronous code, with
//! its own execution context.

mod common;

use common::{MockData, TestConfig};
use emby_connector::{BlockingConnector, BodyEncoding, ContextId, Error, UrlOptions};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_server(rt: &Runtime) -> MockServer {
    rt.block_on(MockServer::start())
}

#[test]
fn test_blocking_get_json_matches_async() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/emby/System/Info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockData::system_info()))
            .expect(2)
            .mount(&server),
    );

    let connector = TestConfig::connector(TestConfig::api_key(&server.uri()));
    let blocking = connector.blocking().unwrap();

    let sync_info = blocking.info().unwrap();
    let async_info = rt.block_on(connector.info()).unwrap();
    assert_eq!(sync_info, async_info);

    assert_ne!(blocking.context(), ContextId::for_thread());
    let stats = connector.pool_stats();
    assert_eq!(stats.sessions_created, 2);
    assert_eq!(stats.live_sessions, 0);
}

#[test]
fn test_blocking_login_and_requests() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);
    rt.block_on(async {
        Mock::given(method("POST"))
            .and(path("/emby/Users/AuthenticateByName"))
            .respond_with(ResponseTemplate::new(200).set_body_json(MockData::login_response()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emby/Items/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Id": "1"})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/emby/Items/1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
    });

    let blocking = BlockingConnector::new(TestConfig::password(&server.uri())).unwrap();

    let item: serde_json::Value = blocking
        .post_json("/Items/1", &json!({"Name": "x"}), BodyEncoding::Json, &UrlOptions::new())
        .unwrap();
    assert_eq!(item["Id"], "1");
    assert_eq!(blocking.delete("/Items/1", &UrlOptions::new()).unwrap(), 204);

    let url = blocking.url("/Items", &UrlOptions::new()).unwrap();
    assert!(url.contains("api_key=session-token"));
}

#[test]
fn test_blocking_reports_connectivity() {
    let blocking = BlockingConnector::new(TestConfig::api_key("http://127.0.0.1:1")).unwrap();
    let err = blocking.get("/Items", &UrlOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Connectivity { attempts: 3, .. }));
}

//! Integration tests for connectivity checks and entity snapshots

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldsync_api::client::ApiClient;
use fieldsync_api::HttpRemoteCatalog;
use fieldsync_core::ports::IRemoteCatalog;

use crate::common;

#[tokio::test]
async fn test_ping_succeeds() {
    let (_server, catalog) = common::setup_catalog_mock().await;

    catalog.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_fails_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let result = catalog.ping().await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_ping_fails_when_unreachable() {
    // Port 1 is never listening; the connection is refused immediately
    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url("http://127.0.0.1:1"));

    let result = catalog.ping().await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_fetch_projects_from_envelope() {
    let (_server, catalog) = common::setup_catalog_mock().await;

    let projects = catalog.fetch_projects().await.unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].uid().as_str(), "proj-001");
    assert_eq!(projects[0].name(), "Harbour Bridge");
    assert_eq!(projects[0].reference(), Some("REF-2201"));
    assert!(projects[0].remote_updated_at().is_some());
    assert_eq!(projects[1].address(), Some("Lowfield 3"));
    assert!(projects[1].status().is_none());
}

#[tokio::test]
async fn test_fetch_defects_from_bare_array() {
    let (_server, catalog) = common::setup_catalog_mock().await;

    let defects = catalog.fetch_defects().await.unwrap();

    assert_eq!(defects.len(), 2);
    assert_eq!(defects[0].uid().as_str(), "def-010");
    assert_eq!(defects[0].project_uid().as_str(), "proj-001");
    assert_eq!(defects[0].severity(), Some("high"));
    assert!(defects[1].severity().is_none());
}

#[tokio::test]
async fn test_fetch_events() {
    let (_server, catalog) = common::setup_catalog_mock().await;

    let events = catalog.fetch_events().await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].defect_uid().as_str(), "def-010");
    assert_eq!(events[0].description(), "Re-inspected after repair");
    assert!(events[0].occurred_at().is_some());
}

#[tokio::test]
async fn test_malformed_snapshot_rows_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"uid": "proj-001", "name": "Harbour Bridge"},
                {"uid": "   ", "name": "Blank uid"},
                {"uid": "proj-003", "name": ""}
            ]
        })))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let projects = catalog.fetch_projects().await.unwrap();

    // The two invalid rows drop out; the valid one survives
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].uid().as_str(), "proj-001");
}

#[tokio::test]
async fn test_snapshot_fetch_fails_on_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let result = catalog.fetch_projects().await;

    assert!(result.is_err());
}

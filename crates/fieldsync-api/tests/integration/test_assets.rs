//! Integration tests for asset tree retrieval, URL resolution, and download

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldsync_api::client::ApiClient;
use fieldsync_api::HttpRemoteCatalog;
use fieldsync_core::domain::newtypes::{EntityUid, FileId};
use fieldsync_core::ports::IRemoteCatalog;

use crate::common;

fn uid(s: &str) -> EntityUid {
    EntityUid::new(s.to_string()).unwrap()
}

fn file_id(s: &str) -> FileId {
    FileId::new(s.to_string()).unwrap()
}

#[tokio::test]
async fn test_fetch_asset_tree_passes_payload_through() {
    let (server, catalog) = common::setup_catalog_mock().await;

    let tree = serde_json::json!({
        "project_digital_asset_tree": {
            "node_id": "root",
            "node_type": "folder",
            "children": [
                {
                    "node_id": "n1",
                    "node_name": "plan.pdf",
                    "file_id": "f-001",
                    "file_type": "pdf"
                }
            ]
        }
    });
    common::mount_asset_tree(&server, "proj-001", tree.clone()).await;

    let fetched = catalog.fetch_asset_tree(&uid("proj-001")).await.unwrap();

    // The transport layer must not reshape the payload
    assert_eq!(fetched, tree);
}

#[tokio::test]
async fn test_fetch_asset_tree_fails_on_missing_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/proj-404/asset-tree"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let result = catalog.fetch_asset_tree(&uid("proj-404")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_resolve_download_url() {
    let (server, catalog) = common::setup_catalog_mock().await;
    common::mount_download_url(&server, "f-001", "https://cdn.example.com/signed/f-001").await;

    let url = catalog.resolve_download_url(&file_id("f-001")).await.unwrap();

    assert_eq!(url, "https://cdn.example.com/signed/f-001");
}

#[tokio::test]
async fn test_resolve_download_url_fails_on_unknown_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/f-404/download-url"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let result = catalog.resolve_download_url(&file_id("f-404")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_resolve_download_url_rejects_blank_url() {
    let (server, catalog) = common::setup_catalog_mock().await;
    common::mount_download_url(&server, "f-002", "   ").await;

    let result = catalog.resolve_download_url(&file_id("f-002")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_download_returns_body_bytes() {
    let (server, catalog) = common::setup_catalog_mock().await;
    let body = b"%PDF-1.7 fake plan content";
    common::mount_content(&server, "/content/f-001", body).await;

    let url = format!("{}/content/f-001", server.uri());
    let bytes = catalog.download(&url).await.unwrap();

    assert_eq!(bytes, body);
}

#[tokio::test]
async fn test_download_fails_on_expired_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/gone"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));
    let url = format!("{}/content/gone", server.uri());
    let result = catalog.download(&url).await;

    assert!(result.is_err());
}

//! Shared test helpers for inspection API integration tests
//!
//! Provides wiremock-based mock server setup for the backend endpoints.
//! Each helper mounts the necessary mock endpoints and returns a catalog
//! pointing at the mock server.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldsync_api::client::ApiClient;
use fieldsync_api::HttpRemoteCatalog;

/// Sets up a mock server with the standard catalog endpoints and returns
/// a (MockServer, HttpRemoteCatalog) tuple.
///
/// Pre-configured endpoints:
/// - GET /health → ok
/// - GET /projects → two projects in a data envelope
/// - GET /defects → two defects as a bare array
/// - GET /inspection-events → one event in a data envelope
pub async fn setup_catalog_mock() -> (MockServer, HttpRemoteCatalog) {
    let server = MockServer::start().await;

    // Mock GET /health - connectivity probe
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok"
        })))
        .mount(&server)
        .await;

    // Mock GET /projects - enveloped snapshot
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "uid": "proj-001",
                    "name": "Harbour Bridge",
                    "reference": "REF-2201",
                    "status": "active",
                    "updatedAt": "2026-02-01T08:30:00Z"
                },
                {
                    "uid": "proj-002",
                    "name": "River Tunnel",
                    "address": "Lowfield 3"
                }
            ]
        })))
        .mount(&server)
        .await;

    // Mock GET /defects - bare array snapshot
    Mock::given(method("GET"))
        .and(path("/defects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "uid": "def-010",
                "projectUid": "proj-001",
                "title": "Cracked weld on girder 4",
                "severity": "high"
            },
            {
                "uid": "def-011",
                "projectUid": "proj-002",
                "title": "Seepage at segment 12"
            }
        ])))
        .mount(&server)
        .await;

    // Mock GET /inspection-events - enveloped snapshot
    Mock::given(method("GET"))
        .and(path("/inspection-events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "uid": "ev-100",
                    "defectUid": "def-010",
                    "description": "Re-inspected after repair",
                    "eventType": "inspection",
                    "occurredAt": "2026-03-15T14:00:00Z"
                }
            ]
        })))
        .mount(&server)
        .await;

    let catalog = HttpRemoteCatalog::new(ApiClient::with_base_url(server.uri()));

    (server, catalog)
}

/// Mounts an asset tree endpoint for one project with the given payload.
pub async fn mount_asset_tree(server: &MockServer, project_uid: &str, tree: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/projects/{project_uid}/asset-tree")))
        .respond_with(ResponseTemplate::new(200).set_body_json(tree))
        .mount(server)
        .await;
}

/// Mounts a download URL resolution endpoint for one file id.
pub async fn mount_download_url(server: &MockServer, file_id: &str, url: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{file_id}/download-url")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "downloadUrl": url
        })))
        .mount(server)
        .await;
}

/// Mounts raw file content at the given path.
pub async fn mount_content(server: &MockServer, content_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(content_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

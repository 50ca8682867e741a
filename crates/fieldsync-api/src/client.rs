//! Inspection API HTTP client
//!
//! Provides a typed HTTP client for the remote inspection backend. Handles
//! authentication headers, JSON deserialization, endpoint construction,
//! and HTTP status mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fieldsync_api::client::ApiClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::with_base_url("https://inspect.enigmora.com/api/v1");
//! client.ping().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::dto::{DefectDto, DownloadUrlDto, EventDto, ListPayload, ProjectDto};
use crate::ApiError;

/// Retry-after hint used when the server sends none
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// HTTP client for inspection API calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. No method retries internally; a failure surfaces to the
/// caller, who decides what it means for the sync pass.
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without trailing slash
    base_url: String,
    /// Optional bearer token
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a new ApiClient
    ///
    /// # Arguments
    /// * `base_url` - API base URL (a trailing slash is tolerated)
    /// * `auth_token` - Bearer token, if the deployment requires one
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    /// Returns `ApiError::NetworkError` if the underlying client cannot be
    /// built.
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: trim_trailing_slash(base_url.into()),
            auth_token,
        })
    }

    /// Creates a new ApiClient with default settings (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
            auth_token: None,
        }
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization
    /// header when a token is configured.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `path` - API path relative to the base URL (e.g., "/projects")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a GET request and deserializes the JSON response body
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        let response = check_status(response, path)?;
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {path} response: {e}"))
        })
    }

    /// Checks connectivity to the API
    ///
    /// Any 2xx from the health endpoint counts; the body is ignored.
    pub async fn ping(&self) -> Result<(), ApiError> {
        debug!("Pinging /health");
        let response = self.request(Method::GET, "/health").send().await?;
        check_status(response, "/health")?;
        Ok(())
    }

    /// Fetches the full project snapshot
    pub async fn list_projects(&self) -> Result<Vec<ProjectDto>, ApiError> {
        debug!("Fetching project snapshot");
        let payload: ListPayload<ProjectDto> = self.get_json("/projects").await?;
        Ok(payload.into_vec())
    }

    /// Fetches the full defect snapshot
    pub async fn list_defects(&self) -> Result<Vec<DefectDto>, ApiError> {
        debug!("Fetching defect snapshot");
        let payload: ListPayload<DefectDto> = self.get_json("/defects").await?;
        Ok(payload.into_vec())
    }

    /// Fetches the full inspection event snapshot
    pub async fn list_events(&self) -> Result<Vec<EventDto>, ApiError> {
        debug!("Fetching inspection event snapshot");
        let payload: ListPayload<EventDto> = self.get_json("/inspection-events").await?;
        Ok(payload.into_vec())
    }

    /// Fetches a project's digital asset tree as raw JSON
    ///
    /// The payload is returned untouched; tree shapes vary too much across
    /// backend versions to deserialize at the transport layer.
    pub async fn asset_tree(&self, project_uid: &str) -> Result<Value, ApiError> {
        debug!(project_uid, "Fetching asset tree");
        let path = format!("/projects/{project_uid}/asset-tree");
        self.get_json(&path).await
    }

    /// Resolves the short-lived download URL for a file id
    pub async fn download_url(&self, file_id: &str) -> Result<String, ApiError> {
        debug!(file_id, "Resolving download URL");
        let path = format!("/files/{file_id}/download-url");
        let dto: DownloadUrlDto = self.get_json(&path).await?;

        if dto.download_url.trim().is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "Empty download URL for file {file_id}"
            )));
        }
        Ok(dto.download_url)
    }

    /// Downloads content from an already-resolved absolute URL
    ///
    /// Resolved URLs are pre-signed and may point outside the API base, so
    /// this bypasses `request()` and never attaches the bearer token.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response, url)?;
        let bytes = response.bytes().await?;

        debug!(url, size = bytes.len(), "Downloaded content");
        Ok(bytes.to_vec())
    }
}

/// Strips at most one trailing slash so path concatenation stays clean
fn trim_trailing_slash(mut url: String) -> String {
    if url.ends_with('/') {
        url.pop();
    }
    url
}

/// Maps non-success statuses onto typed errors
fn check_status(response: Response, what: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error = match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(what.to_string()),
        StatusCode::FORBIDDEN => ApiError::Forbidden(what.to_string()),
        StatusCode::NOT_FOUND => ApiError::NotFound(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            ApiError::TooManyRequests { retry_after }
        }
        s if s.is_server_error() => ApiError::ServerError(format!("{what} returned {s}")),
        s => ApiError::InvalidResponse(format!("{what} returned unexpected status {s}")),
    };
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new(
            "https://inspect.example.com/api/v1",
            Some("token-1".to_string()),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(client.base_url(), "https://inspect.example.com/api/v1");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = ApiClient::with_base_url("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_request_builder_with_token() {
        let client = ApiClient::new(
            "http://localhost:8080",
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let request = client.request(Method::GET, "/projects").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/projects");

        let auth_header = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth_header, "Bearer secret");
    }

    #[test]
    fn test_request_builder_without_token() {
        let client = ApiClient::with_base_url("http://localhost:8080");
        let request = client.request(Method::GET, "/health").build().unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}

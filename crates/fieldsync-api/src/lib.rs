//! FieldSync API - Inspection backend client
//!
//! Provides an async client for the remote inspection API:
//! - Connectivity checks
//! - Full entity snapshots (projects, defects, inspection events)
//! - Digital asset tree retrieval
//! - Download URL resolution and content download
//!
//! ## Modules
//!
//! - [`client`] - Typed HTTP client with auth headers and status mapping
//! - [`dto`] - Wire types and their conversions into domain entities
//! - [`catalog`] - `IRemoteCatalog` port implementation

pub mod catalog;
pub mod client;
pub mod dto;

pub use catalog::HttpRemoteCatalog;
pub use client::ApiClient;

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when communicating with the inspection API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

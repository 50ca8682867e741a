//! Remote catalog port (driven/secondary port)
//!
//! This module defines the interface for talking to the remote inspection
//! API: connectivity checks, entity snapshots, asset tree retrieval, and
//! content download.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because transport errors are adapter-specific
//!   and don't need domain-level classification.
//! - Entity fetches return full snapshots. The engine diffs them against
//!   stored content hashes, so there is no delta protocol to honor.
//! - `fetch_asset_tree` returns raw JSON instead of a typed structure.
//!   Real tree payloads vary wildly in shape (wrapper objects, renamed
//!   child arrays, bare arrays), and the lenient walk over them belongs
//!   to the tree parser, not to transport deserialization.
//! - No method retries internally. A failed resolution or download
//!   surfaces immediately; re-queuing is the explicit retry sweep's job.

use serde_json::Value;

use crate::domain::{
    newtypes::{EntityUid, FileId},
    Defect, InspectionEvent, Project,
};

// ============================================================================
// IRemoteCatalog trait
// ============================================================================

/// Port trait for the remote inspection API
///
/// ## Implementation Notes
///
/// - `ping` is the cheap connectivity probe the orchestrator runs before
///   anything else; it must not mutate server state.
/// - `resolve_download_url` exchanges a file id for a short-lived content
///   URL. Resolved URLs may be reused across asset records sharing the
///   file id within one run.
/// - `download` streams from an already-resolved URL and returns the full
///   body; size limits are the caller's concern.
#[async_trait::async_trait]
pub trait IRemoteCatalog: Send + Sync {
    /// Checks connectivity to the remote API
    async fn ping(&self) -> anyhow::Result<()>;

    /// Fetches the full project snapshot
    async fn fetch_projects(&self) -> anyhow::Result<Vec<Project>>;

    /// Fetches the full defect snapshot
    async fn fetch_defects(&self) -> anyhow::Result<Vec<Defect>>;

    /// Fetches the full inspection event snapshot
    async fn fetch_events(&self) -> anyhow::Result<Vec<InspectionEvent>>;

    /// Fetches a project's digital asset tree as raw JSON
    async fn fetch_asset_tree(&self, project_uid: &EntityUid) -> anyhow::Result<Value>;

    /// Resolves the download URL for a file id
    async fn resolve_download_url(&self, file_id: &FileId) -> anyhow::Result<String>;

    /// Downloads content from a resolved URL
    async fn download(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

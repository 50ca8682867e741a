//! Content store port (driven/secondary port)
//!
//! This module defines the interface for the on-disk asset content cache,
//! keyed by tree node id.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - `write` must be atomic at the file level (write to a temporary path,
//!   then rename), so a crash mid-write never leaves a readable partial
//!   file at the final path.
//! - The cache layout is one file per node id plus a sanitized extension.
//!   `path_for` computes that location without touching the disk, letting
//!   callers answer "where would this live" cheaply.

use std::path::{Path, PathBuf};

use crate::domain::newtypes::NodeId;

// ============================================================================
// IContentStore trait
// ============================================================================

/// Port trait for the local asset content cache
#[async_trait::async_trait]
pub trait IContentStore: Send + Sync {
    /// Writes an asset's content, returning its final path
    ///
    /// Overwrites any previous content for the node id.
    async fn write(
        &self,
        node_id: &NodeId,
        extension: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<PathBuf>;

    /// Removes a cached content file, ignoring files already gone
    async fn remove(&self, path: &Path) -> anyhow::Result<()>;

    /// Computes the cache path for a node id without touching the disk
    fn path_for(&self, node_id: &NodeId, extension: Option<&str>) -> PathBuf;
}

//! Digital asset domain entities and download state machine
//!
//! An asset is a downloadable file referenced by a leaf node of a project's
//! digital asset tree. Each asset record moves through a small state machine:
//!
//! ```text
//!     ┌─────────┐  resolve   ┌───────────┐   url    ┌─────────────┐
//!     │ Pending │ ─────────► │ Resolving │ ───────► │ Downloading │
//!     └─────────┘            └───────────┘          └─────────────┘
//!          │  url already known       │                    │
//!          └────────────────────────────────────┐          │ success
//!          ▲                          │         ▼          ▼
//!          │ retry sweep /            │   ┌────────┐  ┌───────────┐
//!          │ forced re-fetch          └─► │ Failed │  │ Completed │
//!          └──────────────────────────────┴────────┘  └───────────┘
//! ```
//!
//! `Completed` and `Failed` end an attempt. A failed asset is re-queued only
//! by the explicit retry sweep; a completed one only by a forced re-fetch.
//! Completion structurally requires a local path, so a completed record can
//! never be observed without its payload.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{FileId, NodeId};

// ============================================================================
// DownloadStatus
// ============================================================================

/// Download state of a single asset record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Queued, nothing attempted yet
    #[default]
    Pending,
    /// Resolving the download URL for the asset's file id
    Resolving,
    /// Transferring content
    Downloading,
    /// Content stored locally
    Completed,
    /// The attempt failed; waits for an explicit retry sweep
    Failed,
}

impl DownloadStatus {
    /// Returns true if this status ends a download attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }

    /// Returns true if a download task is working on the asset
    pub fn is_in_progress(&self) -> bool {
        matches!(self, DownloadStatus::Resolving | DownloadStatus::Downloading)
    }

    /// Returns the status name as a stable lowercase string
    pub fn name(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Resolving => "resolving",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }

    /// Parse a status from its stable string form
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` for unknown names
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(DownloadStatus::Pending),
            "resolving" => Ok(DownloadStatus::Resolving),
            "downloading" => Ok(DownloadStatus::Downloading),
            "completed" => Ok(DownloadStatus::Completed),
            "failed" => Ok(DownloadStatus::Failed),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown download status: {other}"
            ))),
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// AssetLeaf
// ============================================================================

/// A leaf descriptor extracted from the digital asset tree.
///
/// The tree parser emits one of these per downloadable leaf; grouping nodes
/// (folder-like type or blank file id) are never emitted. This is parser
/// output, not a persisted record - the store turns leaves into
/// [`AssetRecord`] rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLeaf {
    /// Node id, unique across the tree
    pub node_id: NodeId,
    /// Parent node id, if the leaf was nested under another node
    pub parent_id: Option<NodeId>,
    /// Display name resolved from the name-synonym fields
    pub name: String,
    /// Raw node type string as the tree reported it
    pub node_type: String,
    /// Remote file id (shared between nodes referencing the same file)
    pub file_id: FileId,
    /// File type, from type-like fields or the filename extension
    pub file_type: Option<String>,
    /// File size in bytes, when the tree reports one
    pub file_size: Option<u64>,
}

// ============================================================================
// AssetRecord
// ============================================================================

/// A downloadable asset as persisted locally, keyed by node id.
///
/// Owner membership (which projects reference the asset) is a separate
/// many-to-many relation maintained by the store and is not part of this
/// record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Tree node id (primary key)
    node_id: NodeId,
    /// Parent node id from the last parsed tree
    parent_id: Option<NodeId>,
    /// Remote file id used for URL resolution
    file_id: FileId,
    /// Display name
    name: String,
    /// Raw node type string
    node_type: String,
    /// File type, if known
    file_type: Option<String>,
    /// File size in bytes, if known
    file_size: Option<u64>,
    /// Current download status
    status: DownloadStatus,
    /// Resolved download URL (lazily populated, reusable per file id)
    download_url: Option<String>,
    /// Local content path; non-null exactly when status is Completed
    local_path: Option<PathBuf>,
    /// Inline cached payload for small structured assets
    content: Option<String>,
    /// When the record was first created
    created_at: DateTime<Utc>,
    /// When the record was last written
    updated_at: DateTime<Utc>,
}

impl AssetRecord {
    /// Creates a fresh Pending record from a parsed tree leaf
    #[must_use]
    pub fn from_leaf(leaf: &AssetLeaf) -> Self {
        let now = Utc::now();
        Self {
            node_id: leaf.node_id.clone(),
            parent_id: leaf.parent_id.clone(),
            file_id: leaf.file_id.clone(),
            name: leaf.name.clone(),
            node_type: leaf.node_type.clone(),
            file_type: leaf.file_type.clone(),
            file_size: leaf.file_size,
            status: DownloadStatus::Pending,
            download_url: None,
            local_path: None,
            content: None,
            created_at: now,
            updated_at: now,
        }
    }

    // --- Getters ---

    /// Returns the node id
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the parent node id, if any
    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    /// Returns the remote file id
    pub fn file_id(&self) -> &FileId {
        &self.file_id
    }

    /// Returns the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw node type
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Returns the file type, if known
    pub fn file_type(&self) -> Option<&str> {
        self.file_type.as_deref()
    }

    /// Returns the file size, if known
    pub fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Returns the current download status
    pub fn status(&self) -> DownloadStatus {
        self.status
    }

    /// Returns the resolved download URL, if any
    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    /// Returns the local content path, if completed
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Returns the inline cached payload, if any
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Returns the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-write timestamp
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the asset's content is cached locally
    pub fn is_cached(&self) -> bool {
        matches!(self.status, DownloadStatus::Completed)
    }

    // --- State machine ---

    /// Checks whether a transition to the target status is legal
    pub fn can_transition_to(&self, target: DownloadStatus) -> bool {
        match (self.status, target) {
            // Pending transitions; Downloading directly when the URL is
            // already known from a prior resolution of the same file id
            (DownloadStatus::Pending, DownloadStatus::Resolving) => true,
            (DownloadStatus::Pending, DownloadStatus::Downloading) => true,
            (DownloadStatus::Pending, DownloadStatus::Failed) => true,

            // Resolving transitions
            (DownloadStatus::Resolving, DownloadStatus::Downloading) => true,
            (DownloadStatus::Resolving, DownloadStatus::Failed) => true,

            // Downloading transitions
            (DownloadStatus::Downloading, DownloadStatus::Completed) => true,
            (DownloadStatus::Downloading, DownloadStatus::Failed) => true,

            // Leaving a terminal state needs the explicit sweep entry points
            (DownloadStatus::Failed, DownloadStatus::Pending) => true,
            (DownloadStatus::Completed, DownloadStatus::Pending) => true,

            _ => false,
        }
    }

    /// Transitions to the target status
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if the transition is not legal
    pub fn transition_to(&mut self, target: DownloadStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: target.name().to_string(),
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Begins URL resolution for this asset
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the asset is Pending
    pub fn begin_resolving(&mut self) -> Result<(), DomainError> {
        self.transition_to(DownloadStatus::Resolving)
    }

    /// Begins the transfer with a resolved URL
    ///
    /// Legal from `Pending` (URL reused from a prior resolution of the same
    /// file id) and from `Resolving`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` from any other status
    pub fn begin_download(&mut self, url: String) -> Result<(), DomainError> {
        self.transition_to(DownloadStatus::Downloading)?;
        self.download_url = Some(url);
        Ok(())
    }

    /// Marks the download complete, carrying the payload
    ///
    /// The local path is mandatory - there is no way to reach `Completed`
    /// without one. `content` holds the inline copy for small structured
    /// assets.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the asset is Downloading
    pub fn complete(
        &mut self,
        local_path: PathBuf,
        content: Option<String>,
    ) -> Result<(), DomainError> {
        self.transition_to(DownloadStatus::Completed)?;
        self.local_path = Some(local_path);
        self.content = content;
        Ok(())
    }

    /// Marks the attempt failed
    ///
    /// The payload is left untouched: a failed first attempt keeps
    /// `local_path` null, and a failed re-fetch keeps the previous payload.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if the asset is already terminal
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.transition_to(DownloadStatus::Failed)
    }

    /// Re-queues a failed asset (explicit retry sweep only)
    ///
    /// The resolved URL is kept so the retry can skip resolution.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the asset is Failed
    pub fn reset_for_retry(&mut self) -> Result<(), DomainError> {
        if self.status != DownloadStatus::Failed {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: DownloadStatus::Pending.name().to_string(),
            });
        }
        self.transition_to(DownloadStatus::Pending)
    }

    /// Re-queues a completed asset (explicit forced re-fetch only)
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` unless the asset is Completed
    pub fn reset_for_refetch(&mut self) -> Result<(), DomainError> {
        if self.status != DownloadStatus::Completed {
            return Err(DomainError::InvalidState {
                from: self.status.name().to_string(),
                to: DownloadStatus::Pending.name().to_string(),
            });
        }
        self.transition_to(DownloadStatus::Pending)
    }
}

// ============================================================================
// Tests
// ============================================================================

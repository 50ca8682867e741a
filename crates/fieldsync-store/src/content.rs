//! On-disk asset content store
//!
//! Stores downloaded asset content in a hash-based directory layout for
//! efficient storage and lookup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use fieldsync_core::domain::newtypes::NodeId;
use fieldsync_core::ports::IContentStore;

/// Filesystem-backed content store.
///
/// Content is addressed by node id and stored as
/// `{content_dir}/{first_2_chars_of_hash}/{rest_of_hash}[.ext]`; the
/// two-character prefix keeps any single directory from growing unbounded.
/// Writes go to a `.partial` sibling first and are renamed into place, so
/// an interrupted write never leaves a plausible-looking final file.
pub struct FsContentStore {
    content_dir: PathBuf,
}

impl FsContentStore {
    /// Creates a new content store, creating the content directory if needed.
    pub fn new(content_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&content_dir)?;
        Ok(Self { content_dir })
    }

    /// Path of the in-progress sibling for a final content path.
    fn partial_path(path: &Path) -> PathBuf {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        PathBuf::from(partial)
    }

    fn hash_node_id(node_id: &NodeId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(node_id.as_str().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Keeps only extensions that are safe as a filename suffix.
    ///
    /// Anything with separators, dots, or unusual length is dropped rather
    /// than escaped; the extension is a convenience for external viewers,
    /// not part of the address.
    fn sanitize_extension(extension: Option<&str>) -> Option<String> {
        let ext = extension?
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext)
    }
}

#[async_trait]
impl IContentStore for FsContentStore {
    async fn write(
        &self,
        node_id: &NodeId,
        extension: Option<&str>,
        bytes: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let path = self.path_for(node_id, extension);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = Self::partial_path(&path);
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        tracing::trace!(
            node_id = %node_id,
            path = %path.display(),
            size = bytes.len(),
            "Stored asset content"
        );
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> anyhow::Result<()> {
        if tokio::fs::try_exists(path).await? {
            tokio::fs::remove_file(path).await?;
        }
        // Also try to remove a partial file if one was left behind
        let partial = Self::partial_path(path);
        if tokio::fs::try_exists(&partial).await? {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        Ok(())
    }

    fn path_for(&self, node_id: &NodeId, extension: Option<&str>) -> PathBuf {
        let hash = Self::hash_node_id(node_id);
        let (prefix, rest) = hash.split_at(2);
        let filename = match Self::sanitize_extension(extension) {
            Some(ext) => format!("{rest}.{ext}"),
            None => rest.to_string(),
        };
        self.content_dir.join(prefix).join(filename)
    }
}

//! FieldSync Store - Local persistence
//!
//! SQLite-based storage for:
//! - The mirrored entity catalog (projects, defects, inspection events)
//! - Digital asset records and their download state
//! - Project-to-asset ownership links
//!
//! plus a filesystem cache for downloaded asset content.
//!
//! ## Architecture
//!
//! This crate implements the `ICatalogStore`, `IAssetStore`, and
//! `IContentStore` ports from `fieldsync-core`. It is a driven (secondary)
//! adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteStore`] - `ICatalogStore` + `IAssetStore` implementation
//! - [`FsContentStore`] - On-disk asset content cache
//! - [`StoreError`] - Error types for storage operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use fieldsync_store::{DatabasePool, SqliteStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/fieldsync/fieldsync.db")).await?;
//! let store = SqliteStore::new(pool.pool().clone());
//! // Use store as ICatalogStore / IAssetStore...
//! # Ok(())
//! # }
//! ```

pub mod content;
pub mod pool;
pub mod repository;

pub use content::FsContentStore;
pub use pool::DatabasePool;
pub use repository::SqliteStore;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}

//! Shared traits and wrappers for remote catalog records
//!
//! A catalog record is the payload of a remote entity as the server sends it:
//! external UID plus server-side mutable fields, with no local bookkeeping.
//! The store wraps persisted rows in [`Stored`], which carries the local
//! surrogate key, the persisted content hash, the soft-delete flag, and row
//! timestamps. `Stored` has getters only - the surrogate key cannot be set or
//! swapped from outside the store, which is what keeps foreign keys stable
//! across re-syncs.

use chrono::{DateTime, Utc};

use super::newtypes::{ContentHash, EntityUid, LocalKey};

/// A remote catalog entity payload, as fetched from the server.
///
/// Implementors expose the fields the content digest is computed over, in a
/// fixed order. Purely local bookkeeping never appears in `digest_fields`.
pub trait CatalogRecord {
    /// Kind tag mixed into the digest so equal field lists of different
    /// entity types never collide.
    const KIND: &'static str;

    /// Stable external UID of this record
    fn uid(&self) -> &EntityUid;

    /// Externally-significant fields, in digest order. Absent optional
    /// fields contribute an empty string so positions stay aligned.
    fn digest_fields(&self) -> Vec<String>;
}

/// A catalog record as persisted locally, with its sync bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    key: LocalKey,
    record: T,
    content_hash: ContentHash,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<T> Stored<T> {
    /// Reconstruct a stored row. Only storage adapters call this; the key
    /// is whatever the database assigned on first insert.
    #[must_use]
    pub fn new(
        key: LocalKey,
        record: T,
        content_hash: ContentHash,
        deleted: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            record,
            content_hash,
            deleted,
            created_at,
            updated_at,
        }
    }

    /// Local surrogate key (stable across re-syncs)
    #[must_use]
    pub fn key(&self) -> LocalKey {
        self.key
    }

    /// The remote payload
    #[must_use]
    pub fn record(&self) -> &T {
        &self.record
    }

    /// Consume the wrapper, returning the payload
    #[must_use]
    pub fn into_record(self) -> T {
        self.record
    }

    /// Content hash persisted at last write
    #[must_use]
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Whether the row has been soft-deleted (absent from the last snapshot)
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// When the row was first inserted
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the row was last written
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

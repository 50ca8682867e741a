//! Content hashing and snapshot classification
//!
//! Change detection hashes each incoming record's externally-significant
//! fields and compares the result against the hash persisted with the
//! local row. Rows whose hash matches the snapshot are skipped without a
//! write, which is what makes re-running an unchanged snapshot a no-op.

use std::collections::HashMap;

use fieldsync_core::domain::newtypes::{ContentHash, EntityUid};
use fieldsync_core::domain::record::CatalogRecord;
use sha2::{Digest, Sha256};

/// ASCII unit separator, placed between digest fields so adjacent field
/// values cannot collide by concatenation
const FIELD_SEPARATOR: u8 = 0x1f;

/// Computes the content hash of a catalog record.
///
/// The digest covers the record's kind tag followed by its digest fields
/// in declaration order, so two entity types carrying identical field
/// values still hash differently.
pub fn content_hash<R: CatalogRecord>(record: &R) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(R::KIND.as_bytes());
    for field in record.digest_fields() {
        hasher.update([FIELD_SEPARATOR]);
        hasher.update(field.as_bytes());
    }
    ContentHash::from_digest(hasher.finalize().into())
}

// ============================================================================
// Disposition
// ============================================================================

/// How an incoming snapshot record relates to the stored catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No live row with this UID exists
    New,
    /// A live row exists with a different content hash
    Changed,
    /// A live row exists with the same content hash
    Unchanged,
}

// ============================================================================
// DigestIndex
// ============================================================================

/// Stored digests of one entity class, snapshotted at the start of a
/// reconcile pass.
///
/// Only live rows are indexed. A soft-deleted row is invisible here, so a
/// record reappearing remotely classifies as [`Disposition::New`] and its
/// upsert revives the old row.
#[derive(Debug, Default)]
pub struct DigestIndex {
    digests: HashMap<EntityUid, ContentHash>,
}

impl DigestIndex {
    /// Builds an index over stored live-row digests
    #[must_use]
    pub fn new(digests: HashMap<EntityUid, ContentHash>) -> Self {
        Self { digests }
    }

    /// Classifies an incoming record hash against the stored digests
    pub fn classify(&self, uid: &EntityUid, hash: &ContentHash) -> Disposition {
        match self.digests.get(uid) {
            None => Disposition::New,
            Some(stored) if stored == hash => Disposition::Unchanged,
            Some(_) => Disposition::Changed,
        }
    }

    /// Number of indexed rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Returns true if no rows are indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

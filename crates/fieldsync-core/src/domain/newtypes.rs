//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers and values the sync engine
//! passes around. Each newtype validates at construction time, so a held
//! value is always well-formed.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// External identifiers
// ============================================================================

/// Stable external UID of a remote catalog entity (project, defect, event).
///
/// Issued by the server; opaque to the engine. The local surrogate key is a
/// separate value (see [`LocalKey`]) and the two must never be conflated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityUid(String);

impl EntityUid {
    /// Create a new EntityUid
    ///
    /// # Errors
    /// Returns `DomainError::InvalidUid` if the UID is empty or whitespace
    pub fn new(uid: String) -> Result<Self, DomainError> {
        if uid.trim().is_empty() {
            return Err(DomainError::InvalidUid(
                "Entity UID cannot be empty".to_string(),
            ));
        }
        Ok(Self(uid))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityUid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityUid {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for EntityUid {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntityUid> for String {
    fn from(uid: EntityUid) -> Self {
        uid.0
    }
}

/// Identifier of a digital-asset tree node.
///
/// Unique per node across the whole tree; assets are keyed by NodeId in the
/// local store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Create a new NodeId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidNodeId` if the id is empty or whitespace
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::InvalidNodeId(
                "Node id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for NodeId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Identifier of a downloadable remote file.
///
/// Several tree nodes may reference the same file id; URL resolution is keyed
/// by FileId so a shared file is resolved once. The tree payload marks
/// "no file" with an empty string or the literal `"null"`, both of which are
/// rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFileId` if the id is blank or the
    /// literal string "null"
    pub fn new(id: String) -> Result<Self, DomainError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidFileId(
                "File id cannot be blank".to_string(),
            ));
        }
        if trimmed.eq_ignore_ascii_case("null") {
            return Err(DomainError::InvalidFileId(
                "File id is the literal string \"null\"".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for FileId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

// ============================================================================
// Local surrogate key
// ============================================================================

/// Local surrogate key of a catalog row (database row id).
///
/// Assigned once on insert and never reassigned; dependent rows reference it
/// by foreign key. There is deliberately no way to attach a LocalKey to an
/// entity being written - keys only flow out of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalKey(i64);

impl LocalKey {
    /// Create a LocalKey from an i64 value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for LocalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocalKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid LocalKey: {e}")))
    }
}

impl From<i64> for LocalKey {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Content hash
// ============================================================================

/// SHA-256 content digest in lowercase hex (64 characters).
///
/// Computed over a remote entity's externally-significant fields and persisted
/// with the row; a mismatch against the incoming snapshot marks the row dirty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Expected hex length of a SHA-256 digest
    const HEX_LEN: usize = 64;

    /// Create a new ContentHash from a hex string
    ///
    /// Uppercase input is normalized to lowercase.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidHash` if the string is not 64 hex chars
    pub fn new(hash: String) -> Result<Self, DomainError> {
        if hash.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidHash(format!(
                "Hash has wrong length: expected {} hex chars, got {}",
                Self::HEX_LEN,
                hash.len()
            )));
        }
        if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not valid hex: {hash}"
            )));
        }
        Ok(Self(hash.to_ascii_lowercase()))
    }

    /// Build a ContentHash from a fixed-size SHA-256 digest
    #[must_use]
    pub fn from_digest(digest: [u8; 32]) -> Self {
        let mut hex = String::with_capacity(Self::HEX_LEN);
        for b in digest {
            use std::fmt::Write;
            let _ = write!(hex, "{b:02x}");
        }
        Self(hex)
    }

    /// Build a ContentHash from raw digest bytes (must be 32 bytes)
    ///
    /// # Errors
    /// Returns `DomainError::InvalidHash` if the slice is not 32 bytes
    pub fn from_digest_bytes(bytes: &[u8]) -> Result<Self, DomainError> {
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            DomainError::InvalidHash(format!(
                "Digest has wrong length: expected {} bytes, got {}",
                Self::HEX_LEN / 2,
                bytes.len()
            ))
        })?;
        Ok(Self::from_digest(digest))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

// ============================================================================
// Run identifier
// ============================================================================

/// Identifier for a single sync run, generated locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid run id: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================

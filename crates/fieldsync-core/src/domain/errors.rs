//! Domain error types

use thiserror::Error;

/// Errors produced by domain-level validation and state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// An external entity UID failed validation
    #[error("Invalid entity UID: {0}")]
    InvalidUid(String),

    /// An asset tree node id failed validation
    #[error("Invalid node id: {0}")]
    InvalidNodeId(String),

    /// A remote file id failed validation (blank or the literal "null")
    #[error("Invalid file id: {0}")]
    InvalidFileId(String),

    /// A content hash failed validation
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    /// Invalid download state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState { from: String, to: String },

    /// General validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

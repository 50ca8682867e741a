//! Project domain entity
//!
//! A project is an inspected site (bridge, tunnel, building). Defects hang
//! off projects; the digital asset tree is fetched per project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::EntityUid,
    record::CatalogRecord,
};

/// An inspection project as the remote catalog reports it.
///
/// Carries remote payload only - local bookkeeping (surrogate key, hash,
/// soft-delete flag) lives on the `Stored` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable external UID
    uid: EntityUid,
    /// Project display name
    name: String,
    /// Customer-facing reference number
    reference: Option<String>,
    /// Site address
    address: Option<String>,
    /// Workflow status as reported by the server (open string set)
    status: Option<String>,
    /// Server-side last-modified timestamp, if reported
    remote_updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Creates a new Project with the mandatory fields
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if the name is empty
    pub fn new(uid: EntityUid, name: String) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Project name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            uid,
            name,
            reference: None,
            address: None,
            status: None,
            remote_updated_at: None,
        })
    }

    /// Sets the customer reference
    #[must_use]
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Sets the site address
    #[must_use]
    pub fn with_address(mut self, address: Option<String>) -> Self {
        self.address = address;
        self
    }

    /// Sets the workflow status
    #[must_use]
    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status;
        self
    }

    /// Sets the server-side last-modified timestamp
    #[must_use]
    pub fn with_remote_updated_at(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.remote_updated_at = ts;
        self
    }

    // --- Getters ---

    /// Returns the external UID
    pub fn uid(&self) -> &EntityUid {
        &self.uid
    }

    /// Returns the project name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the customer reference, if any
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Returns the site address, if any
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the workflow status, if any
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Returns the server-side last-modified timestamp, if any
    pub fn remote_updated_at(&self) -> Option<DateTime<Utc>> {
        self.remote_updated_at
    }
}

impl CatalogRecord for Project {
    const KIND: &'static str = "project";

    fn uid(&self) -> &EntityUid {
        &self.uid
    }

    fn digest_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.reference.clone().unwrap_or_default(),
            self.address.clone().unwrap_or_default(),
            self.status.clone().unwrap_or_default(),
            self.remote_updated_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project() {
        let project = Project::new("p1".parse().unwrap(), "Harbour Bridge".to_string()).unwrap();
        assert_eq!(project.uid().as_str(), "p1");
        assert_eq!(project.name(), "Harbour Bridge");
        assert!(project.reference().is_none());
        assert!(project.status().is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Project::new("p1".parse().unwrap(), "  ".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_setters() {
        let project = Project::new("p2".parse().unwrap(), "Tunnel".to_string())
            .unwrap()
            .with_reference(Some("REF-9".to_string()))
            .with_status(Some("active".to_string()));
        assert_eq!(project.reference(), Some("REF-9"));
        assert_eq!(project.status(), Some("active"));
    }

    #[test]
    fn test_digest_fields_are_positional() {
        let a = Project::new("p1".parse().unwrap(), "X".to_string())
            .unwrap()
            .with_reference(Some("r".to_string()));
        let b = Project::new("p1".parse().unwrap(), "X".to_string())
            .unwrap()
            .with_address(Some("r".to_string()));

        // Same strings in different slots must differ positionally
        assert_ne!(a.digest_fields(), b.digest_fields());
        assert_eq!(a.digest_fields().len(), b.digest_fields().len());
    }
}

//! Defect domain entity
//!
//! A defect is a finding recorded against a project (crack, corrosion,
//! water ingress). The remote payload references its project by external
//! UID; the store resolves that to the project's surrogate key at write
//! time, which is why projects sync before defects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::EntityUid,
    record::CatalogRecord,
};

/// A defect finding as the remote catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Stable external UID
    uid: EntityUid,
    /// UID of the owning project
    project_uid: EntityUid,
    /// Short defect title
    title: String,
    /// Severity grade (open string set, server-defined)
    severity: Option<String>,
    /// Workflow status
    status: Option<String>,
    /// Server-side last-modified timestamp, if reported
    remote_updated_at: Option<DateTime<Utc>>,
}

impl Defect {
    /// Creates a new Defect with the mandatory fields
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if the title is empty
    pub fn new(
        uid: EntityUid,
        project_uid: EntityUid,
        title: String,
    ) -> Result<Self, DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Defect title cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            uid,
            project_uid,
            title,
            severity: None,
            status: None,
            remote_updated_at: None,
        })
    }

    /// Sets the severity grade
    #[must_use]
    pub fn with_severity(mut self, severity: Option<String>) -> Self {
        self.severity = severity;
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

    /// Returns the owning project's UID
    pub fn project_uid(&self) -> &EntityUid {
        &self.project_uid
    }

    /// Returns the defect title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the severity grade, if any
    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
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

impl CatalogRecord for Defect {
    const KIND: &'static str = "defect";

    fn uid(&self) -> &EntityUid {
        &self.uid
    }

    fn digest_fields(&self) -> Vec<String> {
        vec![
            self.project_uid.as_str().to_string(),
            self.title.clone(),
            self.severity.clone().unwrap_or_default(),
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
    fn test_new_defect() {
        let defect = Defect::new(
            "d1".parse().unwrap(),
            "p1".parse().unwrap(),
            "Hairline crack".to_string(),
        )
        .unwrap();
        assert_eq!(defect.uid().as_str(), "d1");
        assert_eq!(defect.project_uid().as_str(), "p1");
        assert_eq!(defect.title(), "Hairline crack");
    }

    #[test]
    fn test_empty_title_rejected() {
        let result = Defect::new("d1".parse().unwrap(), "p1".parse().unwrap(), String::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_digest_includes_project_uid() {
        let a = Defect::new("d1".parse().unwrap(), "p1".parse().unwrap(), "t".to_string())
            .unwrap();
        let b = Defect::new("d1".parse().unwrap(), "p2".parse().unwrap(), "t".to_string())
            .unwrap();
        // Moving a defect between projects must change the digest
        assert_ne!(a.digest_fields(), b.digest_fields());
    }
}

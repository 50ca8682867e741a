//! Inspection event domain entity
//!
//! An inspection event is a dated observation attached to a defect
//! (re-measurement, repair, photo session). Events reference their defect by
//! external UID and sync after defects for the same FK-ordering reason
//! defects sync after projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::EntityUid,
    record::CatalogRecord,
};

/// An inspection event as the remote catalog reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionEvent {
    /// Stable external UID
    uid: EntityUid,
    /// UID of the defect this event belongs to
    defect_uid: EntityUid,
    /// What happened
    description: String,
    /// Event category (open string set, server-defined)
    event_type: Option<String>,
    /// When the event occurred on site
    occurred_at: Option<DateTime<Utc>>,
}

impl InspectionEvent {
    /// Creates a new InspectionEvent with the mandatory fields
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if the description is empty
    pub fn new(
        uid: EntityUid,
        defect_uid: EntityUid,
        description: String,
    ) -> Result<Self, DomainError> {
        if description.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Event description cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            uid,
            defect_uid,
            description,
            event_type: None,
            occurred_at: None,
        })
    }

    /// Sets the event category
    #[must_use]
    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    /// Sets the on-site timestamp
    #[must_use]
    pub fn with_occurred_at(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.occurred_at = ts;
        self
    }

    // --- Getters ---

    /// Returns the external UID
    pub fn uid(&self) -> &EntityUid {
        &self.uid
    }

    /// Returns the owning defect's UID
    pub fn defect_uid(&self) -> &EntityUid {
        &self.defect_uid
    }

    /// Returns the description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the event category, if any
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Returns the on-site timestamp, if any
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.occurred_at
    }
}

impl CatalogRecord for InspectionEvent {
    const KIND: &'static str = "event";

    fn uid(&self) -> &EntityUid {
        &self.uid
    }

    fn digest_fields(&self) -> Vec<String> {
        vec![
            self.defect_uid.as_str().to_string(),
            self.description.clone(),
            self.event_type.clone().unwrap_or_default(),
            self.occurred_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_event() {
        let event = InspectionEvent::new(
            "e1".parse().unwrap(),
            "d1".parse().unwrap(),
            "Crack widened to 2mm".to_string(),
        )
        .unwrap();
        assert_eq!(event.uid().as_str(), "e1");
        assert_eq!(event.defect_uid().as_str(), "d1");
        assert!(event.event_type().is_none());
    }

    #[test]
    fn test_empty_description_rejected() {
        let result = InspectionEvent::new(
            "e1".parse().unwrap(),
            "d1".parse().unwrap(),
            " ".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_occurred_at_changes_digest() {
        let base = InspectionEvent::new(
            "e1".parse().unwrap(),
            "d1".parse().unwrap(),
            "obs".to_string(),
        )
        .unwrap();
        let dated = base.clone().with_occurred_at(Some(Utc::now()));
        assert_ne!(base.digest_fields(), dated.digest_fields());
    }
}

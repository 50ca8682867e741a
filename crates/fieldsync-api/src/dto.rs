//! Wire types for the inspection API
//!
//! The backend speaks camelCase JSON. Each DTO mirrors one wire shape and
//! converts into its domain entity via `TryFrom`; conversion is where wire
//! leniency ends and domain validation starts.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use fieldsync_core::domain::newtypes::EntityUid;
use fieldsync_core::domain::{Defect, DomainError, InspectionEvent, Project};

// ============================================================================
// Envelopes
// ============================================================================

/// A snapshot list response
///
/// Older endpoints return a bare JSON array, newer ones wrap the rows in a
/// `{"data": [...]}` envelope. Both forms deserialize here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    /// Enveloped form
    Wrapped {
        /// The actual rows
        data: Vec<T>,
    },
    /// Bare array form
    Bare(Vec<T>),
}

impl<T> ListPayload<T> {
    /// Unwraps the envelope into the row vector
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Wrapped { data } => data,
            ListPayload::Bare(rows) => rows,
        }
    }
}

/// Response of the download URL resolution endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlDto {
    /// Short-lived pre-signed content URL
    pub download_url: String,
}

// ============================================================================
// Snapshot rows
// ============================================================================

/// A project row as the API reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDto {
    /// Stable external UID
    pub uid: String,
    /// Display name
    pub name: String,
    /// Customer reference code
    #[serde(default)]
    pub reference: Option<String>,
    /// Site address
    #[serde(default)]
    pub address: Option<String>,
    /// Workflow status
    #[serde(default)]
    pub status: Option<String>,
    /// Server-side last-modified timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProjectDto> for Project {
    type Error = DomainError;

    fn try_from(dto: ProjectDto) -> Result<Self, Self::Error> {
        let uid = EntityUid::new(dto.uid)?;
        Ok(Project::new(uid, dto.name)?
            .with_reference(dto.reference)
            .with_address(dto.address)
            .with_status(dto.status)
            .with_remote_updated_at(dto.updated_at))
    }
}

/// A defect row as the API reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectDto {
    /// Stable external UID
    pub uid: String,
    /// UID of the owning project
    pub project_uid: String,
    /// Short description of the defect
    pub title: String,
    /// Severity grade
    #[serde(default)]
    pub severity: Option<String>,
    /// Workflow status
    #[serde(default)]
    pub status: Option<String>,
    /// Server-side last-modified timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<DefectDto> for Defect {
    type Error = DomainError;

    fn try_from(dto: DefectDto) -> Result<Self, Self::Error> {
        let uid = EntityUid::new(dto.uid)?;
        let project_uid = EntityUid::new(dto.project_uid)?;
        Ok(Defect::new(uid, project_uid, dto.title)?
            .with_severity(dto.severity)
            .with_status(dto.status)
            .with_remote_updated_at(dto.updated_at))
    }
}

/// An inspection event row as the API reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    /// Stable external UID
    pub uid: String,
    /// UID of the defect this event belongs to
    pub defect_uid: String,
    /// What happened
    pub description: String,
    /// Event category
    #[serde(default)]
    pub event_type: Option<String>,
    /// When the event occurred on site
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventDto> for InspectionEvent {
    type Error = DomainError;

    fn try_from(dto: EventDto) -> Result<Self, Self::Error> {
        let uid = EntityUid::new(dto.uid)?;
        let defect_uid = EntityUid::new(dto.defect_uid)?;
        Ok(InspectionEvent::new(uid, defect_uid, dto.description)?
            .with_event_type(dto.event_type)
            .with_occurred_at(dto.occurred_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_dto_deserialization() {
        let json = r#"{
            "uid": "proj-001",
            "name": "Harbour Bridge",
            "reference": "REF-2201",
            "address": "1 Quay Road",
            "status": "active",
            "updatedAt": "2026-02-01T08:30:00Z"
        }"#;

        let dto: ProjectDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.uid, "proj-001");
        assert_eq!(dto.name, "Harbour Bridge");
        assert_eq!(dto.reference.as_deref(), Some("REF-2201"));
        assert!(dto.updated_at.is_some());
    }

    #[test]
    fn test_project_dto_minimal_fields() {
        let json = r#"{"uid": "proj-002", "name": "River Tunnel"}"#;
        let dto: ProjectDto = serde_json::from_str(json).unwrap();
        assert!(dto.reference.is_none());
        assert!(dto.status.is_none());
        assert!(dto.updated_at.is_none());
    }

    #[test]
    fn test_project_conversion() {
        let dto = ProjectDto {
            uid: "proj-001".to_string(),
            name: "Harbour Bridge".to_string(),
            reference: Some("REF-2201".to_string()),
            address: None,
            status: Some("active".to_string()),
            updated_at: None,
        };

        let project = Project::try_from(dto).unwrap();
        assert_eq!(project.uid().as_str(), "proj-001");
        assert_eq!(project.name(), "Harbour Bridge");
        assert_eq!(project.status(), Some("active"));
    }

    #[test]
    fn test_project_conversion_rejects_blank_uid() {
        let dto = ProjectDto {
            uid: "   ".to_string(),
            name: "Harbour Bridge".to_string(),
            reference: None,
            address: None,
            status: None,
            updated_at: None,
        };
        assert!(Project::try_from(dto).is_err());
    }

    #[test]
    fn test_defect_dto_deserialization() {
        let json = r#"{
            "uid": "def-010",
            "projectUid": "proj-001",
            "title": "Cracked weld on girder 4",
            "severity": "high"
        }"#;

        let dto: DefectDto = serde_json::from_str(json).unwrap();
        let defect = Defect::try_from(dto).unwrap();
        assert_eq!(defect.project_uid().as_str(), "proj-001");
        assert_eq!(defect.severity(), Some("high"));
    }

    #[test]
    fn test_event_dto_deserialization() {
        let json = r#"{
            "uid": "ev-100",
            "defectUid": "def-010",
            "description": "Re-inspected after repair",
            "eventType": "inspection",
            "occurredAt": "2026-03-15T14:00:00Z"
        }"#;

        let dto: EventDto = serde_json::from_str(json).unwrap();
        let event = InspectionEvent::try_from(dto).unwrap();
        assert_eq!(event.defect_uid().as_str(), "def-010");
        assert_eq!(event.event_type(), Some("inspection"));
        assert!(event.occurred_at().is_some());
    }

    #[test]
    fn test_list_payload_wrapped() {
        let json = r#"{"data": [{"uid": "p1", "name": "A"}, {"uid": "p2", "name": "B"}]}"#;
        let payload: ListPayload<ProjectDto> = serde_json::from_str(json).unwrap();
        assert_eq!(payload.into_vec().len(), 2);
    }

    #[test]
    fn test_list_payload_bare_array() {
        let json = r#"[{"uid": "p1", "name": "A"}]"#;
        let payload: ListPayload<ProjectDto> = serde_json::from_str(json).unwrap();
        assert_eq!(payload.into_vec().len(), 1);
    }

    #[test]
    fn test_download_url_dto() {
        let json = r#"{"downloadUrl": "https://cdn.example.com/signed/abc"}"#;
        let dto: DownloadUrlDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.download_url, "https://cdn.example.com/signed/abc");
    }
}

use crate::record::InspectionRecord;
use crate::report::Report;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single event type published by this platform
pub const REPORT_GENERATED: &str = "REPORT_GENERATED";

/// Event published on each successful report generation.
///
/// Best-effort: a publish failure never rolls back the status transition, and
/// the bus provides at-least-once delivery to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGeneratedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub inspection_id: String,
    pub report_id: String,
    pub property_address: String,
    pub inspector_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl ReportGeneratedEvent {
    /// Build the event describing a just-generated report
    pub fn for_report(record: &InspectionRecord, report: &Report) -> Self {
        let client_email = match record.client_email.trim() {
            "" => None,
            email => Some(email.to_string()),
        };

        Self {
            event_type: REPORT_GENERATED.to_string(),
            inspection_id: record.inspection_id.clone(),
            report_id: report.report_id.clone(),
            property_address: record.property_address.clone(),
            inspector_email: record.inspector_email.clone(),
            client_email,
            generated_at: report.generated_at,
        }
    }
}

/// One bus-delivered message as handed to the notification worker.
///
/// The body is the raw payload; the worker parses it per item so one
/// malformed message never blocks its batch siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub message_id: String,
    pub body: String,
}

/// Outcome status for one processed envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Error,
}

/// Per-envelope processing outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcome {
    pub id: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventOutcome {
    pub fn success(id: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            id: id.into(),
            status: OutcomeStatus::Success,
            recipients,
            error: None,
        }
    }

    pub fn skipped(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OutcomeStatus::Skipped,
            recipients: Vec::new(),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: OutcomeStatus::Error,
            recipients: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate summary returned to the invoking runtime after a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub processed: usize,
    pub outcomes: Vec<EventOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ReportGeneratedEvent {
            event_type: REPORT_GENERATED.to_string(),
            inspection_id: "insp_1a2b3c4d".to_string(),
            report_id: "report_insp_1a2b3c4d".to_string(),
            property_address: "12 Elm St".to_string(),
            inspector_email: "jo@example.com".to_string(),
            client_email: Some("sam@example.com".to_string()),
            generated_at: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "REPORT_GENERATED");
        assert_eq!(json["inspectionId"], "insp_1a2b3c4d");
        assert_eq!(json["reportId"], "report_insp_1a2b3c4d");
        assert!(json.get("generatedAt").is_some());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = EventOutcome::error("topic-0-42", "bad payload");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "bad payload");
        assert!(json.get("recipients").is_none());
    }
}

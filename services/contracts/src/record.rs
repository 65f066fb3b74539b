use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity prefix for record primary keys
pub const RECORD_KEY_PREFIX: &str = "INSPECTION#";
/// Fixed sort key for record metadata items
pub const RECORD_SORT_KEY: &str = "METADATA";
/// Prefix for the status-index partition key
pub const STATUS_KEY_PREFIX: &str = "STATUS#";

/// Primary key for an inspection record item
pub fn record_pk(inspection_id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{inspection_id}")
}

/// Status-index key kept in sync with the status field
pub fn status_key(status: InspectionStatus) -> String {
    format!("{STATUS_KEY_PREFIX}{}", status.as_str())
}

/// Generate a fresh inspection identifier (`insp_` + 8 hex chars)
pub fn new_inspection_id() -> String {
    short_id("insp")
}

/// Generate a fresh image identifier (`img_` + 8 hex chars)
pub fn new_image_id() -> String {
    short_id("img")
}

fn short_id(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..8])
}

/// Lifecycle status of an inspection record
///
/// Transitions are one-directional: DRAFT/IN_PROGRESS move to
/// REPORT_GENERATED exclusively through successful report generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Draft,
    InProgress,
    ReportGenerated,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::ReportGenerated => "REPORT_GENERATED",
        }
    }

    /// Parse a status label, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "IN_PROGRESS" => Some(Self::InProgress),
            "REPORT_GENERATED" => Some(Self::ReportGenerated),
            _ => None,
        }
    }
}

/// Checklist rating for one category
///
/// Stored values outside the known set deserialize as `Unknown` and score 0
/// rather than failing the whole record read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Good,
    Fair,
    Poor,
    #[serde(other)]
    Unknown,
}

impl Rating {
    /// Numeric score used for overall-condition averaging
    pub fn score(self) -> u32 {
        match self {
            Self::Good => 3,
            Self::Fair => 2,
            Self::Poor => 1,
            Self::Unknown => 0,
        }
    }
}

/// The fixed, closed set of checklist categories
///
/// A report may only be generated once every category is rated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    #[serde(default)]
    pub roof: Option<Rating>,
    #[serde(default)]
    pub foundation: Option<Rating>,
    #[serde(default)]
    pub plumbing: Option<Rating>,
    #[serde(default)]
    pub electrical: Option<Rating>,
    #[serde(default)]
    pub hvac: Option<Rating>,
}

impl Checklist {
    /// Category names in declaration order
    pub const CATEGORIES: [&'static str; 5] =
        ["roof", "foundation", "plumbing", "electrical", "hvac"];

    /// All categories with their current ratings
    pub fn entries(&self) -> [(&'static str, Option<Rating>); 5] {
        [
            ("roof", self.roof),
            ("foundation", self.foundation),
            ("plumbing", self.plumbing),
            ("electrical", self.electrical),
            ("hvac", self.hvac),
        ]
    }

    /// True once every category holds a rating
    pub fn is_complete(&self) -> bool {
        self.entries().iter().all(|(_, rating)| rating.is_some())
    }
}

/// Reference to an uploaded inspection image
///
/// Owned by the inspection record; appended, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub image_id: String,
    pub s3_key: String,
    /// Original filename supplied at upload time
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The central persisted entity describing one property inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub inspection_id: String,
    pub property_address: String,
    pub inspector_name: String,
    pub inspector_email: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    pub status: InspectionStatus,
    #[serde(default)]
    pub checklist: Checklist,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_generated_at: Option<DateTime<Utc>>,
}

/// Create request for a new inspection record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInspection {
    #[serde(default)]
    pub property_address: String,
    #[serde(default)]
    pub inspector_name: String,
    #[serde(default)]
    pub inspector_email: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl NewInspection {
    /// Names of required fields that are missing or empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.property_address.trim().is_empty() {
            missing.push("propertyAddress");
        }
        if self.inspector_name.trim().is_empty() {
            missing.push("inspectorName");
        }
        if self.inspector_email.trim().is_empty() {
            missing.push("inspectorEmail");
        }
        missing
    }

    /// Validate and build a fresh DRAFT record
    pub fn into_record(self, now: DateTime<Utc>) -> Result<InspectionRecord, ServiceError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ServiceError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(InspectionRecord {
            inspection_id: new_inspection_id(),
            property_address: self.property_address,
            inspector_name: self.inspector_name,
            inspector_email: self.inspector_email,
            client_name: self.client_name.unwrap_or_default(),
            client_email: self.client_email.unwrap_or_default(),
            status: InspectionStatus::Draft,
            checklist: Checklist::default(),
            notes: String::new(),
            images: Vec::new(),
            created_at: now,
            updated_at: now,
            report_generated_at: None,
        })
    }
}

/// Partial update carrying only changed fields
///
/// Each field is interpreted as "apply if present". A status change keeps the
/// status-index key in sync at the store layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionUpdate {
    pub checklist: Option<Checklist>,
    pub notes: Option<String>,
    pub images: Option<Vec<ImageRef>>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub status: Option<InspectionStatus>,
}

impl InspectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.checklist.is_none()
            && self.notes.is_none()
            && self.images.is_none()
            && self.client_name.is_none()
            && self.client_email.is_none()
            && self.status.is_none()
    }
}

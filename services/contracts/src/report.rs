use crate::record::{Checklist, ImageRef, InspectionRecord, Rating};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report identifier, deterministically derived from the inspection
pub fn report_id(inspection_id: &str) -> String {
    format!("report_{inspection_id}")
}

/// Classify a checklist into a single overall-condition label.
///
/// Each rating scores Good=3, Fair=2, Poor=1 (unknown values 0); the average
/// over all five categories maps to Good (>= 2.5), Fair (>= 1.5), or Poor.
/// Fixed policy, not configurable.
pub fn overall_condition(checklist: &Checklist) -> Rating {
    let entries = checklist.entries();
    let total: u32 = entries
        .iter()
        .map(|(_, rating)| rating.map(Rating::score).unwrap_or(0))
        .sum();
    classify_average(f64::from(total) / entries.len() as f64)
}

/// Map an average score onto the condition label
pub fn classify_average(average: f64) -> Rating {
    if average >= 2.5 {
        Rating::Good
    } else if average >= 1.5 {
        Rating::Fair
    } else {
        Rating::Poor
    }
}

/// Inspector or client identity denormalized into a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub email: String,
}

/// Checklist snapshot plus derived summary fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub checklist: Checklist,
    pub overall_condition: Rating,
    pub notes: String,
    pub total_images: usize,
}

/// Derived projection of a completed inspection record.
///
/// Never persisted separately; recomputed from the record's current state on
/// every read, so post-generation edits to notes or images show up in later
/// fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_id: String,
    pub inspection_id: String,
    pub generated_at: DateTime<Utc>,
    pub property_address: String,
    pub inspector: Party,
    pub client: Party,
    pub summary: ReportSummary,
    pub images: Vec<ImageRef>,
}

impl Report {
    /// Assemble the report projection from the record's current state
    pub fn project(record: &InspectionRecord, generated_at: DateTime<Utc>) -> Self {
        Self {
            report_id: report_id(&record.inspection_id),
            inspection_id: record.inspection_id.clone(),
            generated_at,
            property_address: record.property_address.clone(),
            inspector: Party {
                name: record.inspector_name.clone(),
                email: record.inspector_email.clone(),
            },
            client: Party {
                name: record.client_name.clone(),
                email: record.client_email.clone(),
            },
            summary: ReportSummary {
                checklist: record.checklist,
                overall_condition: overall_condition(&record.checklist),
                notes: record.notes.clone(),
                total_images: record.images.len(),
            },
            images: record.images.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InspectionStatus;

    fn checklist(ratings: [Rating; 5]) -> Checklist {
        Checklist {
            roof: Some(ratings[0]),
            foundation: Some(ratings[1]),
            plumbing: Some(ratings[2]),
            electrical: Some(ratings[3]),
            hvac: Some(ratings[4]),
        }
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify_average(3.0), Rating::Good);
        assert_eq!(classify_average(2.5), Rating::Good);
        assert_eq!(classify_average(2.49), Rating::Fair);
        assert_eq!(classify_average(1.5), Rating::Fair);
        assert_eq!(classify_average(1.49), Rating::Poor);
        assert_eq!(classify_average(1.0), Rating::Poor);
    }

    #[test]
    fn test_all_good_is_good() {
        let list = checklist([Rating::Good; 5]);
        assert_eq!(overall_condition(&list), Rating::Good);
    }

    #[test]
    fn test_mixed_scenario_is_fair() {
        // scores [3, 3, 2, 3, 1], average 2.4
        let list = checklist([
            Rating::Good,
            Rating::Good,
            Rating::Fair,
            Rating::Good,
            Rating::Poor,
        ]);
        assert_eq!(overall_condition(&list), Rating::Fair);
    }

    #[test]
    fn test_all_poor_is_poor() {
        let list = checklist([Rating::Poor; 5]);
        assert_eq!(overall_condition(&list), Rating::Poor);
    }

    #[test]
    fn test_unknown_ratings_score_zero() {
        // [3, 3, 3, 3, 0], average 2.4
        let list = checklist([
            Rating::Good,
            Rating::Good,
            Rating::Good,
            Rating::Good,
            Rating::Unknown,
        ]);
        assert_eq!(overall_condition(&list), Rating::Fair);
    }

    #[test]
    fn test_projection_snapshots_record_state() {
        let list = checklist([
            Rating::Good,
            Rating::Good,
            Rating::Fair,
            Rating::Good,
            Rating::Poor,
        ]);
        let record = InspectionRecord {
            inspection_id: "insp_1a2b3c4d".to_string(),
            property_address: "12 Elm St".to_string(),
            inspector_name: "Jo Field".to_string(),
            inspector_email: "jo@example.com".to_string(),
            client_name: "Sam Buyer".to_string(),
            client_email: "sam@example.com".to_string(),
            status: InspectionStatus::InProgress,
            checklist: list,
            notes: "Gutters need attention".to_string(),
            images: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            report_generated_at: None,
        };

        let now = Utc::now();
        let report = Report::project(&record, now);

        assert_eq!(report.report_id, "report_insp_1a2b3c4d");
        assert_eq!(report.generated_at, now);
        assert_eq!(report.summary.checklist, list);
        assert_eq!(report.summary.overall_condition, Rating::Fair);
        assert_eq!(report.summary.total_images, 0);
        assert_eq!(report.inspector.email, "jo@example.com");
    }
}

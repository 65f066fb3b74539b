use crate::publisher::EventPublisher;
use chrono::Utc;
use inspection_contracts::error::ServiceError;
use inspection_contracts::event::ReportGeneratedEvent;
use inspection_contracts::record::InspectionStatus;
use inspection_contracts::report::Report;
use inspection_contracts::store::RecordStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The report generation pipeline.
///
/// Two stages per generate call: a transactional core (fetch, validate,
/// project, status transition) that must succeed, and an advisory notify
/// stage whose failure is logged and swallowed.
pub struct ReportGenerator {
    store: Arc<dyn RecordStore>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn RecordStore>, publisher: Option<Arc<dyn EventPublisher>>) -> Self {
        Self { store, publisher }
    }

    /// Generate the report for an inspection.
    ///
    /// Fails with NotFound if the record is missing and Validation if any
    /// checklist category is unrated; neither failure mutates the record or
    /// publishes. Re-generation on an already-generated inspection recomputes,
    /// re-stamps, and re-publishes.
    #[instrument(skip(self))]
    pub async fn generate(&self, inspection_id: &str) -> Result<Report, ServiceError> {
        let record = self
            .store
            .get(inspection_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Inspection not found"))?;

        if !record.checklist.is_complete() {
            return Err(ServiceError::validation(
                "Inspection checklist is incomplete",
            ));
        }

        let now = Utc::now();
        let report = Report::project(&record, now);

        // Transactional core: the status-only transition must succeed
        self.store.mark_report_generated(inspection_id, now).await?;

        // Advisory stage: publish failure never fails the request
        match &self.publisher {
            Some(publisher) => {
                let event = ReportGeneratedEvent::for_report(&record, &report);
                if let Err(error) = publisher.publish(&event).await {
                    warn!(
                        error = %error,
                        inspection_id,
                        "notification publish failed (non-fatal)"
                    );
                    metrics::counter!("reports.publish_failures").increment(1);
                }
            }
            None => {
                warn!("notification bus not configured, skipping publish");
            }
        }

        metrics::counter!("reports.generated").increment(1);
        info!(
            inspection_id,
            report_id = %report.report_id,
            overall_condition = ?report.summary.overall_condition,
            "report generated"
        );

        Ok(report)
    }

    /// Rebuild the report from the record's current state.
    ///
    /// The projection is not frozen: record mutations made after generation
    /// show up here.
    #[instrument(skip(self))]
    pub async fn fetch(&self, inspection_id: &str) -> Result<Report, ServiceError> {
        let record = self
            .store
            .get(inspection_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Inspection not found"))?;

        if record.status != InspectionStatus::ReportGenerated {
            return Err(ServiceError::validation(
                "Report has not been generated for this inspection",
            ));
        }

        let generated_at = record.report_generated_at.unwrap_or(record.updated_at);
        Ok(Report::project(&record, generated_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use inspection_contracts::record::{
        Checklist, ImageRef, InspectionRecord, InspectionUpdate, Rating,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStore {
        records: Mutex<HashMap<String, InspectionRecord>>,
    }

    impl MemoryStore {
        fn with_record(record: InspectionRecord) -> Arc<Self> {
            let mut records = HashMap::new();
            records.insert(record.inspection_id.clone(), record);
            Arc::new(Self {
                records: Mutex::new(records),
            })
        }

        fn snapshot(&self, inspection_id: &str) -> InspectionRecord {
            self.records.lock().unwrap()[inspection_id].clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn put(&self, record: &InspectionRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.inspection_id.clone(), record.clone());
            Ok(())
        }

        async fn get(&self, inspection_id: &str) -> Result<Option<InspectionRecord>> {
            Ok(self.records.lock().unwrap().get(inspection_id).cloned())
        }

        async fn list_by_status(
            &self,
            status: InspectionStatus,
        ) -> Result<Vec<InspectionRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|record| record.status == status)
                .cloned()
                .collect())
        }

        async fn list_all(&self) -> Result<Vec<InspectionRecord>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn apply_update(
            &self,
            inspection_id: &str,
            update: &InspectionUpdate,
        ) -> Result<Option<InspectionRecord>> {
            let mut records = self.records.lock().unwrap();
            let Some(record) = records.get_mut(inspection_id) else {
                return Ok(None);
            };
            if let Some(checklist) = update.checklist {
                record.checklist = checklist;
            }
            if let Some(ref notes) = update.notes {
                record.notes = notes.clone();
            }
            record.updated_at = Utc::now();
            Ok(Some(record.clone()))
        }

        async fn mark_report_generated(
            &self,
            inspection_id: &str,
            at: DateTime<Utc>,
        ) -> Result<()> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .get_mut(inspection_id)
                .ok_or_else(|| anyhow::anyhow!("missing record"))?;
            record.status = InspectionStatus::ReportGenerated;
            record.report_generated_at = Some(at);
            record.updated_at = at;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<ReportGeneratedEvent>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &ReportGeneratedEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _event: &ReportGeneratedEvent) -> Result<()> {
            Err(anyhow::anyhow!("broker unreachable"))
        }
    }

    fn complete_record() -> InspectionRecord {
        InspectionRecord {
            inspection_id: "insp_1a2b3c4d".to_string(),
            property_address: "12 Elm St".to_string(),
            inspector_name: "Jo Field".to_string(),
            inspector_email: "jo@example.com".to_string(),
            client_name: "Sam Buyer".to_string(),
            client_email: "sam@example.com".to_string(),
            status: InspectionStatus::InProgress,
            checklist: Checklist {
                roof: Some(Rating::Good),
                foundation: Some(Rating::Good),
                plumbing: Some(Rating::Fair),
                electrical: Some(Rating::Good),
                hvac: Some(Rating::Poor),
            },
            notes: "Gutters need attention".to_string(),
            images: vec![ImageRef {
                image_id: "img_9f8e7d6c".to_string(),
                s3_key: "inspections/insp_1a2b3c4d/img_9f8e7d6c.jpg".to_string(),
                description: "porch.jpg".to_string(),
                uploaded_at: Utc::now(),
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            report_generated_at: None,
        }
    }

    #[tokio::test]
    async fn test_generate_missing_record_is_not_found() {
        let store = MemoryStore::with_record(complete_record());
        let generator = ReportGenerator::new(store, None);

        let result = generator.generate("insp_missing").await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_generate_incomplete_checklist_mutates_nothing() {
        let mut record = complete_record();
        record.checklist.hvac = None;
        let before = record.clone();

        let store = MemoryStore::with_record(record);
        let publisher = Arc::new(RecordingPublisher::default());
        let generator = ReportGenerator::new(store.clone(), Some(publisher.clone()));

        let result = generator.generate("insp_1a2b3c4d").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        // No status mutation and no publish
        assert_eq!(store.snapshot("insp_1a2b3c4d"), before);
        assert!(publisher.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_success_transitions_status_only() {
        let record = complete_record();
        let before = record.clone();

        let store = MemoryStore::with_record(record);
        let publisher = Arc::new(RecordingPublisher::default());
        let generator = ReportGenerator::new(store.clone(), Some(publisher.clone()));

        let report = generator.generate("insp_1a2b3c4d").await.unwrap();

        // Report mirrors the record verbatim
        assert_eq!(report.summary.checklist, before.checklist);
        assert_eq!(report.summary.overall_condition, Rating::Fair);
        assert_eq!(report.summary.notes, before.notes);
        assert_eq!(report.summary.total_images, 1);
        assert_eq!(report.report_id, "report_insp_1a2b3c4d");

        // Status and timestamps transitioned; everything else untouched
        let after = store.snapshot("insp_1a2b3c4d");
        assert_eq!(after.status, InspectionStatus::ReportGenerated);
        assert_eq!(after.report_generated_at, Some(report.generated_at));
        assert_eq!(after.checklist, before.checklist);
        assert_eq!(after.notes, before.notes);
        assert_eq!(after.images, before.images);

        // Exactly one event, carrying both emails
        let events = publisher.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].inspection_id, "insp_1a2b3c4d");
        assert_eq!(events[0].client_email.as_deref(), Some("sam@example.com"));
    }

    #[tokio::test]
    async fn test_generate_empty_client_email_omitted_from_event() {
        let mut record = complete_record();
        record.client_email = String::new();

        let store = MemoryStore::with_record(record);
        let publisher = Arc::new(RecordingPublisher::default());
        let generator = ReportGenerator::new(store, Some(publisher.clone()));

        generator.generate("insp_1a2b3c4d").await.unwrap();

        let events = publisher.events.lock().unwrap();
        assert_eq!(events[0].client_email, None);
    }

    #[tokio::test]
    async fn test_publish_failure_is_absorbed() {
        let store = MemoryStore::with_record(complete_record());
        let generator = ReportGenerator::new(store.clone(), Some(Arc::new(FailingPublisher)));

        let report = generator.generate("insp_1a2b3c4d").await.unwrap();

        assert_eq!(report.report_id, "report_insp_1a2b3c4d");
        let after = store.snapshot("insp_1a2b3c4d");
        assert_eq!(after.status, InspectionStatus::ReportGenerated);
    }

    #[tokio::test]
    async fn test_generate_without_bus_configured() {
        let store = MemoryStore::with_record(complete_record());
        let generator = ReportGenerator::new(store, None);

        let report = generator.generate("insp_1a2b3c4d").await.unwrap();
        assert_eq!(report.summary.overall_condition, Rating::Fair);
    }

    #[tokio::test]
    async fn test_fetch_before_generation_is_validation_failure() {
        let store = MemoryStore::with_record(complete_record());
        let generator = ReportGenerator::new(store, None);

        let result = generator.fetch("insp_1a2b3c4d").await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_fetch_reflects_later_record_mutations() {
        let store = MemoryStore::with_record(complete_record());
        let generator = ReportGenerator::new(store.clone(), None);

        let generated = generator.generate("insp_1a2b3c4d").await.unwrap();
        let fetched = generator.fetch("insp_1a2b3c4d").await.unwrap();
        assert_eq!(fetched, generated);

        // The projection is recomputed from current state, not frozen
        store
            .apply_update(
                "insp_1a2b3c4d",
                &InspectionUpdate {
                    notes: Some("updated after generation".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let refetched = generator.fetch("insp_1a2b3c4d").await.unwrap();
        assert_eq!(refetched.summary.notes, "updated after generation");
        assert_eq!(refetched.generated_at, generated.generated_at);
    }

    #[tokio::test]
    async fn test_regeneration_republishes() {
        let store = MemoryStore::with_record(complete_record());
        let publisher = Arc::new(RecordingPublisher::default());
        let generator = ReportGenerator::new(store, Some(publisher.clone()));

        generator.generate("insp_1a2b3c4d").await.unwrap();
        generator.generate("insp_1a2b3c4d").await.unwrap();

        assert_eq!(publisher.events.lock().unwrap().len(), 2);
    }
}

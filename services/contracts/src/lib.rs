//! Inspection Contracts - shared data contracts for the inspection platform
//!
//! This library provides the types and storage client shared by the
//! inspection platform services. It handles:
//!
//! - Inspection records and their checklist/status lifecycle
//! - Derived report projections with overall-condition scoring
//! - Notification events published on report generation
//! - The DynamoDB-backed record store behind all three services
//!
//! # Example
//!
//! ```rust,no_run
//! use inspection_contracts::record::NewInspection;
//! use inspection_contracts::store::{DynamoRecordStore, RecordStore, RecordStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RecordStoreConfig {
//!         table_name: "InspectionsTable".to_string(),
//!         ..Default::default()
//!     };
//!     let store = DynamoRecordStore::new(&config).await?;
//!     let record = store.get("insp_1a2b3c4d").await?;
//!     println!("{record:?}");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod event;
pub mod record;
pub mod report;
pub mod store;

// Re-export main types
pub use error::ServiceError;
pub use event::{
    BatchOutcome, EventEnvelope, EventOutcome, OutcomeStatus, ReportGeneratedEvent,
    REPORT_GENERATED,
};
pub use record::{
    Checklist, ImageRef, InspectionRecord, InspectionStatus, InspectionUpdate, NewInspection,
    Rating,
};
pub use report::{overall_condition, Party, Report, ReportSummary};
pub use store::{DynamoRecordStore, RecordStore, RecordStoreConfig};

use crate::record::{
    record_pk, status_key, InspectionRecord, InspectionStatus, InspectionUpdate, RECORD_KEY_PREFIX,
    RECORD_SORT_KEY,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Builder as DynamoConfigBuilder;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecordStoreConfig {
    /// Table holding inspection record items
    pub table_name: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for DynamoDB Local, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Name of the status index
    #[serde(default = "default_status_index")]
    pub status_index: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_status_index() -> String {
    "GSI1".to_string()
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            region: default_region(),
            endpoint_url: None,
            status_index: default_status_index(),
        }
    }
}

/// Storage operations over inspection records.
///
/// Writes are unconditional: there is no versioning or locking, and the
/// status transition is last-writer-wins by design.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record
    async fn put(&self, record: &InspectionRecord) -> Result<()>;

    /// Fetch a record by inspection identifier
    async fn get(&self, inspection_id: &str) -> Result<Option<InspectionRecord>>;

    /// Records with the given status, newest first
    async fn list_by_status(&self, status: InspectionStatus) -> Result<Vec<InspectionRecord>>;

    /// All inspection records, newest first
    async fn list_all(&self) -> Result<Vec<InspectionRecord>>;

    /// Apply a partial update; returns the updated record, or None if the
    /// record does not exist
    async fn apply_update(
        &self,
        inspection_id: &str,
        update: &InspectionUpdate,
    ) -> Result<Option<InspectionRecord>>;

    /// Transition the record to REPORT_GENERATED, touching only the status,
    /// status-index key, and the two timestamps
    async fn mark_report_generated(&self, inspection_id: &str, at: DateTime<Utc>) -> Result<()>;
}

/// DynamoDB-backed record store.
///
/// Items live in a single table keyed `PK = INSPECTION#{id}` /
/// `SK = METADATA`, with a status-prefixed `GSI1PK` kept in sync with the
/// status field on every status-changing write.
pub struct DynamoRecordStore {
    client: DynamoClient,
    table: String,
    status_index: String,
}

impl DynamoRecordStore {
    /// Create a new record store client
    pub async fn new(config: &RecordStoreConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = DynamoConfigBuilder::from(&aws_config);
        if let Some(ref endpoint_url) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        let client = DynamoClient::from_conf(builder.build());

        info!(
            table = %config.table_name,
            region = %config.region,
            "record store initialized"
        );

        Ok(Self {
            client,
            table: config.table_name.clone(),
            status_index: config.status_index.clone(),
        })
    }

    fn record_key(inspection_id: &str) -> (AttributeValue, AttributeValue) {
        (
            AttributeValue::S(record_pk(inspection_id)),
            AttributeValue::S(RECORD_SORT_KEY.to_string()),
        )
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    #[instrument(skip(self, record), fields(inspection_id = %record.inspection_id))]
    async fn put(&self, record: &InspectionRecord) -> Result<()> {
        let item = to_item(record)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .context("Failed to put inspection record")?;

        debug!(inspection_id = %record.inspection_id, "record stored");
        Ok(())
    }

    async fn get(&self, inspection_id: &str) -> Result<Option<InspectionRecord>> {
        let (pk, sk) = Self::record_key(inspection_id);
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("PK", pk)
            .key("SK", sk)
            .send()
            .await
            .context("Failed to get inspection record")?;

        output.item.as_ref().map(from_item).transpose()
    }

    #[instrument(skip(self))]
    async fn list_by_status(&self, status: InspectionStatus) -> Result<Vec<InspectionRecord>> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(&self.status_index)
            .key_condition_expression("GSI1PK = :status_key")
            .expression_attribute_values(":status_key", AttributeValue::S(status_key(status)))
            .scan_index_forward(false)
            .send()
            .await
            .context("Failed to query records by status")?;

        output.items().iter().map(from_item).collect()
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<InspectionRecord>> {
        let output = self
            .client
            .scan()
            .table_name(&self.table)
            .filter_expression("begins_with(PK, :prefix)")
            .expression_attribute_values(":prefix", AttributeValue::S(RECORD_KEY_PREFIX.to_string()))
            .send()
            .await
            .context("Failed to scan inspection records")?;

        let mut records: Vec<InspectionRecord> =
            output.items().iter().map(from_item).collect::<Result<_>>()?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    #[instrument(skip(self, update))]
    async fn apply_update(
        &self,
        inspection_id: &str,
        update: &InspectionUpdate,
    ) -> Result<Option<InspectionRecord>> {
        // Existence check first; update_item would otherwise create a bare item
        if self.get(inspection_id).await?.is_none() {
            return Ok(None);
        }

        let (expression, values, names) = build_update_expression(update, Utc::now())?;

        let (pk, sk) = Self::record_key(inspection_id);
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("PK", pk)
            .key("SK", sk)
            .update_expression(expression)
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew);
        if !names.is_empty() {
            request = request.set_expression_attribute_names(Some(names));
        }

        let output = request
            .send()
            .await
            .context("Failed to update inspection record")?;

        debug!(inspection_id, "record updated");
        output.attributes.as_ref().map(from_item).transpose()
    }

    #[instrument(skip(self))]
    async fn mark_report_generated(&self, inspection_id: &str, at: DateTime<Utc>) -> Result<()> {
        let timestamp = AttributeValue::S(at.to_rfc3339_opts(SecondsFormat::Millis, true));
        let status = InspectionStatus::ReportGenerated;

        let (pk, sk) = Self::record_key(inspection_id);
        self.client
            .update_item()
            .table_name(&self.table)
            .key("PK", pk)
            .key("SK", sk)
            .update_expression(
                "SET #status = :status, GSI1PK = :status_key, \
                 reportGeneratedAt = :generated_at, updatedAt = :updated_at",
            )
            .expression_attribute_names("#status", "status")
            .expression_attribute_values(":status", AttributeValue::S(status.as_str().to_string()))
            .expression_attribute_values(":status_key", AttributeValue::S(status_key(status)))
            .expression_attribute_values(":generated_at", timestamp.clone())
            .expression_attribute_values(":updated_at", timestamp)
            .send()
            .await
            .context("Failed to transition record status")?;

        debug!(inspection_id, "record transitioned to REPORT_GENERATED");
        Ok(())
    }
}

/// Build the dynamic SET expression for a partial update.
///
/// Only fields present in the update appear; a status change also rewrites
/// the status-index key, and updatedAt is always stamped.
fn build_update_expression(
    update: &InspectionUpdate,
    now: DateTime<Utc>,
) -> Result<(
    String,
    HashMap<String, AttributeValue>,
    HashMap<String, String>,
)> {
    let mut clauses = vec!["updatedAt = :updated_at".to_string()];
    let mut values = HashMap::new();
    let mut names = HashMap::new();

    values.insert(
        ":updated_at".to_string(),
        AttributeValue::S(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    if let Some(ref checklist) = update.checklist {
        clauses.push("checklist = :checklist".to_string());
        let value = serde_json::to_value(checklist).context("serialize checklist")?;
        values.insert(":checklist".to_string(), to_attr(value));
    }
    if let Some(ref notes) = update.notes {
        clauses.push("notes = :notes".to_string());
        values.insert(":notes".to_string(), AttributeValue::S(notes.clone()));
    }
    if let Some(ref images) = update.images {
        clauses.push("images = :images".to_string());
        let value = serde_json::to_value(images).context("serialize images")?;
        values.insert(":images".to_string(), to_attr(value));
    }
    if let Some(ref client_name) = update.client_name {
        clauses.push("clientName = :client_name".to_string());
        values.insert(
            ":client_name".to_string(),
            AttributeValue::S(client_name.clone()),
        );
    }
    if let Some(ref client_email) = update.client_email {
        clauses.push("clientEmail = :client_email".to_string());
        values.insert(
            ":client_email".to_string(),
            AttributeValue::S(client_email.clone()),
        );
    }
    if let Some(status) = update.status {
        clauses.push("#status = :status".to_string());
        clauses.push("GSI1PK = :status_key".to_string());
        values.insert(
            ":status".to_string(),
            AttributeValue::S(status.as_str().to_string()),
        );
        values.insert(":status_key".to_string(), AttributeValue::S(status_key(status)));
        names.insert("#status".to_string(), "status".to_string());
    }

    Ok((format!("SET {}", clauses.join(", ")), values, names))
}

/// Marshal a record into a DynamoDB item, adding the table key attributes
fn to_item(record: &InspectionRecord) -> Result<HashMap<String, AttributeValue>> {
    let value = serde_json::to_value(record).context("serialize record")?;
    let serde_json::Value::Object(map) = value else {
        anyhow::bail!("inspection record did not serialize to an object");
    };

    let mut item: HashMap<String, AttributeValue> =
        map.into_iter().map(|(key, value)| (key, to_attr(value))).collect();

    item.insert(
        "PK".to_string(),
        AttributeValue::S(record_pk(&record.inspection_id)),
    );
    item.insert(
        "SK".to_string(),
        AttributeValue::S(RECORD_SORT_KEY.to_string()),
    );
    item.insert("GSI1PK".to_string(), AttributeValue::S(status_key(record.status)));
    item.insert(
        "GSI1SK".to_string(),
        AttributeValue::S(record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    Ok(item)
}

/// Unmarshal a DynamoDB item into a record, stripping the key attributes
fn from_item(item: &HashMap<String, AttributeValue>) -> Result<InspectionRecord> {
    let map: serde_json::Map<String, serde_json::Value> = item
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "PK" | "SK" | "GSI1PK" | "GSI1SK"))
        .map(|(key, attr)| (key.clone(), from_attr(attr)))
        .collect();

    serde_json::from_value(serde_json::Value::Object(map))
        .context("deserialize inspection record item")
}

/// JSON value -> DynamoDB attribute (the document-client marshalling)
fn to_attr(value: serde_json::Value) -> AttributeValue {
    use serde_json::Value;
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(to_attr).collect()),
        Value::Object(map) => AttributeValue::M(
            map.into_iter().map(|(key, value)| (key, to_attr(value))).collect(),
        ),
    }
}

/// DynamoDB attribute -> JSON value
fn from_attr(attr: &AttributeValue) -> serde_json::Value {
    use serde_json::Value;
    match attr {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => {
            if let Ok(int) = number.parse::<i64>() {
                Value::from(int)
            } else if let Ok(float) = number.parse::<f64>() {
                Value::from(float)
            } else {
                Value::Null
            }
        }
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attr).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), from_attr(value)))
                .collect(),
        ),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Checklist, ImageRef, Rating};

    fn sample_record() -> InspectionRecord {
        InspectionRecord {
            inspection_id: "insp_1a2b3c4d".to_string(),
            property_address: "12 Elm St".to_string(),
            inspector_name: "Jo Field".to_string(),
            inspector_email: "jo@example.com".to_string(),
            client_name: "Sam Buyer".to_string(),
            client_email: "sam@example.com".to_string(),
            status: InspectionStatus::Draft,
            checklist: Checklist {
                roof: Some(Rating::Good),
                ..Default::default()
            },
            notes: "first pass".to_string(),
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

    #[test]
    fn test_item_round_trip() {
        let record = sample_record();
        let item = to_item(&record).unwrap();

        assert_eq!(
            item["PK"],
            AttributeValue::S("INSPECTION#insp_1a2b3c4d".to_string())
        );
        assert_eq!(item["SK"], AttributeValue::S("METADATA".to_string()));
        assert_eq!(item["GSI1PK"], AttributeValue::S("STATUS#DRAFT".to_string()));
        // Unrated categories are stored as explicit nulls
        match &item["checklist"] {
            AttributeValue::M(map) => {
                assert_eq!(map["roof"], AttributeValue::S("Good".to_string()));
                assert_eq!(map["hvac"], AttributeValue::Null(true));
            }
            other => panic!("checklist stored as {other:?}"),
        }

        let parsed = from_item(&item).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_update_expression_partial_fields() {
        let update = InspectionUpdate {
            notes: Some("roof re-checked".to_string()),
            ..Default::default()
        };
        let (expression, values, names) =
            build_update_expression(&update, Utc::now()).unwrap();

        assert_eq!(expression, "SET updatedAt = :updated_at, notes = :notes");
        assert!(values.contains_key(":notes"));
        assert!(names.is_empty());
    }

    #[test]
    fn test_update_expression_status_syncs_index_key() {
        let update = InspectionUpdate {
            status: Some(InspectionStatus::InProgress),
            ..Default::default()
        };
        let (expression, values, names) =
            build_update_expression(&update, Utc::now()).unwrap();

        assert!(expression.contains("#status = :status"));
        assert!(expression.contains("GSI1PK = :status_key"));
        assert_eq!(
            values[":status_key"],
            AttributeValue::S("STATUS#IN_PROGRESS".to_string())
        );
        assert_eq!(names["#status"], "status");
    }

    #[test]
    fn test_attr_conversion_nested() {
        let value = serde_json::json!({
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "missing": null,
        });
        let attr = to_attr(value.clone());
        assert_eq!(from_attr(&attr), value);
    }
}

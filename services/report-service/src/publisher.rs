use crate::config::BusConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use inspection_contracts::event::{ReportGeneratedEvent, REPORT_GENERATED};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Publisher for report-generated notification events.
///
/// A single publish attempt per event; callers treat any failure as advisory.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ReportGeneratedEvent) -> Result<()>;
}

/// Kafka-backed publisher for the notifications topic
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaPublisher {
    /// Create a new publisher from the bus configuration
    pub fn new(config: &BusConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("message.timeout.ms", config.request_timeout_ms.to_string())
            .create()
            .context("Failed to create Kafka producer")?;

        info!(topic = %config.topic, "notification publisher initialized");

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            timeout: config.request_timeout(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, event: &ReportGeneratedEvent) -> Result<()> {
        let payload =
            serde_json::to_vec(event).context("Failed to serialize notification event")?;

        let headers = OwnedHeaders::new().insert(Header {
            key: "event-type",
            value: Some(REPORT_GENERATED),
        });

        let record = FutureRecord::to(&self.topic)
            .key(&event.inspection_id)
            .payload(&payload)
            .headers(headers);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(error, _)| {
                anyhow::anyhow!("Failed to publish notification event: {error}")
            })?;

        debug!(
            inspection_id = %event.inspection_id,
            topic = %self.topic,
            "notification event published"
        );

        Ok(())
    }
}

impl Drop for KafkaPublisher {
    fn drop(&mut self) {
        if let Err(error) = self.producer.flush(Timeout::After(Duration::from_secs(5))) {
            warn!("Failed to flush producer on shutdown: {error}");
        }
    }
}

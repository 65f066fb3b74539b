use crate::config::{BatchConfig, BusConfig};
use crate::handler::NotificationHandler;
use anyhow::{Context, Result};
use futures::StreamExt;
use inspection_contracts::event::{EventEnvelope, OutcomeStatus};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Bus consumer that accumulates events into batches before dispatch.
///
/// Offsets commit only after a batch is handed to the handler, so a crash
/// mid-batch re-delivers; the handler tolerates duplicates.
pub struct NotificationConsumer {
    consumer: StreamConsumer,
    handler: Arc<NotificationHandler>,
    batch: BatchConfig,
}

impl NotificationConsumer {
    pub fn new(
        config: &BusConfig,
        batch: BatchConfig,
        handler: Arc<NotificationHandler>,
    ) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set(
                "max.poll.interval.ms",
                config.max_poll_interval_ms.to_string(),
            )
            .create()
            .context("Failed to create Kafka consumer")?;

        consumer
            .subscribe(&[&config.topic])
            .context("Failed to subscribe to notifications topic")?;

        info!(
            topic = %config.topic,
            group = %config.consumer_group,
            "Subscribed to Kafka topic"
        );

        Ok(Self {
            consumer,
            handler,
            batch,
        })
    }

    /// Consume until the stream ends, dispatching batches as they fill.
    ///
    /// A batch dispatches at max_batch_size, or when linger elapses after
    /// its first message.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        info!(
            max_batch_size = self.batch.max_batch_size,
            linger_ms = self.batch.linger_ms,
            "Starting notification consumer"
        );

        let mut stream = self.consumer.stream();
        let mut batch: Vec<EventEnvelope> = Vec::with_capacity(self.batch.max_batch_size);

        loop {
            // Block for the batch's first message
            let Some(first) = stream.next().await else {
                break;
            };
            self.accept(first, &mut batch);

            // Accumulate until full or the linger window closes
            while batch.len() < self.batch.max_batch_size {
                match tokio::time::timeout(self.batch.linger(), stream.next()).await {
                    Ok(Some(next)) => self.accept(next, &mut batch),
                    Ok(None) => break,
                    Err(_) => break, // linger elapsed
                }
            }

            if batch.is_empty() {
                continue;
            }

            self.dispatch(&batch).await;
            batch.clear();
        }

        // Stream ended with a partial batch pending
        if !batch.is_empty() {
            self.dispatch(&batch).await;
        }

        Ok(())
    }

    fn accept(
        &self,
        message: rdkafka::error::KafkaResult<BorrowedMessage<'_>>,
        batch: &mut Vec<EventEnvelope>,
    ) {
        match message {
            Ok(message) => {
                debug!(
                    partition = message.partition(),
                    offset = message.offset(),
                    "Received event"
                );
                batch.push(envelope_from(&message));
            }
            Err(error) => {
                error!(error = %error, "Kafka consumer error");
                metrics::counter!("notifications.kafka_errors").increment(1);
            }
        }
    }

    async fn dispatch(&self, batch: &[EventEnvelope]) {
        let outcome = self.handler.process_batch(batch).await;

        info!(
            processed = outcome.processed,
            succeeded = outcome
                .outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Success)
                .count(),
            "Batch processed"
        );

        // Per-item failures are recorded in outcomes; the batch still commits
        if let Err(error) = self.consumer.commit_consumer_state(CommitMode::Async) {
            warn!(error = %error, "Failed to commit offsets");
        }
    }
}

/// Envelope id layout: topic-partition-offset, unique within the cluster
fn envelope_from(message: &BorrowedMessage<'_>) -> EventEnvelope {
    let body = message
        .payload()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default();

    EventEnvelope {
        message_id: format!(
            "{}-{}-{}",
            message.topic(),
            message.partition(),
            message.offset()
        ),
        body,
    }
}

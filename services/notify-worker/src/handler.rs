use crate::notifier::{NotificationMessage, Notifier};
use anyhow::Result;
use inspection_contracts::event::{
    BatchOutcome, EventEnvelope, EventOutcome, OutcomeStatus, ReportGeneratedEvent,
    REPORT_GENERATED,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Processes batches of bus-delivered notification events.
///
/// Failure isolation is per envelope: a malformed or undeliverable item
/// yields an error outcome while its batch siblings proceed.
pub struct NotificationHandler {
    notifier: Arc<dyn Notifier>,
}

impl NotificationHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Process one accumulated batch, returning a per-item outcome summary
    #[instrument(skip(self, envelopes), fields(batch_size = envelopes.len()))]
    pub async fn process_batch(&self, envelopes: &[EventEnvelope]) -> BatchOutcome {
        let mut outcomes = Vec::with_capacity(envelopes.len());

        for envelope in envelopes {
            let outcome = self.process_one(envelope).await;
            match outcome.status {
                OutcomeStatus::Success => metrics::counter!("notifications.sent").increment(1),
                OutcomeStatus::Skipped => metrics::counter!("notifications.skipped").increment(1),
                OutcomeStatus::Error => metrics::counter!("notifications.failed").increment(1),
            }
            outcomes.push(outcome);
        }

        BatchOutcome {
            processed: outcomes.len(),
            outcomes,
        }
    }

    async fn process_one(&self, envelope: &EventEnvelope) -> EventOutcome {
        let event: ReportGeneratedEvent = match serde_json::from_str(&envelope.body) {
            Ok(event) => event,
            Err(error) => {
                warn!(
                    message_id = %envelope.message_id,
                    error = %error,
                    "Malformed event payload"
                );
                return EventOutcome::error(&envelope.message_id, error.to_string());
            }
        };

        if event.event_type != REPORT_GENERATED {
            debug!(
                message_id = %envelope.message_id,
                event_type = %event.event_type,
                "Ignoring unrecognized event type"
            );
            return EventOutcome::skipped(&envelope.message_id);
        }

        match self.deliver(&event).await {
            Ok(recipients) => {
                info!(
                    inspection_id = %event.inspection_id,
                    recipients = recipients.len(),
                    "Notifications sent"
                );
                EventOutcome::success(&event.inspection_id, recipients)
            }
            Err(error) => {
                warn!(
                    inspection_id = %event.inspection_id,
                    error = %error,
                    "Notification delivery failed"
                );
                EventOutcome::error(&envelope.message_id, error.to_string())
            }
        }
    }

    async fn deliver(&self, event: &ReportGeneratedEvent) -> Result<Vec<String>> {
        let mut recipients = Vec::new();

        for message in build_notifications(event) {
            self.notifier.send(&message).await?;
            recipients.push(message.to);
        }

        Ok(recipients)
    }
}

/// Build the notification set for one report.
///
/// The inspector is always notified; the client only when the record carried
/// a client email.
pub fn build_notifications(event: &ReportGeneratedEvent) -> Vec<NotificationMessage> {
    let generated_at = event
        .generated_at
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string();

    let mut messages = vec![NotificationMessage {
        to: event.inspector_email.clone(),
        subject: format!("Inspection Report Ready - {}", event.property_address),
        body: format!(
            "The report for inspection {} at {} was generated on {}.\n\
             Report ID: {}",
            event.inspection_id, event.property_address, generated_at, event.report_id
        ),
    }];

    if let Some(ref client_email) = event.client_email {
        messages.push(NotificationMessage {
            to: client_email.clone(),
            subject: format!(
                "Property Inspection Report Available - {}",
                event.property_address
            ),
            body: format!(
                "The inspection report for {} is now available.\n\
                 Generated on {}. Please contact your inspector for access.",
                event.property_address, generated_at
            ),
        });
    }

    messages
}

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// One notification ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channel for notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &NotificationMessage) -> Result<()>;
}

/// Notifier that logs instead of delivering.
///
/// The default channel until a real email provider is wired in; the worker's
/// batching, isolation, and outcome semantics are independent of delivery.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Would send notification"
        );
        Ok(())
    }
}

use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the notification worker
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Notification bus configuration
    pub bus: BusConfig,
    /// Batch accumulation configuration
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Metrics port
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

/// Notification bus consumer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Kafka bootstrap servers
    pub bootstrap_servers: String,
    /// Topic carrying report-generated events
    #[serde(default = "default_notifications_topic")]
    pub topic: String,
    /// Consumer group id
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,
    /// Offset reset policy for a fresh group
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// Max poll interval in milliseconds
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
}

/// Batch accumulation configuration.
///
/// A batch dispatches when it reaches max_batch_size or when linger_ms
/// elapses after the first message, whichever comes first.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u64,
}

impl BatchConfig {
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

// Default value functions
fn default_service_name() -> String {
    "notify-worker".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9094
}

fn default_notifications_topic() -> String {
    "inspection.notifications".to_string()
}

fn default_consumer_group() -> String {
    "notify-worker".to_string()
}

fn default_auto_offset_reset() -> String {
    "earliest".to_string()
}

fn default_session_timeout_ms() -> u64 {
    6000
}

fn default_max_poll_interval_ms() -> u64 {
    300000
}

fn default_max_batch_size() -> usize {
    10
}

fn default_linger_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/notify").required(false))
            .add_source(config::File::with_name("/etc/inspection/notify").required(false))
            // NOTIFY__BUS__BOOTSTRAP_SERVERS -> bus.bootstrap_servers
            .add_source(
                config::Environment::with_prefix("NOTIFY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            linger_ms: default_linger_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_defaults() {
        let batch = BatchConfig::default();
        assert_eq!(batch.max_batch_size, 10);
        assert_eq!(batch.linger(), Duration::from_millis(1000));
    }
}

use inspection_contracts::store::RecordStoreConfig;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the report service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Record store configuration
    pub database: RecordStoreConfig,
    /// Notification bus configuration
    #[serde(default)]
    pub bus: BusConfig,
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,
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

/// Notification bus configuration.
///
/// The bus is optional: with no bootstrap servers configured the service
/// skips publishing entirely (non-fatal per the notification contract).
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    /// Kafka bootstrap servers; empty means "bus not configured"
    #[serde(default)]
    pub bootstrap_servers: String,
    /// Topic for report-generated notification events
    #[serde(default = "default_notifications_topic")]
    pub topic: String,
    /// Delivery timeout for the single publish attempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl BusConfig {
    pub fn is_configured(&self) -> bool {
        !self.bootstrap_servers.is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

// Default value functions
fn default_service_name() -> String {
    "report-service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9092
}

fn default_notifications_topic() -> String {
    "inspection.notifications".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    3002
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/report").required(false))
            .add_source(config::File::with_name("/etc/inspection/report").required(false))
            // REPORT__DATABASE__TABLE_NAME -> database.table_name
            .add_source(
                config::Environment::with_prefix("REPORT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
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

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: String::new(),
            topic: default_notifications_topic(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_defaults_unconfigured() {
        let bus = BusConfig::default();
        assert!(!bus.is_configured());
        assert_eq!(bus.topic, "inspection.notifications");
    }
}

use inspection_contracts::store::RecordStoreConfig;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration for the inspection API
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Record store configuration
    pub database: RecordStoreConfig,
    /// Image bucket configuration
    pub s3: S3Config,
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

/// S3 configuration for inspection images
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// Bucket holding inspection images
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (MinIO/LocalStack)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
    /// Upload URL lifetime in seconds
    #[serde(default = "default_upload_expiry_secs")]
    pub upload_expiry_secs: u64,
    /// Download URL lifetime in seconds
    #[serde(default = "default_download_expiry_secs")]
    pub download_expiry_secs: u64,
}

impl S3Config {
    pub fn upload_expiry(&self) -> Duration {
        Duration::from_secs(self.upload_expiry_secs)
    }

    pub fn download_expiry(&self) -> Duration {
        Duration::from_secs(self.download_expiry_secs)
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
    "inspection-api".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_upload_expiry_secs() -> u64 {
    300
}

fn default_download_expiry_secs() -> u64 {
    3600
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/api").required(false))
            .add_source(config::File::with_name("/etc/inspection/api").required(false))
            // API__DATABASE__TABLE_NAME -> database.table_name
            .add_source(
                config::Environment::with_prefix("API")
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
    fn test_expiry_defaults() {
        let s3: S3Config = serde_json::from_value(serde_json::json!({
            "bucket": "inspection-images"
        }))
        .unwrap();

        assert_eq!(s3.upload_expiry(), Duration::from_secs(300));
        assert_eq!(s3.download_expiry(), Duration::from_secs(3600));
        assert_eq!(s3.region, "us-east-1");
        assert!(!s3.force_path_style);
    }
}

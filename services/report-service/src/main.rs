mod config;
mod generator;
mod publisher;
mod routes;

use anyhow::{Context, Result};
use config::Config;
use generator::ReportGenerator;
use inspection_contracts::store::DynamoRecordStore;
use publisher::{EventPublisher, KafkaPublisher};
use routes::{start_api_server, AppState};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Inspection Report Service"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // Initialize components
    let store = Arc::new(
        DynamoRecordStore::new(&config.database)
            .await
            .context("Failed to initialize record store")?,
    );

    let publisher: Option<Arc<dyn EventPublisher>> = if config.bus.is_configured() {
        let kafka = KafkaPublisher::new(&config.bus).context("Failed to create event publisher")?;
        Some(Arc::new(kafka))
    } else {
        warn!("Notification bus not configured, reports will not be announced");
        None
    };

    let generator = Arc::new(ReportGenerator::new(store, publisher));

    // Spawn API server task
    let api_state = AppState { generator };
    let api_config = config.api.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = start_api_server(api_state, &api_config).await {
            error!(error = %e, "API server error");
        }
    });

    info!("Report service started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down report service");

    api_handle.abort();

    info!("Report service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}

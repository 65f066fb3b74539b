mod config;
mod consumer;
mod handler;
mod notifier;

use anyhow::{Context, Result};
use config::Config;
use consumer::NotificationConsumer;
use handler::NotificationHandler;
use notifier::LogNotifier;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Notification Worker"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    // Initialize components
    let handler = Arc::new(NotificationHandler::new(Arc::new(LogNotifier)));
    let consumer = NotificationConsumer::new(&config.bus, config.batch.clone(), handler)
        .context("Failed to initialize notification consumer")?;

    // Spawn consumer task
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer.run().await {
            error!(error = %e, "Notification consumer error");
        }
    });

    info!("Notification worker started successfully");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down notification worker");

    consumer_handle.abort();

    info!("Notification worker stopped");

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

use crate::config::ApiConfig;
use crate::generator::ReportGenerator;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inspection_contracts::error::ServiceError;
use inspection_contracts::report::Report;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ReportGenerator>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_reply(error: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    match error {
        ServiceError::NotFound(message) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: message,
                code: "NOT_FOUND".to_string(),
            }),
        ),
        ServiceError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: message,
                code: "VALIDATION_ERROR".to_string(),
            }),
        ),
        ServiceError::Unexpected(source) => {
            error!(error = %source, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                    code: "INTERNAL_ERROR".to_string(),
                }),
            )
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/api/reports/:inspection_id", post(generate_report))
        .route("/api/reports/:inspection_id", get(get_report))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "report-service",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Generate (or re-generate) the report for an inspection
#[instrument(skip(state))]
async fn generate_report(
    State(state): State<AppState>,
    Path(inspection_id): Path<String>,
) -> Result<Json<Report>, (StatusCode, Json<ErrorResponse>)> {
    let report = state
        .generator
        .generate(&inspection_id)
        .await
        .map_err(error_reply)?;
    Ok(Json(report))
}

/// Fetch the report for an already-generated inspection
#[instrument(skip(state))]
async fn get_report(
    State(state): State<AppState>,
    Path(inspection_id): Path<String>,
) -> Result<Json<Report>, (StatusCode, Json<ErrorResponse>)> {
    let report = state
        .generator
        .fetch(&inspection_id)
        .await
        .map_err(error_reply)?;
    Ok(Json(report))
}

/// Start the report API server
pub async fn start_api_server(state: AppState, config: &ApiConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting report API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reply_mapping() {
        let (status, body) = error_reply(ServiceError::not_found("Inspection not found"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");

        let (status, body) = error_reply(ServiceError::validation("Checklist incomplete"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Checklist incomplete");

        let (status, body) = error_reply(ServiceError::Unexpected(anyhow::anyhow!("boom")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // Internal detail stays out of the response body
        assert_eq!(body.error, "Internal server error");
    }
}

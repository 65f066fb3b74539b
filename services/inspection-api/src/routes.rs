use crate::config::ApiConfig;
use crate::image_store::ImageStore;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use inspection_contracts::record::{
    InspectionRecord, InspectionStatus, InspectionUpdate, NewInspection,
};
use inspection_contracts::store::RecordStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub image_store: Arc<ImageStore>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(error: anyhow::Error, action: &str) -> ApiError {
    error!(error = %error, "{action} failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
            code: "INTERNAL_ERROR".to_string(),
        }),
    )
}

fn not_found(message: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
            code: "NOT_FOUND".to_string(),
        }),
    )
}

fn validation_error(message: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message,
            code: "VALIDATION_ERROR".to_string(),
        }),
    )
}

/// Query parameters for the inspection list
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Filter by status (DRAFT, IN_PROGRESS, COMPLETED, REPORT_GENERATED)
    pub status: Option<String>,
}

/// List response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub inspections: Vec<InspectionRecord>,
    pub count: usize,
}

/// Pre-signed URL request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlRequest {
    pub inspection_id: String,
    /// "upload" or "download"
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Original filename; required for uploads
    #[serde(default)]
    pub file_name: String,
    /// MIME type for the uploaded object
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Existing object key; required for downloads
    #[serde(default)]
    pub s3_key: String,
}

fn default_operation() -> String {
    "upload".to_string()
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

/// Upload URL response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub s3_key: String,
    pub image_id: String,
    pub expires_in: u64,
}

/// Download URL response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub download_url: String,
    pub expires_in: u64,
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
        .route("/api/inspections", post(create_inspection))
        .route("/api/inspections", get(list_inspections))
        .route("/api/inspections/:inspection_id", get(get_inspection))
        .route("/api/inspections/:inspection_id", put(update_inspection))
        .route("/api/presigned-url", post(presigned_url))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "inspection-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Create a new inspection record
#[instrument(skip(state, request))]
async fn create_inspection(
    State(state): State<AppState>,
    Json(request): Json<NewInspection>,
) -> Result<(StatusCode, Json<InspectionRecord>), ApiError> {
    let record = request
        .into_record(Utc::now())
        .map_err(|e| validation_error(e.to_string()))?;

    state
        .store
        .put(&record)
        .await
        .map_err(|e| internal_error(e, "Create inspection"))?;

    metrics::counter!("inspections.created").increment(1);
    info!(inspection_id = %record.inspection_id, "Inspection created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// List inspections, optionally filtered by status.
///
/// An unrecognized status filter yields an empty list rather than an error,
/// matching the behavior of a status-index query on a key nothing carries.
#[instrument(skip(state))]
async fn list_inspections(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let inspections = match params.status.as_deref() {
        Some(raw) => match InspectionStatus::parse(raw) {
            Some(status) => state
                .store
                .list_by_status(status)
                .await
                .map_err(|e| internal_error(e, "List inspections"))?,
            None => {
                warn!(status = raw, "Unknown status filter, returning empty list");
                Vec::new()
            }
        },
        None => state
            .store
            .list_all()
            .await
            .map_err(|e| internal_error(e, "List inspections"))?,
    };

    let count = inspections.len();
    Ok(Json(ListResponse { inspections, count }))
}

/// Get a single inspection record
#[instrument(skip(state))]
async fn get_inspection(
    State(state): State<AppState>,
    Path(inspection_id): Path<String>,
) -> Result<Json<InspectionRecord>, ApiError> {
    let record = state
        .store
        .get(&inspection_id)
        .await
        .map_err(|e| internal_error(e, "Get inspection"))?
        .ok_or_else(|| not_found("Inspection not found"))?;

    Ok(Json(record))
}

/// Apply a partial update to an inspection record
#[instrument(skip(state, update))]
async fn update_inspection(
    State(state): State<AppState>,
    Path(inspection_id): Path<String>,
    Json(update): Json<InspectionUpdate>,
) -> Result<Json<InspectionRecord>, ApiError> {
    if update.is_empty() {
        return Err(validation_error("No fields to update".to_string()));
    }

    let record = state
        .store
        .apply_update(&inspection_id, &update)
        .await
        .map_err(|e| internal_error(e, "Update inspection"))?
        .ok_or_else(|| not_found("Inspection not found"))?;

    info!(inspection_id = %record.inspection_id, "Inspection updated");
    Ok(Json(record))
}

/// Mint a pre-signed S3 URL for image upload or download
#[instrument(skip(state, request))]
async fn presigned_url(
    State(state): State<AppState>,
    Json(request): Json<PresignedUrlRequest>,
) -> Result<Response, ApiError> {
    if request.inspection_id.trim().is_empty() {
        return Err(validation_error("inspectionId is required".to_string()));
    }

    match request.operation.as_str() {
        "upload" => {
            if request.file_name.trim().is_empty() {
                return Err(validation_error(
                    "fileName is required for uploads".to_string(),
                ));
            }

            let slot = state
                .image_store
                .presign_upload(
                    &request.inspection_id,
                    &request.file_name,
                    &request.content_type,
                )
                .await
                .map_err(|e| internal_error(e, "Presign upload"))?;

            metrics::counter!("images.upload_urls_issued").increment(1);

            Ok(Json(UploadUrlResponse {
                upload_url: slot.url,
                s3_key: slot.s3_key,
                image_id: slot.image_id,
                expires_in: slot.expires_in_secs,
            })
            .into_response())
        }
        "download" => {
            if request.s3_key.trim().is_empty() {
                return Err(validation_error(
                    "s3Key is required for downloads".to_string(),
                ));
            }

            let (url, expires_in) = state
                .image_store
                .presign_download(&request.s3_key)
                .await
                .map_err(|e| internal_error(e, "Presign download"))?;

            Ok(Json(DownloadUrlResponse {
                download_url: url,
                expires_in,
            })
            .into_response())
        }
        other => Err(validation_error(format!(
            "Unknown operation '{other}', expected 'upload' or 'download'"
        ))),
    }
}

/// Start the inspection API server
pub async fn start_api_server(state: AppState, config: &ApiConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting inspection API server");

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
    fn test_presigned_request_defaults() {
        let request: PresignedUrlRequest = serde_json::from_value(serde_json::json!({
            "inspectionId": "insp_1a2b3c4d",
            "fileName": "porch.jpg"
        }))
        .unwrap();

        assert_eq!(request.operation, "upload");
        assert_eq!(request.content_type, "application/octet-stream");
    }

    #[test]
    fn test_upload_response_wire_shape() {
        let response = UploadUrlResponse {
            upload_url: "https://bucket.example/put".to_string(),
            s3_key: "inspections/insp_1a2b3c4d/img_9f8e7d6c.jpg".to_string(),
            image_id: "img_9f8e7d6c".to_string(),
            expires_in: 300,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["uploadUrl"], "https://bucket.example/put");
        assert_eq!(value["s3Key"], "inspections/insp_1a2b3c4d/img_9f8e7d6c.jpg");
        assert_eq!(value["expiresIn"], 300);
    }
}

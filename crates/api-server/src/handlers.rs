//! HTTP request handlers for API endpoints

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analysis::analyze_upload;
use crate::types::{ErrorResponse, HealthResponse, MessageResponse};
use crate::upload::{validate_uploads, UploadError, UploadedFile};
use crate::ApiState;

/// Landing page served at `/`
const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Upload form page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Accept a drone video plus satellite image and locate the video inside the image
///
/// Form fields `video` and `image` are read; any other field is ignored. A field
/// without a `filename` is a plain form value, not a file, and counts as missing.
/// A body that is not multipart carries no files at all.
pub async fn upload_location_data(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Upload is not a multipart form: {}", e);
        api_error(StatusCode::BAD_REQUEST, UploadError::MissingFile.to_string())
    })?;
    let mut video = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Rejected malformed upload body: {}", e);
        api_error(e.status(), e.body_text())
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name != "video" && name != "image" {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read upload field {}: {}", name, e);
            api_error(e.status(), e.body_text())
        })?;
        let upload = UploadedFile { filename, data };

        if name == "video" {
            video = Some(upload);
        } else {
            image = Some(upload);
        }
    }

    let (video, image) = validate_uploads(video, image).map_err(|e| {
        warn!("Upload rejected: {}", e);
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    })?;
    info!(
        "Upload received: video={} ({} bytes), image={} ({} bytes)",
        video.filename,
        video.data.len(),
        image.filename,
        image.data.len()
    );

    match analyze_upload(&state, video, image).await {
        Ok(response) => Ok(Json(response).into_response()),
        Err(e) => {
            error!("Upload analysis failed: {}", e);
            Err(api_error(e.status_code(), e.to_string()))
        }
    }
}

/// Most recent location record, or a message when none exist
pub async fn get_location_data(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let store = Arc::clone(&state.store);
    let latest = tokio::task::spawn_blocking(move || store.latest())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            error!("Failed to read location table: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(match latest {
        Some(record) => Json(record).into_response(),
        None => Json(MessageResponse {
            message: "No location data available".to_string(),
        })
        .into_response(),
    })
}

/// Every stored location record in insertion order
pub async fn get_all_locations(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let store = Arc::clone(&state.store);
    let records = tokio::task::spawn_blocking(move || store.all())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            error!("Failed to read location table: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(records).into_response())
}

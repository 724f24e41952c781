//! Upload analysis pipeline
//!
//! Stores both uploads, pulls the middle frame out of the video, asks the model
//! where that frame sits inside the satellite image, parses the reply and
//! appends the result to the location table.

use axum::http::StatusCode;
use chrono::{Local, NaiveDateTime, Timelike};
use drone_locate_common::{mime_type_for, LocationRecord, ProcessingError};
use drone_locate_inference::{parse_location_reply, ImagePart, InferenceError};
use drone_locate_storage::StorageError;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::upload::{save_upload, UploadedFile};
use crate::{AnalysisResponse, ApiState};

/// Frame stills are always written as JPEG
const FRAME_MIME_TYPE: &str = "image/jpeg";

/// Failures after the upload passed validation
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to extract frame from video: {0}")]
    FrameExtraction(#[source] ProcessingError),

    #[error("Location inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Failed to store location record: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl AnalysisError {
    /// HTTP status reported for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::FrameExtraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalysisError::Inference(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::Storage(_) | AnalysisError::Io(_) | AnalysisError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<tokio::task::JoinError> for AnalysisError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalysisError::Task(err.to_string())
    }
}

/// Current local time at whole-second precision
fn timestamp_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run the full pipeline for one validated upload pair
pub async fn analyze_upload(
    state: &ApiState,
    video: UploadedFile,
    image: UploadedFile,
) -> Result<AnalysisResponse, AnalysisError> {
    let upload_dir = &state.config.server.upload_dir;
    tokio::fs::create_dir_all(upload_dir).await?;

    let video_path = save_upload(upload_dir, &video).await?;
    let image_path = save_upload(upload_dir, &image).await?;

    let location_id = Uuid::new_v4();
    let frame_path = upload_dir.join(format!("{location_id}_frame.jpg"));
    info!(
        "Analyzing upload {}: video={}, image={}",
        location_id,
        video_path.display(),
        image_path.display()
    );

    let extractor = Arc::clone(&state.extractor);
    let (source, dest) = (video_path.clone(), frame_path.clone());
    let frame = tokio::task::spawn_blocking(move || extractor.extract_middle_frame(&source, &dest))
        .await?
        .map_err(|e| {
            error!("Frame extraction failed for {}: {}", video_path.display(), e);
            AnalysisError::FrameExtraction(e)
        })?;
    info!(
        "Extracted frame {}/{} to {}",
        frame.frame_index,
        frame.total_frames,
        frame.path.display()
    );

    let drone_frame = ImagePart::new(FRAME_MIME_TYPE, tokio::fs::read(&frame.path).await?);
    let satellite = ImagePart::new(mime_type_for(&image.filename), image.data.to_vec());

    let description = state
        .model
        .infer(&drone_frame, &satellite)
        .await
        .inspect_err(|e| error!("Inference failed for {}: {}", location_id, e))?;
    let parsed = parse_location_reply(&description);

    let record = LocationRecord {
        uuid: location_id.to_string(),
        video_path,
        image_path,
        description,
        coordinates: parsed.coordinates,
        confidence: parsed.confidence,
        created_at: timestamp_now(),
    };

    let store = Arc::clone(&state.store);
    let stored = record.clone();
    tokio::task::spawn_blocking(move || store.append(&stored)).await??;
    info!(
        "Stored location {} at {} (confidence {})",
        record.uuid, record.coordinates, record.confidence
    );

    Ok(AnalysisResponse {
        video_frame: basename(&frame.path),
        satellite_image: basename(&record.image_path),
        coordinates: record.coordinates.to_string(),
        confidence: record.confidence,
        uuid: record.uuid,
        description: record.description,
    })
}

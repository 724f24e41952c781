//! REST API server for drone video geolocation
//!
//! Accepts a drone video and a satellite image, extracts the video's middle
//! frame, asks a vision-language model where that frame sits within the
//! satellite image and records the answer in a CSV table.

pub mod analysis;
pub mod config;
mod handlers;
mod types;
pub mod upload;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use drone_locate_frame::{FfmpegCliExtractor, FrameExtractor};
use drone_locate_inference::{GeminiClient, GeminiConfig, LocationModel};
use drone_locate_storage::{CsvLocationStore, LocationStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use handlers::*;
pub use types::*;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<ServerConfig>,
    /// Location result table
    pub store: Arc<dyn LocationStore>,
    /// Middle-frame extractor for uploaded videos
    pub extractor: Arc<dyn FrameExtractor>,
    /// Vision-language model used to place the frame
    pub model: Arc<dyn LocationModel>,
}

impl ApiState {
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn LocationStore>,
        extractor: Arc<dyn FrameExtractor>,
        model: Arc<dyn LocationModel>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            extractor,
            model,
        }
    }

    /// Wire the production backends described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory or location table cannot be
    /// created, or the Gemini HTTP client cannot be built.
    pub fn from_config(config: ServerConfig, api_key: String) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.server.upload_dir).with_context(|| {
            format!(
                "Failed to create upload directory: {}",
                config.server.upload_dir.display()
            )
        })?;

        let store = CsvLocationStore::open(&config.storage.csv_path).with_context(|| {
            format!(
                "Failed to open location table: {}",
                config.storage.csv_path.display()
            )
        })?;
        let extractor = FfmpegCliExtractor::new(&config.frames.ffmpeg, &config.frames.ffprobe);

        let mut gemini = GeminiConfig::new(api_key);
        gemini.model = config.gemini.model.clone();
        gemini.api_base = config.gemini.api_base.clone();
        gemini.timeout = config.gemini_timeout();
        let model = GeminiClient::new(gemini).context("Failed to build Gemini client")?;

        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(extractor),
            Arc::new(model),
        ))
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        // Landing page
        .route("/", get(index))
        // Health check
        .route("/health", get(health_check))
        // Upload and analysis
        .route("/upload_location_data", post(upload_location_data))
        // Stored results
        .route("/get_location_data", get(get_location_data))
        .route("/get_all_locations", get(get_all_locations))
        // Uploaded files and frames
        .nest_service("/static", static_files)
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on an already bound listener
pub async fn serve(listener: tokio::net::TcpListener, state: ApiState) -> Result<(), std::io::Error> {
    axum::serve(listener, build_router(state)).await
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

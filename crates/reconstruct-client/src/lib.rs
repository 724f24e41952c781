//! Client for a remote 3D reconstruction service
//!
//! Uploads a local video to `POST {server}/reconstruct` together with the GLB
//! generation parameters and streams the returned model to disk.

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client as HttpClient};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

/// Bound on the health probe
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on one reconstruction call (upload, processing and download)
pub const DEFAULT_RECONSTRUCT_TIMEOUT: Duration = Duration::from_secs(600);

/// Content type the video part is sent with
const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Reconstruction client errors
#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error("HTTP error: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Could not connect to the server at {0}")]
    Connection(String),

    #[error("Request timed out: the server took too long to respond")]
    Timeout,

    #[error("Video file not found at '{}'", .0.display())]
    VideoNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Request(String),
}

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, ReconstructError>;

impl ReconstructError {
    fn from_reqwest(err: reqwest::Error, server_url: &str) -> Self {
        if err.is_timeout() {
            ReconstructError::Timeout
        } else if err.is_connect() {
            ReconstructError::Connection(server_url.to_string())
        } else {
            ReconstructError::Request(err.to_string())
        }
    }
}

/// Parameters forwarded to the server's GLB export
#[derive(Debug, Clone, PartialEq)]
pub struct GlbParams {
    pub conf_thres: f64,
    pub frame_filter: String,
    pub mask_black_bg: bool,
    pub mask_white_bg: bool,
    pub show_cam: bool,
    pub mask_sky: bool,
    pub prediction_mode: String,
}

impl Default for GlbParams {
    fn default() -> Self {
        Self {
            conf_thres: 3.0,
            frame_filter: "All".to_string(),
            mask_black_bg: false,
            mask_white_bg: false,
            show_cam: true,
            mask_sky: false,
            prediction_mode: "Depthmap and Camera Branch".to_string(),
        }
    }
}

impl GlbParams {
    /// Form fields in the order they are sent
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            // Debug formatting keeps the decimal point ("3.0", not "3")
            ("conf_thres", format!("{:?}", self.conf_thres)),
            ("frame_filter", self.frame_filter.clone()),
            ("mask_black_bg", self.mask_black_bg.to_string()),
            ("mask_white_bg", self.mask_white_bg.to_string()),
            ("show_cam", self.show_cam.to_string()),
            ("mask_sky", self.mask_sky.to_string()),
            ("prediction_mode", self.prediction_mode.clone()),
        ]
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the reconstruction service, without trailing path
    pub server_url: String,
    /// Directory downloaded models are written to
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_url: server_url.into(),
            output_dir: output_dir.into(),
            timeout: DEFAULT_RECONSTRUCT_TIMEOUT,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url.trim_end_matches('/'))
    }
}

/// Name to save a returned model under.
///
/// Uses the `filename=` value of `Content-Disposition` with quotes stripped and
/// any directory part removed; falls back to `reconstructed_{video stem}.glb`.
pub fn output_filename(content_disposition: Option<&str>, video: &Path) -> String {
    let from_header = content_disposition
        .and_then(|value| value.split_once("filename="))
        .map(|(_, rest)| rest.split(';').next().unwrap_or(rest).trim().trim_matches('"'))
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..");

    match from_header {
        Some(name) => name.to_string(),
        None => {
            let stem = video
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("reconstructed_{stem}.glb")
        }
    }
}

/// Single-job client for the reconstruction service
pub struct ReconstructionClient {
    http: HttpClient,
    config: ClientConfig,
    params: GlbParams,
}

impl ReconstructionClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, params: GlbParams) -> Result<Self> {
        let http = HttpClient::builder()
            .build()
            .map_err(|e| ReconstructError::Request(e.to_string()))?;
        Ok(Self {
            http,
            config,
            params,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Probe `GET {server}/` and return its JSON body
    pub async fn health_check(&self) -> Result<serde_json::Value> {
        let url = self.config.endpoint("/");
        info!("Checking server health at {}", url);

        let response = self
            .http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ReconstructError::from_reqwest(e, &self.config.server_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReconstructError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let health: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ReconstructError::Request(e.to_string()))?;
        info!("Server is healthy: {}", health);
        Ok(health)
    }

    /// Upload `video`, wait for the model and save it under the output directory
    ///
    /// The video is streamed from disk, never held in memory whole.
    ///
    /// # Errors
    ///
    /// Returns an error if the video is missing, the request fails or times
    /// out, the server answers with a non-success status, or the model cannot
    /// be written. A partially written model is removed.
    pub async fn reconstruct(&self, video: &Path) -> Result<PathBuf> {
        if !video.is_file() {
            return Err(ReconstructError::VideoNotFound(video.to_path_buf()));
        }
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let video_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = tokio::fs::File::open(video).await?;
        let video_len = file.metadata().await?.len();
        debug!("Streaming {} bytes from {}", video_len, video.display());

        let body = Body::wrap_stream(ReaderStream::new(file));
        let video_part = Part::stream_with_length(body, video_len)
            .file_name(video_name.clone())
            .mime_str(VIDEO_MIME_TYPE)
            .map_err(|e| ReconstructError::Request(e.to_string()))?;
        let form = self
            .params
            .form_fields()
            .into_iter()
            .fold(Form::new().part("video", video_part), |form, (name, value)| {
                form.text(name, value)
            });

        let url = self.config.endpoint("/reconstruct");
        info!(
            "Uploading '{}' to {} with parameters {:?}",
            video_name, url, self.params
        );

        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| ReconstructError::from_reqwest(e, &self.config.server_url))?;
        info!(
            "Upload and server processing took {:.2} seconds",
            started.elapsed().as_secs_f64()
        );

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP error: {} - {}", status.as_u16(), body);
            return Err(ReconstructError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let destination = self
            .config
            .output_dir
            .join(output_filename(disposition.as_deref(), video));
        debug!("Writing model to {}", destination.display());

        if let Err(e) = stream_to_file(response, &destination).await {
            if let Err(remove_err) = tokio::fs::remove_file(&destination).await {
                warn!(
                    "Failed to remove partial model {}: {}",
                    destination.display(),
                    remove_err
                );
            }
            return Err(e);
        }

        info!("Success! 3D model saved to: {}", destination.display());
        Ok(destination)
    }
}

/// Write the response body to `destination` chunk by chunk
async fn stream_to_file(response: reqwest::Response, destination: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(destination).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                ReconstructError::Timeout
            } else {
                ReconstructError::Request(e.to_string())
            }
        })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!("Downloaded {} bytes", written);
    Ok(written)
}

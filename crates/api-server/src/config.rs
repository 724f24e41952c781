//! Configuration loading for the API server.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "DRONE_LOCATE_CONFIG";

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_UPLOAD_DIR: &str = "static/uploads";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_CSV_PATH: &str = "location_data.csv";

/// Default upload body limit in MB (covers both files of one request)
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 512;

/// Default bound on one inference call
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSection,
    pub storage: StorageSection,
    pub gemini: GeminiSection,
    pub frames: FramesSection,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSection {
    pub addr: String,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_mb: Option<u64>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            max_upload_mb: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSection {
    pub csv_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeminiSection {
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            model: drone_locate_inference::gemini::DEFAULT_MODEL.to_string(),
            api_base: drone_locate_inference::gemini::DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_GEMINI_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FramesSection {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ServerConfig {
    /// Maximum accepted request body in bytes.
    /// Returns configured value or default (512MB).
    pub fn max_upload_bytes(&self) -> usize {
        let mb = self.server.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB);
        usize::try_from(mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    pub fn gemini_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_secs)
    }

    /// Apply `API_SERVER_ADDR`, `UPLOAD_FOLDER` and `LOCATION_CSV_FILE` overrides
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("API_SERVER_ADDR") {
            self.server.addr = addr;
        }
        if let Some(dir) = lookup("UPLOAD_FOLDER") {
            self.server.upload_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("LOCATION_CSV_FILE") {
            self.storage.csv_path = PathBuf::from(path);
        }
    }
}

pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("drone-locate.toml"))
}

pub fn load_config(path: &Path) -> Result<ServerConfig> {
    if !path.exists() {
        return Ok(ServerConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: ServerConfig =
        toml::from_str(&contents).context("Failed to parse config file as TOML")?;
    Ok(config)
}

/// Gemini API key from the environment; never read from the config file
pub fn gemini_api_key() -> Result<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .with_context(|| format!("{API_KEY_ENV} must be set"))
}

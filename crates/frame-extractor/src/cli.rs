//! Middle-frame extraction through the `ffprobe` and `ffmpeg` executables

use drone_locate_common::{ProcessingError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::{discard_output, middle_frame_index, ExtractedFrame, FrameExtractor};

/// Frame extractor that shells out to FFmpeg
#[derive(Debug, Clone)]
pub struct FfmpegCliExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegCliExtractor {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

impl FfmpegCliExtractor {
    /// Use the given executables (bare names are resolved through `PATH`)
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Total frame count of the first video stream
    ///
    /// Prefers the container's `nb_frames`; falls back to counting packets when the
    /// container does not record it.
    ///
    /// # Errors
    ///
    /// Returns an error if `ffprobe` cannot run, rejects the file, or finds no
    /// video stream.
    pub fn count_frames(&self, video: &Path) -> Result<u64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-count_packets",
                "-show_entries",
                "stream=nb_frames,nb_read_packets",
                "-of",
                "json",
            ])
            .arg(video)
            .output()
            .map_err(|e| ProcessingError::FFmpegError(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ProcessingError::CorruptedFile(format!(
                "ffprobe rejected {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_frame_count(&output.stdout)
    }
}

/// Read the frame count out of `ffprobe -of json` output
pub(crate) fn parse_frame_count(stdout: &[u8]) -> Result<u64> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ProcessingError::FFmpegError(format!("Unreadable ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .first()
        .ok_or(ProcessingError::NoVideoStream)?;

    let parse = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&n| n > 0)
    };

    Ok(parse(&stream.nb_frames)
        .or_else(|| parse(&stream.nb_read_packets))
        .unwrap_or(0))
}

/// Video filter selecting exactly one frame by index
pub(crate) fn select_filter(index: u64) -> String {
    format!("select=eq(n\\,{index})")
}

impl FrameExtractor for FfmpegCliExtractor {
    fn extract_middle_frame(&self, video: &Path, dest: &Path) -> Result<ExtractedFrame> {
        let total_frames = self.count_frames(video)?;
        if total_frames == 0 {
            return Err(ProcessingError::EmptyVideo(video.to_path_buf()));
        }
        let frame_index = middle_frame_index(total_frames);
        debug!(
            "Extracting frame {}/{} from {}",
            frame_index,
            total_frames,
            video.display()
        );

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-y", "-i"])
            .arg(video)
            .args(["-vf", &select_filter(frame_index)])
            .args(["-frames:v", "1", "-update", "1", "-q:v", "2"])
            .arg(dest)
            .output()
            .map_err(|e| ProcessingError::FFmpegError(format!("Failed to run ffmpeg: {e}")))?;

        let written = std::fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false);
        if !output.status.success() || !written {
            warn!(
                "ffmpeg produced no frame for {}: {}",
                video.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            discard_output(dest);
            return Err(ProcessingError::FrameNotDecoded { index: frame_index });
        }

        info!(
            "Extracted frame {} of {} from {} to {}",
            frame_index,
            total_frames,
            video.display(),
            dest.display()
        );

        Ok(ExtractedFrame {
            path: dest.to_path_buf(),
            frame_index,
            total_frames,
        })
    }
}

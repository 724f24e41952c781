//! Frame extractor module
//!
//! Pulls the middle frame out of a drone video and writes it as a still image.
//! Two backends implement [`FrameExtractor`]:
//! 1. **FFmpeg CLI** (default): `ffprobe` for the frame count, `ffmpeg` for the frame
//! 2. **Native decoder** (`native-decoder` feature): in-process decode via ffmpeg-next

pub mod cli;
#[cfg(feature = "native-decoder")]
pub mod native;

use drone_locate_common::Result;
use std::path::{Path, PathBuf};

pub use cli::FfmpegCliExtractor;
#[cfg(feature = "native-decoder")]
pub use native::NativeFrameExtractor;

/// A still frame written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    /// Where the still was written
    pub path: PathBuf,
    /// 0-indexed position of the frame in the video
    pub frame_index: u64,
    /// Frame count the index was derived from
    pub total_frames: u64,
}

/// Extracts one representative still from a video.
///
/// Implementations are blocking; async callers should run them on a blocking pool.
pub trait FrameExtractor: Send + Sync {
    /// Decode frame `total_frames / 2` of `video` and write it to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the video cannot be opened, has no frames, or the
    /// target frame cannot be decoded. Nothing is left at `dest` on error.
    fn extract_middle_frame(&self, video: &Path, dest: &Path) -> Result<ExtractedFrame>;
}

/// Index of the middle frame for a video with `total_frames` frames
#[must_use]
pub fn middle_frame_index(total_frames: u64) -> u64 {
    total_frames / 2
}

/// Remove a partially written output, ignoring a file that never appeared
pub(crate) fn discard_output(dest: &Path) {
    if let Err(e) = std::fs::remove_file(dest) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove partial frame {}: {}", dest.display(), e);
        }
    }
}

/// Common types and utilities for drone video geolocation
pub mod filename;
pub mod record;

use std::path::PathBuf;
use thiserror::Error;

pub use filename::{allowed_file, file_extension, mime_type_for, secure_filename, MediaKind};
pub use record::{Coordinates, LocationRecord, TIMESTAMP_FORMAT};

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Video has no frames: {0}")]
    EmptyVideo(PathBuf),

    #[error("Frame {index} could not be decoded")]
    FrameNotDecoded { index: u64 },

    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    #[error("FFmpeg error: {0}")]
    FFmpegError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcessingError::FrameNotDecoded { index: 42 };
        assert_eq!(err.to_string(), "Frame 42 could not be decoded");

        let err = ProcessingError::EmptyVideo(PathBuf::from("clip.mp4"));
        assert_eq!(err.to_string(), "Video has no frames: clip.mp4");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProcessingError = io.into();
        assert!(matches!(err, ProcessingError::IoError(_)));
    }
}

//! Location inference against a multimodal generative model
//!
//! [`LocationModel`] is the seam the HTTP layer talks to; [`GeminiClient`] is the
//! production implementation. [`response_parser`] turns the model's free-text
//! reply into coordinates and a confidence score.

pub mod gemini;
pub mod response_parser;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::{GeminiClient, GeminiConfig};
pub use response_parser::{
    confidence_candidate, coordinate_candidate, parse_location_reply, ParsedLocation,
    DEFAULT_CONFIDENCE,
};

/// Instructions sent alongside the drone frame and the satellite image
pub const LOCATION_PROMPT: &str = "\
I'm providing two images:
1. A frame from a drone video
2. A satellite/aerial image

Please analyze both images and:
1. Determine potential location based on visual features
2. Identify any matching landmarks, terrain patterns, or structures
3. Provide coordinates (approximate) where the drone video might have been taken within the satellite image
4. Provide a confidence score (1-10) for this location match
5. Describe the specific point where the drone video was likely taken

Format the coordinates as x,y percentages of the image dimensions where (0,0) is top-left
and (100,100) is bottom-right of the satellite image.
";

/// Inference errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference request timed out")]
    Timeout,

    #[error("Could not connect to inference service: {0}")]
    Connection(String),

    #[error("Inference service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed inference response: {0}")]
    MalformedResponse(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_connect() {
            InferenceError::Connection(err.to_string())
        } else if err.is_decode() {
            InferenceError::MalformedResponse(err.to_string())
        } else {
            InferenceError::Http(err.to_string())
        }
    }
}

/// Result type for inference operations
pub type Result<T> = std::result::Result<T, InferenceError>;

/// An image attached to a multimodal prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePart {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// A vision-language model that can place a drone frame inside a satellite image
#[async_trait]
pub trait LocationModel: Send + Sync {
    /// Send the location prompt with both images and return the raw text reply
    async fn infer(&self, drone_frame: &ImagePart, satellite: &ImagePart) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_asks_for_every_field() {
        assert!(LOCATION_PROMPT.contains("confidence score (1-10)"));
        assert!(LOCATION_PROMPT.contains("x,y percentages"));
        assert!(LOCATION_PROMPT.contains("(0,0) is top-left"));
        assert!(LOCATION_PROMPT.contains("matching landmarks"));
    }

    #[test]
    fn test_error_display() {
        let err = InferenceError::Status {
            status: 429,
            body: "quota".to_string(),
        };
        assert_eq!(err.to_string(), "Inference service returned 429: quota");
    }
}

//! API request and response types

use serde::{Deserialize, Serialize};

/// Body of a successful `POST /upload_location_data`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse {
    pub uuid: String,
    /// Raw model reply
    pub description: String,
    /// `"x,y"` percentages within the satellite image
    pub coordinates: String,
    pub confidence: u8,
    /// Basename of the extracted still
    pub video_frame: String,
    /// Basename of the stored satellite image
    pub satellite_image: String,
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Informational body, used when there is nothing to return
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_response_field_names() {
        let response = AnalysisResponse {
            uuid: "abc".to_string(),
            description: "Coordinates: 35%, 62%".to_string(),
            coordinates: "35,62".to_string(),
            confidence: 8,
            video_frame: "abc_frame.jpg".to_string(),
            satellite_image: "abc_sat.png".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["coordinates"], "35,62");
        assert_eq!(json["confidence"], 8);
        assert_eq!(json["video_frame"], "abc_frame.jpg");
        assert_eq!(json["satellite_image"], "abc_sat.png");
    }

    #[test]
    fn test_error_response_serialization() {
        let json = serde_json::to_string(&ErrorResponse::new("No selected file")).unwrap();
        assert_eq!(json, r#"{"error":"No selected file"}"#);
    }
}

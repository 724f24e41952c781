//! Validation and persistence of the files posted to `/upload_location_data`

use axum::body::Bytes;
use drone_locate_common::{allowed_file, secure_filename};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// A file part received in the upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied name, empty when the browser sent no file
    pub filename: String,
    pub data: Bytes,
}

/// Reasons an upload form is rejected before any processing
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    #[error("Both video and image files are required")]
    MissingFile,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("File type not allowed")]
    FileTypeNotAllowed,
}

/// Check presence, then non-empty names, then extensions, in that order
pub fn validate_uploads(
    video: Option<UploadedFile>,
    image: Option<UploadedFile>,
) -> Result<(UploadedFile, UploadedFile), UploadError> {
    let (Some(video), Some(image)) = (video, image) else {
        return Err(UploadError::MissingFile);
    };
    if video.filename.is_empty() || image.filename.is_empty() {
        return Err(UploadError::NoSelectedFile);
    }
    if !allowed_file(&video.filename) || !allowed_file(&image.filename) {
        return Err(UploadError::FileTypeNotAllowed);
    }
    Ok((video, image))
}

/// Name an upload is stored under: a fresh UUID prefix plus the sanitised
/// client name, so repeated or identical names never overwrite each other.
pub fn stored_name(id: &Uuid, filename: &str) -> String {
    secure_filename(&format!("{id}_{filename}"))
}

/// Write `upload` into `dir` and return the stored path
pub async fn save_upload(dir: &Path, upload: &UploadedFile) -> std::io::Result<PathBuf> {
    let path = dir.join(stored_name(&Uuid::new_v4(), &upload.filename));
    tokio::fs::write(&path, &upload.data).await?;
    debug!("Saved upload {} ({} bytes)", path.display(), upload.data.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> Option<UploadedFile> {
        Some(UploadedFile {
            filename: name.to_string(),
            data: Bytes::from_static(b"data"),
        })
    }

    #[test]
    fn test_missing_file_rejected_first() {
        assert_eq!(
            validate_uploads(file("a.mp4"), None).unwrap_err(),
            UploadError::MissingFile
        );
        assert_eq!(
            validate_uploads(None, file("")).unwrap_err(),
            UploadError::MissingFile
        );
    }

    #[test]
    fn test_empty_name_rejected_before_extension() {
        assert_eq!(
            validate_uploads(file(""), file("notes.txt")).unwrap_err(),
            UploadError::NoSelectedFile
        );
    }

    #[test]
    fn test_disallowed_extension() {
        assert_eq!(
            validate_uploads(file("flight.mp4"), file("map.gif")).unwrap_err(),
            UploadError::FileTypeNotAllowed
        );
        assert_eq!(
            validate_uploads(file("README"), file("map.png")).unwrap_err(),
            UploadError::FileTypeNotAllowed
        );
    }

    #[test]
    fn test_valid_pair() {
        let (video, image) = validate_uploads(file("Flight.MOV"), file("sat.JPEG")).unwrap();
        assert_eq!(video.filename, "Flight.MOV");
        assert_eq!(image.filename, "sat.JPEG");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            UploadError::MissingFile.to_string(),
            "Both video and image files are required"
        );
        assert_eq!(UploadError::NoSelectedFile.to_string(), "No selected file");
        assert_eq!(UploadError::FileTypeNotAllowed.to_string(), "File type not allowed");
    }

    #[test]
    fn test_stored_name_is_sanitised() {
        let id = Uuid::nil();
        assert_eq!(
            stored_name(&id, "../../etc/my flight.mp4"),
            "00000000-0000-0000-0000-000000000000_.._.._etc_my_flight.mp4"
        );
    }

    #[tokio::test]
    async fn test_save_upload_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadedFile {
            filename: "sat.png".to_string(),
            data: Bytes::from_static(b"png-bytes"),
        };
        let path = save_upload(dir.path(), &upload).await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_sat.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }
}

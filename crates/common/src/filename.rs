//! Upload filename validation and sanitising

/// Image suffixes accepted for upload
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Video suffixes accepted for upload
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov"];

/// Kind of media an uploaded file holds, judged by its suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a filename by its (case-insensitive) suffix
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = file_extension(filename)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Lower-cased text after the last dot, if the name has a dot at all
#[must_use]
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Check if an uploaded file has an allowed extension
///
/// Missing and disallowed extensions are rejected the same way.
#[must_use]
pub fn allowed_file(filename: &str) -> bool {
    MediaKind::from_filename(filename).is_some()
}

/// MIME type to declare when sending an image to the inference service
#[must_use]
pub fn mime_type_for(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Reduce a client-supplied filename to something safe to join onto a directory.
///
/// Path separators become spaces, non-ASCII characters are dropped, whitespace
/// runs collapse to `_`, anything outside `[A-Za-z0-9._-]` is removed and
/// leading/trailing `.`/`_` are stripped. The result may be empty.
#[must_use]
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

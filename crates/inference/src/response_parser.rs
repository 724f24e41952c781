//! Best-effort extraction of coordinates and confidence from a free-text reply
//!
//! The model answers in prose, so this is a line-oriented keyword scan. It never
//! fails: anything it cannot read falls back to the image centre and a medium
//! confidence.

use drone_locate_common::Coordinates;

/// Confidence reported when the reply has no readable score
pub const DEFAULT_CONFIDENCE: u8 = 5;

/// Lowest and highest confidence the prompt asks for
pub const MIN_CONFIDENCE: u8 = 1;
pub const MAX_CONFIDENCE: u8 = 10;

/// Structured fields pulled out of a model reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedLocation {
    /// Always within [0, 100] on both axes
    pub coordinates: Coordinates,
    /// Always within [1, 10]
    pub confidence: u8,
}

impl Default for ParsedLocation {
    fn default() -> Self {
        Self {
            coordinates: Coordinates::CENTER,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Text between the first and second colon (or to the end of the line)
fn after_first_colon(line: &str) -> Option<&str> {
    line.split(':').nth(1)
}

/// Trim whitespace and Markdown emphasis the model likes to wrap values in
fn trim_markup(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '`')
}

/// Coordinate text of a single line: after the first colon and before the next
/// one, cut at any `(`, without `%`. `None` when the line has no colon.
#[must_use]
pub fn coordinate_candidate(line: &str) -> Option<String> {
    let rest = after_first_colon(line)?;
    let rest = rest.split('(').next().unwrap_or(rest);
    Some(trim_markup(&rest.replace('%', "")).to_string())
}

/// Confidence of a single line: the integer after the first colon, before any
/// further colon or `/`
#[must_use]
pub fn confidence_candidate(line: &str) -> Option<i64> {
    let rest = after_first_colon(line)?;
    let rest = rest.split('/').next().unwrap_or(rest);
    trim_markup(rest).parse().ok()
}

/// Scan a model reply for its coordinate and confidence lines.
///
/// A line mentioning "coordinates" and carrying a `%` supplies the coordinate
/// candidate; the last such line wins even when its text turns out unreadable.
/// Any other line mentioning "confidence" with a digit in it supplies the score;
/// the last line whose score parses wins. The candidate must be exactly two
/// comma-separated numbers or the pair falls back to 50,50. Coordinates are
/// clamped to [0, 100] and confidence to [1, 10].
#[must_use]
pub fn parse_location_reply(reply: &str) -> ParsedLocation {
    let mut candidate: Option<String> = None;
    let mut confidence: Option<i64> = None;

    for line in reply.lines() {
        let lower = line.to_lowercase();
        if lower.contains("coordinates") && line.contains('%') {
            if let Some(text) = coordinate_candidate(line) {
                candidate = Some(text);
            }
        } else if lower.contains("confidence") && line.chars().any(|c| c.is_ascii_digit()) {
            if let Some(score) = confidence_candidate(line) {
                confidence = Some(score);
            }
        }
    }

    let coordinates = candidate
        .and_then(|text| text.parse::<Coordinates>().ok())
        .map_or(Coordinates::CENTER, |c| Coordinates::clamped(c.x, c.y));

    let confidence = confidence
        .map(|score| score.clamp(i64::from(MIN_CONFIDENCE), i64::from(MAX_CONFIDENCE)))
        .and_then(|score| u8::try_from(score).ok())
        .unwrap_or(DEFAULT_CONFIDENCE);

    ParsedLocation {
        coordinates,
        confidence,
    }
}

//! Content model: segments, content types, filter modes and criteria.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time_codec::{format_time, parse_time};

/// Kind of objectionable content a segment is tagged with.
///
/// This is a closed set. Unknown values fail deserialization and are
/// reported by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Nudity or sexual content.
    Nudity,
    /// Strong language.
    Profanity,
    /// Violence or gore.
    Violence,
    /// Drug, alcohol or tobacco use.
    Substances,
    /// Frightening or intense scenes.
    Frightening,
}

impl ContentType {
    /// Returns all content types.
    pub fn all() -> &'static [ContentType] {
        &[
            ContentType::Nudity,
            ContentType::Profanity,
            ContentType::Violence,
            ContentType::Substances,
            ContentType::Frightening,
        ]
    }

    /// Returns the wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Nudity => "nudity",
            ContentType::Profanity => "profanity",
            ContentType::Violence => "violence",
            ContentType::Substances => "substances",
            ContentType::Frightening => "frightening",
        }
    }

    /// Returns a human-readable name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            ContentType::Nudity => "Nudity",
            ContentType::Profanity => "Profanity",
            ContentType::Violence => "Violence",
            ContentType::Substances => "Substances",
            ContentType::Frightening => "Frightening",
        }
    }

    /// Parses a type from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action taken while the playhead is inside an active segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Jump past the segment.
    #[default]
    Skip,
    /// Mute audio until the segment ends.
    Mute,
    /// Blur the picture until the segment ends.
    Blur,
}

impl FilterMode {
    /// Returns the wire name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Skip => "skip",
            FilterMode::Mute => "mute",
            FilterMode::Blur => "blur",
        }
    }

    /// Parses a mode from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "skip" => Some(FilterMode::Skip),
            "mute" => Some(FilterMode::Mute),
            "blur" => Some(FilterMode::Blur),
            _ => None,
        }
    }

    /// Message shown to the viewer when this mode engages.
    pub fn notification(&self) -> &'static str {
        match self {
            FilterMode::Skip => "Skipped filtered content",
            FilterMode::Mute => "Audio muted - filtered content",
            FilterMode::Blur => "Video blurred - filtered content",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A segment boundary: either an `HH:MM:SS` string or seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    /// Seconds from media start.
    Seconds(f64),
    /// Timestamp text, normally `HH:MM:SS`.
    Text(String),
}

impl TimeValue {
    /// Normalizes this value to seconds (lenient).
    pub fn seconds(&self) -> f64 {
        parse_time(self)
    }
}

impl From<&str> for TimeValue {
    fn from(value: &str) -> Self {
        TimeValue::Text(value.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(value: String) -> Self {
        TimeValue::Text(value)
    }
}

impl From<f64> for TimeValue {
    fn from(value: f64) -> Self {
        TimeValue::Seconds(value)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Seconds(seconds) => write!(f, "{}", format_time(*seconds)),
            TimeValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A tagged time range of a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start of the range (inclusive).
    pub start: TimeValue,
    /// End of the range (exclusive).
    pub end: TimeValue,
    /// What kind of content the range contains.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Severity from 1 (mild) to 10 (extreme).
    pub severity: u8,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a human has verified the range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl Segment {
    /// Creates a new segment.
    pub fn new(
        start: impl Into<TimeValue>,
        end: impl Into<TimeValue>,
        content_type: ContentType,
        severity: u8,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            content_type,
            severity,
            description: None,
            verified: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the verified flag.
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    /// Start of the range in seconds.
    pub fn start_seconds(&self) -> f64 {
        self.start.seconds()
    }

    /// End of the range in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.end.seconds()
    }

    /// Length of the range in seconds (negative for inverted ranges).
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds() - self.start_seconds()
    }

    /// Returns true if the segment has been verified.
    pub fn is_verified(&self) -> bool {
        self.verified.unwrap_or(false)
    }
}

/// Which segments should be acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Content types that are filtered.
    pub enabled_types: HashSet<ContentType>,
    /// Segments below this severity are ignored.
    pub min_severity: u8,
}

impl FilterCriteria {
    /// Creates criteria from a list of types and a severity threshold.
    pub fn new(enabled_types: impl IntoIterator<Item = ContentType>, min_severity: u8) -> Self {
        Self {
            enabled_types: enabled_types.into_iter().collect(),
            min_severity,
        }
    }

    /// Criteria that match every segment.
    pub fn all() -> Self {
        Self::new(ContentType::all().iter().copied(), 1)
    }

    /// Returns true if the segment passes the type and severity filters.
    pub fn allows(&self, segment: &Segment) -> bool {
        self.enabled_types.contains(&segment.content_type) && segment.severity >= self.min_severity
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(
            [
                ContentType::Nudity,
                ContentType::Profanity,
                ContentType::Violence,
            ],
            1,
        )
    }
}

/// Segment list for one title, as stored and exchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampFile {
    /// Title name.
    pub title: String,
    /// IMDb identifier (`tt` followed by digits).
    pub imdb_id: String,
    /// Segments in file order.
    pub timestamps: Vec<Segment>,
}

impl TimestampFile {
    /// Creates a timestamp file.
    pub fn new(title: impl Into<String>, imdb_id: impl Into<String>, timestamps: Vec<Segment>) -> Self {
        Self {
            title: title.into(),
            imdb_id: imdb_id.into(),
            timestamps,
        }
    }

    /// Parses a timestamp file from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serializes the file as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

//! Segment sources and the loading policy.
//!
//! A title's segments come from a [`SegmentSource`] keyed by IMDb id. When
//! the title is unknown or the source fails, the caller gets the fallback
//! list instead; loading never fails outright.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{ContentType, Segment, TimestampFile};

/// Errors from a segment source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no timestamps for this IMDb id.
    #[error("no timestamps for {0}")]
    NotFound(String),

    /// The source could not be reached or read.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The stored file is not a valid timestamp file.
    #[error("invalid timestamp file: {0}")]
    Invalid(#[from] serde_json::Error),

    /// Reading the file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Provides timestamp files by IMDb id.
pub trait SegmentSource {
    /// Loads the timestamp file for `imdb_id`.
    fn load(&self, imdb_id: &str) -> Result<TimestampFile>;
}

/// Reads `<dir>/<imdb_id>.json` files.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    /// Creates a source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the files are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `imdb_id`.
    pub fn path_for(&self, imdb_id: &str) -> PathBuf {
        self.dir.join(format!("{imdb_id}.json"))
    }
}

impl SegmentSource for JsonDirSource {
    fn load(&self, imdb_id: &str) -> Result<TimestampFile> {
        let path = self.path_for(imdb_id);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(imdb_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Read {}", path.display());
        Ok(TimestampFile::from_json(&json)?)
    }
}

/// What to use when no segments can be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fallback {
    /// The built-in demo segments.
    #[default]
    Demo,
    /// No segments.
    Empty,
}

impl Fallback {
    /// Returns the fallback segment list.
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            Fallback::Demo => demo_segments(),
            Fallback::Empty => Vec::new(),
        }
    }
}

/// Built-in demo segments.
pub fn demo_segments() -> Vec<Segment> {
    vec![
        Segment::new("00:00:30", "00:00:35", ContentType::Profanity, 5)
            .with_description("Test segment - mild profanity"),
        Segment::new("00:02:00", "00:02:10", ContentType::Violence, 7)
            .with_description("Test segment - action violence"),
        Segment::new("00:05:00", "00:05:15", ContentType::Nudity, 8)
            .with_description("Test segment - nudity"),
    ]
}

/// Loads the segments for a title, falling back when it cannot.
///
/// Without an IMDb id the fallback is used directly.
pub fn load_segments<S: SegmentSource + ?Sized>(
    source: &S,
    imdb_id: Option<&str>,
    fallback: Fallback,
) -> Vec<Segment> {
    let Some(imdb_id) = imdb_id else {
        debug!("No title id, using {:?} segments", fallback);
        return fallback.segments();
    };

    match source.load(imdb_id) {
        Ok(file) => {
            info!(
                "Loaded {} timestamps for {} ({})",
                file.timestamps.len(),
                file.title,
                imdb_id
            );
            file.timestamps
        }
        Err(SourceError::NotFound(_)) => {
            info!("No timestamps for {}, using {:?} segments", imdb_id, fallback);
            fallback.segments()
        }
        Err(e) => {
            warn!("Failed to load timestamps for {}: {}", imdb_id, e);
            fallback.segments()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct FailingSource;

    impl SegmentSource for FailingSource {
        fn load(&self, _imdb_id: &str) -> Result<TimestampFile> {
            Err(SourceError::Unavailable("offline".to_string()))
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn demo_segments_match_builtin_list() {
        let demo = demo_segments();
        assert_eq!(demo.len(), 3);
        assert_eq!(demo[0].start_seconds(), 30.0);
        assert_eq!(demo[1].content_type, ContentType::Violence);
        assert_eq!(demo[2].end_seconds(), 315.0);
        assert_eq!(demo[2].description.as_deref(), Some("Test segment - nudity"));
    }

    #[test]
    fn loads_file_from_directory() {
        let dir = TempDir::new().unwrap();
        let file = json!({
            "title": "Example Movie",
            "imdb_id": "tt1234567",
            "timestamps": [
                {"start": "00:10:00", "end": "00:10:30", "type": "violence", "severity": 6}
            ]
        });
        write_file(&dir, "tt1234567.json", &file.to_string());

        let source = JsonDirSource::new(dir.path());
        let segments = load_segments(&source, Some("tt1234567"), Fallback::Demo);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_seconds(), 600.0);
    }

    #[test]
    fn missing_file_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirSource::new(dir.path());

        assert!(matches!(source.load("tt0000001"), Err(SourceError::NotFound(_))));
        assert_eq!(load_segments(&source, Some("tt0000001"), Fallback::Demo).len(), 3);
        assert!(load_segments(&source, Some("tt0000001"), Fallback::Empty).is_empty());
    }

    #[test]
    fn malformed_file_uses_fallback() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "tt7654321.json", "{not json");
        let source = JsonDirSource::new(dir.path());

        assert!(matches!(source.load("tt7654321"), Err(SourceError::Invalid(_))));
        assert_eq!(load_segments(&source, Some("tt7654321"), Fallback::Demo), demo_segments());
    }

    #[test]
    fn unavailable_source_uses_fallback() {
        assert_eq!(load_segments(&FailingSource, Some("tt1"), Fallback::Empty), Vec::new());
    }

    #[test]
    fn no_title_id_uses_fallback() {
        let source = JsonDirSource::new("/nonexistent");
        assert_eq!(load_segments(&source, None, Fallback::Demo).len(), 3);
    }
}

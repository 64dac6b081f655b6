//! Streaming platform registry.
//!
//! Maps a page URL to the platform serving it and the selectors used to
//! locate that platform's video element and title.

use regex::Regex;
use serde::Serialize;

// =============================================================================
// Platform
// =============================================================================

/// A supported streaming platform.
#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    /// Short identifier (`netflix`, `prime`, ...).
    pub name: String,
    /// Human-friendly display name.
    pub display_name: String,
    /// URL pattern identifying the platform.
    #[serde(serialize_with = "serialize_pattern")]
    pub pattern: Regex,
    /// Selector for candidate video elements.
    pub video_selector: String,
    /// Selector for the title element.
    pub title_selector: String,
}

fn serialize_pattern<S: serde::Serializer>(pattern: &Regex, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(pattern.as_str())
}

impl Platform {
    /// Creates a platform, compiling its URL pattern.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        pattern: &str,
        video_selector: impl Into<String>,
        title_selector: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            display_name: display_name.into(),
            pattern: Regex::new(pattern)?,
            video_selector: video_selector.into(),
            title_selector: title_selector.into(),
        })
    }

    /// Returns true if `url` belongs to this platform.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered list of platforms; the first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
}

impl PlatformRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in platforms.
    pub fn bundled() -> Self {
        Self {
            platforms: bundled_platforms(),
        }
    }

    /// Adds a platform after the existing entries.
    pub fn add(&mut self, platform: Platform) {
        self.platforms.push(platform);
    }

    /// Finds the platform serving `url`.
    pub fn detect(&self, url: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.matches(url))
    }

    /// Looks up a platform by its short name.
    pub fn get(&self, name: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.name == name)
    }

    /// All registered platforms in match order.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Number of registered platforms.
    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// Returns true if no platform is registered.
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}

/// Returns the compiled-in platform list.
pub fn bundled_platforms() -> Vec<Platform> {
    let entries: &[(&str, &str, &str, &str)] = &[
        ("netflix", "Netflix", r"netflix\.com", r#"[data-uia="video-title"]"#),
        (
            "prime",
            "Prime Video",
            r"primevideo\.com|amazon\.com/gp/video",
            ".atvwebplayersdk-title-text",
        ),
        ("disney", "Disney+", r"disneyplus\.com", r#"[data-testid="title-field"]"#),
        ("hbo", "Max", r"max\.com|hbomax\.com", r#"[class*="Title"]"#),
        ("hulu", "Hulu", r"hulu\.com", r#"[class*="title"]"#),
    ];

    entries
        .iter()
        .map(|(name, display, pattern, title)| {
            Platform::new(*name, *display, pattern, "video", *title)
                .expect("Invalid regex pattern")
        })
        .collect()
}

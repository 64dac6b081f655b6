//! ReelGuard Core - Segment matching and playback filtering.
//!
//! This crate provides the engine that keeps objectionable segments of a
//! title from being seen or heard. It handles:
//!
//! - Time codec (`HH:MM:SS` parsing and formatting)
//! - Segment matching against the playback position
//! - The filter controller (skip, mute and blur)
//! - Video element discovery and the monitoring loop
//! - Timestamp file validation and statistics
//!
//! # Example
//!
//! ```
//! use reelguard_core::{
//!     ContentType, FilterController, FilterMode, FilterSettings, Segment, SimulatedPlayer,
//! };
//!
//! let settings = FilterSettings {
//!     filter_mode: FilterMode::Mute,
//!     ..Default::default()
//! };
//! let segments = vec![Segment::new("00:00:30", "00:00:35", ContentType::Profanity, 5)];
//! let mut controller = FilterController::new(settings, segments);
//! let mut player = SimulatedPlayer::new(1);
//!
//! player.advance_to(31.0);
//! controller.tick(&mut player, 31.0);
//! assert!(controller.is_filtering());
//! ```

pub mod content;
pub mod controller;
pub mod matcher;
pub mod monitor;
pub mod platform;
pub mod player;
pub mod settings;
pub mod source;
pub mod stats;
pub mod time_codec;
pub mod validation;

pub use content::{ContentType, FilterCriteria, FilterMode, Segment, TimeValue, TimestampFile};
pub use controller::{FilterAction, FilterController, FilterPhase, DEFAULT_ADVANCEMENT_BUFFER};
pub use matcher::{
    find_active_segment, get_upcoming_segments, ActiveMatch, UpcomingSegment,
    DEFAULT_UPCOMING_WINDOW,
};
pub use monitor::{
    find_video_element, ConfigError, MonitorConfig, MonitorEvent, MonitorTransition, VideoMonitor,
    VideoPage,
};
pub use platform::{Platform, PlatformRegistry};
pub use player::{ElementId, FilterHooks, NoopHooks, PlayerError, SimulatedPlayer, VideoElement};
pub use settings::{FilterSettings, SettingsChange};
pub use source::{demo_segments, load_segments, Fallback, JsonDirSource, SegmentSource, SourceError};
pub use stats::{get_timestamp_stats, SeverityBreakdown, TimestampStats};
pub use time_codec::{format_time, parse_time, parse_time_str, parse_time_strict, TimeError};
pub use validation::{
    is_valid_imdb_id, validate_file, validate_timestamp, validate_timestamp_file,
    ValidationResult,
};

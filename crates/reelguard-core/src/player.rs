//! Video element and UI hook abstractions.
//!
//! The engine never touches a DOM or a media pipeline directly. It drives a
//! [`VideoElement`] for playback mutations and reports what it did through
//! [`FilterHooks`] so a UI layer can render badges, notifications or
//! overlays.

use thiserror::Error;

use crate::content::Segment;

/// Identity of a video element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "video#{}", self.0)
    }
}

/// Errors raised when mutating a video element.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The element was removed from the page.
    #[error("video element {0} is no longer attached")]
    Detached(ElementId),

    /// The player refused the operation.
    #[error("player rejected {operation}: {reason}")]
    Rejected {
        /// Operation that was attempted.
        operation: &'static str,
        /// Reason reported by the player.
        reason: String,
    },
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// A playable video element.
pub trait VideoElement {
    /// Stable identity used to detect element replacement.
    fn id(&self) -> ElementId;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Moves the playback position.
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    /// Returns the current mute flag.
    fn is_muted(&self) -> bool;

    /// Sets the mute flag.
    fn set_muted(&mut self, muted: bool) -> Result<()>;

    /// Creates the blur overlay for this element (hidden).
    fn create_blur_overlay(&mut self) -> Result<()>;

    /// Shows or hides the blur overlay.
    fn set_blur_visible(&mut self, visible: bool) -> Result<()>;

    /// Rendered width and height in pixels.
    fn size(&self) -> (f64, f64);

    /// Rendered area in square pixels.
    fn area(&self) -> f64 {
        let (width, height) = self.size();
        width * height
    }
}

/// Side-effect hooks for the UI layer.
///
/// All methods default to no-ops.
pub trait FilterHooks {
    /// Playback jumped past `segment` to `target` seconds.
    fn on_skip(&mut self, _segment: &Segment, _target: f64) {}

    /// Audio was muted for `segment`.
    fn on_mute_start(&mut self, _segment: &Segment) {}

    /// Audio mute was restored.
    fn on_mute_end(&mut self) {}

    /// The picture was blurred for `segment`.
    fn on_blur_start(&mut self, _segment: &Segment) {}

    /// The blur was removed.
    fn on_blur_end(&mut self) {}

    /// A short message should be shown to the viewer.
    fn on_notify(&mut self, _message: &str) {}
}

/// Hooks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl FilterHooks for NoopHooks {}

/// In-memory video element.
///
/// Used by the `simulate` command and by tests; mutations are applied
/// immediately and playback only moves when told to.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPlayer {
    id: ElementId,
    time: f64,
    muted: bool,
    overlay_created: bool,
    blur_visible: bool,
    width: f64,
    height: f64,
}

impl SimulatedPlayer {
    /// Creates a 1280x720 player at position zero.
    pub fn new(id: u64) -> Self {
        Self {
            id: ElementId(id),
            time: 0.0,
            muted: false,
            overlay_created: false,
            blur_visible: false,
            width: 1280.0,
            height: 720.0,
        }
    }

    /// Sets the rendered size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the initial mute flag.
    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Moves the playhead as if playback advanced.
    pub fn advance_to(&mut self, seconds: f64) {
        self.time = seconds;
    }

    /// Returns true once the blur overlay has been created.
    pub fn has_overlay(&self) -> bool {
        self.overlay_created
    }

    /// Returns true while the blur overlay is shown.
    pub fn is_blurred(&self) -> bool {
        self.blur_visible
    }
}

impl VideoElement for SimulatedPlayer {
    fn id(&self) -> ElementId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        self.time = seconds;
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        Ok(())
    }

    fn create_blur_overlay(&mut self) -> Result<()> {
        self.overlay_created = true;
        Ok(())
    }

    fn set_blur_visible(&mut self, visible: bool) -> Result<()> {
        if !self.overlay_created {
            return Err(PlayerError::Rejected {
                operation: "set_blur_visible",
                reason: "overlay not created".to_string(),
            });
        }
        self.blur_visible = visible;
        Ok(())
    }

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

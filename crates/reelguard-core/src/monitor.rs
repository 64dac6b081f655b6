//! Video element discovery and playback monitoring.
//!
//! ## Architecture
//!
//! ```text
//! discovery interval (500ms) ──► poll_for_video() ──► start/stop monitoring
//! check interval (100ms) ─────┐
//! time update event ──────────┼► check_video_time() ──► FilterController::tick
//! seek event ─────────────────┘
//! settings change ────────────► FilterController::apply_settings
//! ```
//!
//! Everything runs on one task: [`VideoMonitor::run`] selects over both
//! intervals and the event channel, so no state is shared across threads.
//! The check interval only exists while an element is monitored, and events
//! carrying the id of an element that is no longer monitored are dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::controller::{FilterAction, FilterController, DEFAULT_ADVANCEMENT_BUFFER};
use crate::matcher::DEFAULT_UPCOMING_WINDOW;
use crate::player::{ElementId, FilterHooks, NoopHooks, VideoElement};
use crate::settings::SettingsChange;

/// Default interval for video element discovery.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default interval for playback time checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Elements at or below this area (100x100 px) are ignored.
pub const DEFAULT_MIN_VIDEO_AREA: f64 = 10_000.0;

/// A monitor configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The skip buffer is negative or not a number.
    #[error("advancement_buffer must be a finite number >= 0 (got {0})")]
    AdvancementBuffer(f64),

    /// The minimum element area is negative or not a number.
    #[error("min_video_area must be a finite number >= 0 (got {0})")]
    MinVideoArea(f64),

    /// The look-ahead window is negative or not a number.
    #[error("upcoming_window must be a finite number >= 0 (got {0})")]
    UpcomingWindow(f64),
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Timing and thresholds for the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Element discovery interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Playback time check interval in milliseconds.
    pub check_interval_ms: u64,
    /// Seconds added past a segment's end when skipping.
    pub advancement_buffer: f64,
    /// Minimum rendered area for an element to be considered.
    pub min_video_area: f64,
    /// Look-ahead window for upcoming segment reports, in seconds.
    pub upcoming_window: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            check_interval_ms: DEFAULT_CHECK_INTERVAL.as_millis() as u64,
            advancement_buffer: DEFAULT_ADVANCEMENT_BUFFER,
            min_video_area: DEFAULT_MIN_VIDEO_AREA,
            upcoming_window: DEFAULT_UPCOMING_WINDOW,
        }
    }
}

impl MonitorConfig {
    /// Element discovery interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Playback time check interval.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }

    /// Checks that every threshold is usable.
    ///
    /// A negative skip buffer would seek back into the segment being
    /// skipped and loop forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !non_negative(self.advancement_buffer) {
            return Err(ConfigError::AdvancementBuffer(self.advancement_buffer));
        }
        if !non_negative(self.min_video_area) {
            return Err(ConfigError::MinVideoArea(self.min_video_area));
        }
        if !non_negative(self.upcoming_window) {
            return Err(ConfigError::UpcomingWindow(self.upcoming_window));
        }
        Ok(())
    }
}

/// A page that can be searched for video elements.
pub trait VideoPage {
    /// Handle to a video element on this page.
    type Element: VideoElement;

    /// Returns all elements matching `selector`, in document order.
    fn query_videos(&self, selector: &str) -> Vec<Self::Element>;
}

/// Picks the main video: the largest element with an area above `min_area`.
///
/// On equal areas the first element wins.
pub fn find_video_element<E: VideoElement>(candidates: Vec<E>, min_area: f64) -> Option<E> {
    let mut best: Option<(f64, E)> = None;

    for candidate in candidates {
        let area = candidate.area();
        let larger = match &best {
            Some((best_area, _)) => area > *best_area,
            None => true,
        };
        if area > min_area && larger {
            best = Some((area, candidate));
        }
    }

    best.map(|(_, element)| element)
}

/// Input delivered to a running monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// The element reported a playback time update.
    TimeUpdate(ElementId),
    /// The element finished seeking.
    Seeked(ElementId),
    /// The settings store reported a change.
    Settings(SettingsChange),
    /// Stop monitoring and return.
    Shutdown,
}

/// Result of an element discovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorTransition {
    /// Monitoring started on a new element.
    Started(ElementId),
    /// The monitored element disappeared.
    Stopped(ElementId),
}

/// Attaches a [`FilterController`] to the main video element of a page.
pub struct VideoMonitor<P: VideoPage, H: FilterHooks = NoopHooks> {
    page: P,
    selector: String,
    config: MonitorConfig,
    controller: FilterController<H>,
    video: Option<P::Element>,
}

impl<P: VideoPage, H: FilterHooks> std::fmt::Debug for VideoMonitor<P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoMonitor")
            .field("selector", &self.selector)
            .field("config", &self.config)
            .field("video", &self.monitored_id())
            .field("phase", &self.controller.phase())
            .finish()
    }
}

impl<P: VideoPage, H: FilterHooks> VideoMonitor<P, H> {
    /// Creates a monitor for `page` using the platform's video selector.
    pub fn new(
        page: P,
        selector: impl Into<String>,
        controller: FilterController<H>,
        config: MonitorConfig,
    ) -> Self {
        let controller = controller.with_advancement_buffer(config.advancement_buffer);
        Self {
            page,
            selector: selector.into(),
            config,
            controller,
            video: None,
        }
    }

    /// The filter controller.
    pub fn controller(&self) -> &FilterController<H> {
        &self.controller
    }

    /// Monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Returns true while an element is monitored.
    pub fn is_monitoring(&self) -> bool {
        self.video.is_some()
    }

    /// Identity of the monitored element.
    pub fn monitored_id(&self) -> Option<ElementId> {
        self.video.as_ref().map(VideoElement::id)
    }

    /// Runs one discovery pass.
    ///
    /// Monitoring restarts only when the main element's identity changes.
    pub fn poll_for_video(&mut self) -> Option<MonitorTransition> {
        let found = find_video_element(
            self.page.query_videos(&self.selector),
            self.config.min_video_area,
        );

        match (found, self.monitored_id()) {
            (Some(video), current) if current != Some(video.id()) => {
                let id = video.id();
                info!("Video element found: {}", id);
                self.start_monitoring(video);
                Some(MonitorTransition::Started(id))
            }
            (None, Some(current)) => {
                info!("Video element lost: {}", current);
                self.stop_monitoring();
                Some(MonitorTransition::Stopped(current))
            }
            _ => None,
        }
    }

    /// Samples the monitored element and lets the controller react.
    pub fn check_video_time(&mut self) -> Option<FilterAction> {
        let video = self.video.as_mut()?;
        let current_time = video.current_time();
        let action = self.controller.tick(video, current_time);

        match action {
            Some(action) if action.is_restore() => {
                debug!("{} at {:.3}s on {}", action.name(), current_time, video.id());
            }
            Some(action) => {
                info!("{} at {:.3}s on {}", action.name(), current_time, video.id());
            }
            None => {}
        }
        action
    }

    /// Handles one event. Returns false on shutdown.
    pub fn handle_event(&mut self, event: MonitorEvent) -> bool {
        match event {
            MonitorEvent::TimeUpdate(id) | MonitorEvent::Seeked(id) => {
                if self.monitored_id() == Some(id) {
                    self.check_video_time();
                } else {
                    debug!("Ignoring event from detached element {}", id);
                }
                true
            }
            MonitorEvent::Settings(change) => {
                self.controller.apply_settings(self.video.as_mut(), &change);
                true
            }
            MonitorEvent::Shutdown => false,
        }
    }

    /// Starts monitoring `video`, discarding state from any previous element.
    pub fn start_monitoring(&mut self, video: P::Element) {
        self.controller.reset();
        debug!("Started monitoring {}", video.id());
        self.video = Some(video);
    }

    /// Stops monitoring and discards transient filter state.
    pub fn stop_monitoring(&mut self) {
        if let Some(video) = self.video.take() {
            debug!("Stopped monitoring {}", video.id());
        }
        self.controller.reset();
    }

    /// Runs discovery and time checks until `events` closes or a
    /// [`MonitorEvent::Shutdown`] arrives, then returns the monitor.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<MonitorEvent>) -> Self {
        let mut discovery = interval(self.config.poll_interval());
        discovery.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut check: Option<Interval> = None;

        info!("Video monitor running (selector {:?})", self.selector);

        loop {
            tokio::select! {
                _ = discovery.tick() => {
                    match self.poll_for_video() {
                        Some(MonitorTransition::Started(_)) => {
                            check = Some(self.new_check_interval());
                        }
                        Some(MonitorTransition::Stopped(_)) => {
                            check = None;
                        }
                        None => {}
                    }
                }
                _ = next_check(&mut check) => {
                    self.check_video_time();
                }
                event = events.recv() => {
                    let keep_running = match event {
                        Some(event) => self.handle_event(event),
                        None => false,
                    };
                    if !keep_running {
                        break;
                    }
                }
            }
        }

        drop(check);
        self.stop_monitoring();
        info!("Video monitor stopped");
        self
    }

    fn new_check_interval(&self) -> Interval {
        let mut check = interval(self.config.check_interval());
        check.set_missed_tick_behavior(MissedTickBehavior::Skip);
        check
    }
}

// Pending forever while nothing is monitored.
async fn next_check(check: &mut Option<Interval>) {
    match check {
        Some(check) => {
            check.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::content::{ContentType, FilterMode, Segment};
    use crate::player::Result;
    use crate::settings::FilterSettings;

    #[derive(Debug, Default)]
    struct VideoState {
        time: f64,
        muted: bool,
        blurred: bool,
        mute_calls: Vec<bool>,
        seeks: Vec<f64>,
    }

    /// Shared handle, like a DOM element reference.
    #[derive(Debug, Clone)]
    struct FakeVideo {
        id: ElementId,
        size: (f64, f64),
        state: Rc<RefCell<VideoState>>,
    }

    impl FakeVideo {
        fn new(id: u64, width: f64, height: f64) -> Self {
            Self {
                id: ElementId(id),
                size: (width, height),
                state: Rc::new(RefCell::new(VideoState::default())),
            }
        }

        fn set_time(&self, time: f64) {
            self.state.borrow_mut().time = time;
        }
    }

    impl VideoElement for FakeVideo {
        fn id(&self) -> ElementId {
            self.id
        }
        fn current_time(&self) -> f64 {
            self.state.borrow().time
        }
        fn set_current_time(&mut self, seconds: f64) -> Result<()> {
            let mut state = self.state.borrow_mut();
            state.time = seconds;
            state.seeks.push(seconds);
            Ok(())
        }
        fn is_muted(&self) -> bool {
            self.state.borrow().muted
        }
        fn set_muted(&mut self, muted: bool) -> Result<()> {
            let mut state = self.state.borrow_mut();
            state.muted = muted;
            state.mute_calls.push(muted);
            Ok(())
        }
        fn create_blur_overlay(&mut self) -> Result<()> {
            Ok(())
        }
        fn set_blur_visible(&mut self, visible: bool) -> Result<()> {
            self.state.borrow_mut().blurred = visible;
            Ok(())
        }
        fn size(&self) -> (f64, f64) {
            self.size
        }
    }

    #[derive(Debug, Clone, Default)]
    struct FakePage {
        videos: Rc<RefCell<Vec<FakeVideo>>>,
    }

    impl FakePage {
        fn set_videos(&self, videos: Vec<FakeVideo>) {
            *self.videos.borrow_mut() = videos;
        }
    }

    impl VideoPage for FakePage {
        type Element = FakeVideo;

        fn query_videos(&self, _selector: &str) -> Vec<FakeVideo> {
            self.videos.borrow().clone()
        }
    }

    fn monitor(page: FakePage, mode: FilterMode) -> VideoMonitor<FakePage> {
        let settings = FilterSettings {
            filter_mode: mode,
            ..Default::default()
        };
        let segments = vec![Segment::new(30.0, 35.0, ContentType::Violence, 5)];
        VideoMonitor::new(
            page,
            "video",
            FilterController::new(settings, segments),
            MonitorConfig::default(),
        )
    }

    // ==================== Discovery Tests ====================

    #[test]
    fn largest_visible_element_wins() {
        let videos = vec![
            FakeVideo::new(1, 320.0, 180.0),
            FakeVideo::new(2, 1920.0, 1080.0),
            FakeVideo::new(3, 640.0, 360.0),
        ];
        let found = find_video_element(videos, DEFAULT_MIN_VIDEO_AREA).unwrap();
        assert_eq!(found.id(), ElementId(2));
    }

    #[test]
    fn tiny_elements_are_ignored() {
        let videos = vec![FakeVideo::new(1, 100.0, 100.0), FakeVideo::new(2, 50.0, 150.0)];
        assert!(find_video_element(videos, DEFAULT_MIN_VIDEO_AREA).is_none());
    }

    #[test]
    fn thin_element_counts_by_area() {
        let videos = vec![FakeVideo::new(1, 100.0, 100.0), FakeVideo::new(2, 50.0, 400.0)];
        let found = find_video_element(videos, DEFAULT_MIN_VIDEO_AREA).unwrap();
        assert_eq!(found.id(), ElementId(2));
    }

    #[test]
    fn equal_areas_keep_first() {
        let videos = vec![FakeVideo::new(1, 400.0, 300.0), FakeVideo::new(2, 300.0, 400.0)];
        let found = find_video_element(videos, DEFAULT_MIN_VIDEO_AREA).unwrap();
        assert_eq!(found.id(), ElementId(1));
    }

    #[test]
    fn restarts_only_on_identity_change() {
        let page = FakePage::default();
        let mut monitor = monitor(page.clone(), FilterMode::Mute);
        let first = FakeVideo::new(1, 1280.0, 720.0);

        page.set_videos(vec![first.clone()]);
        assert_eq!(monitor.poll_for_video(), Some(MonitorTransition::Started(ElementId(1))));
        assert_eq!(monitor.poll_for_video(), None);

        page.set_videos(vec![FakeVideo::new(2, 1280.0, 720.0)]);
        assert_eq!(monitor.poll_for_video(), Some(MonitorTransition::Started(ElementId(2))));

        page.set_videos(Vec::new());
        assert_eq!(monitor.poll_for_video(), Some(MonitorTransition::Stopped(ElementId(2))));
        assert!(!monitor.is_monitoring());
        assert_eq!(monitor.poll_for_video(), None);
    }

    #[test]
    fn losing_element_discards_filter_state() {
        let page = FakePage::default();
        let mut monitor = monitor(page.clone(), FilterMode::Mute);
        let video = FakeVideo::new(1, 1280.0, 720.0);
        page.set_videos(vec![video.clone()]);
        monitor.poll_for_video();

        video.set_time(31.0);
        assert_eq!(monitor.check_video_time(), Some(FilterAction::MuteEngaged));
        assert!(monitor.controller().is_filtering());

        page.set_videos(Vec::new());
        monitor.poll_for_video();
        assert!(!monitor.controller().is_filtering());
        assert!(monitor.check_video_time().is_none());
    }

    #[test]
    fn events_from_detached_elements_are_ignored() {
        let page = FakePage::default();
        let mut monitor = monitor(page.clone(), FilterMode::Skip);
        let old = FakeVideo::new(1, 1280.0, 720.0);
        let current = FakeVideo::new(2, 1280.0, 720.0);
        page.set_videos(vec![current.clone()]);
        monitor.poll_for_video();

        old.set_time(31.0);
        current.set_time(10.0);
        assert!(monitor.handle_event(MonitorEvent::Seeked(ElementId(1))));
        assert!(old.state.borrow().seeks.is_empty());

        current.set_time(32.0);
        monitor.handle_event(MonitorEvent::Seeked(ElementId(2)));
        assert_eq!(current.state.borrow().seeks, vec![35.5]);
    }

    #[test]
    fn shutdown_event_stops_loop() {
        let mut monitor = monitor(FakePage::default(), FilterMode::Skip);
        assert!(!monitor.handle_event(MonitorEvent::Shutdown));
    }

    #[test]
    fn config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.check_interval(), Duration::from_millis(100));
        assert_eq!(config.advancement_buffer, 0.5);

        let partial: MonitorConfig =
            serde_json::from_str(r#"{"check_interval_ms": 250}"#).unwrap();
        assert_eq!(partial.check_interval(), Duration::from_millis(250));
        assert_eq!(partial.poll_interval_ms, 500);
        assert!(partial.validate().is_ok());
    }

    #[test]
    fn config_rejects_bad_thresholds() {
        let backwards = MonitorConfig {
            advancement_buffer: -10.0,
            ..Default::default()
        };
        assert_eq!(backwards.validate(), Err(ConfigError::AdvancementBuffer(-10.0)));

        let nan_buffer = MonitorConfig {
            advancement_buffer: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            nan_buffer.validate(),
            Err(ConfigError::AdvancementBuffer(_))
        ));

        let area = MonitorConfig {
            min_video_area: f64::INFINITY,
            ..Default::default()
        };
        assert!(matches!(area.validate(), Err(ConfigError::MinVideoArea(_))));

        let window = MonitorConfig {
            upcoming_window: -1.0,
            ..Default::default()
        };
        assert_eq!(window.validate(), Err(ConfigError::UpcomingWindow(-1.0)));

        let zero = MonitorConfig {
            advancement_buffer: 0.0,
            min_video_area: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_ok());
    }

    // ==================== Run Loop Tests ====================

    #[tokio::test(start_paused = true)]
    async fn run_loop_mutes_and_restores() {
        let page = FakePage::default();
        let video = FakeVideo::new(7, 1280.0, 720.0);
        page.set_videos(vec![video.clone()]);

        let monitor = monitor(page.clone(), FilterMode::Mute);
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            video.set_time(31.0);
            tokio::time::sleep(Duration::from_millis(250)).await;
            assert!(video.state.borrow().muted);

            video.set_time(36.0);
            tx.send(MonitorEvent::TimeUpdate(ElementId(7))).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(!video.state.borrow().muted);

            page.set_videos(Vec::new());
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(MonitorEvent::Shutdown).unwrap();
        };

        let (monitor, ()) = tokio::join!(monitor.run(rx), driver);

        assert!(!monitor.is_monitoring());
        assert_eq!(video.state.borrow().mute_calls, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_applies_settings_changes() {
        let page = FakePage::default();
        let video = FakeVideo::new(3, 1280.0, 720.0);
        page.set_videos(vec![video.clone()]);

        let monitor = monitor(page.clone(), FilterMode::Blur);
        let (tx, rx) = mpsc::unbounded_channel();

        // Closing the channel ends the loop
        let driver = async move {
            video.set_time(33.0);
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert!(video.state.borrow().blurred);

            tx.send(MonitorEvent::Settings(SettingsChange::enabled(false)))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(!video.state.borrow().blurred);

            tokio::time::sleep(Duration::from_millis(300)).await;
            assert!(!video.state.borrow().blurred);
        };

        let (monitor, ()) = tokio::join!(monitor.run(rx), driver);

        assert!(!monitor.controller().settings().enabled);
    }
}

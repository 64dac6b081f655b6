//! Playback filter controller.
//!
//! ## States
//!
//! - **Idle**: no filter is applied
//! - **Muting**: audio is muted until the active segment ends
//! - **Blurring**: the blur overlay is shown until the active segment ends
//!
//! Skip mode never holds a state: entering a segment seeks past it and the
//! controller stays idle.
//!
//! Every driving signal (periodic timer, time updates, seeks) ends up in
//! [`FilterController::tick`]. Calling it repeatedly for the same instant is
//! safe: held states are not re-entered and a skip that was already issued
//! for a segment is not issued again until the playhead leaves it.
//!
//! While a state is held, any further match (including a different adjacent
//! segment) keeps the current state without firing the entry action again.

use tracing::{debug, info, warn};

use crate::content::{FilterCriteria, FilterMode, Segment};
use crate::matcher::find_active_segment;
use crate::player::{FilterHooks, NoopHooks, Result, VideoElement};
use crate::settings::{FilterSettings, SettingsChange};
use crate::time_codec::format_time;

/// Seconds added past a segment's end when skipping it.
pub const DEFAULT_ADVANCEMENT_BUFFER: f64 = 0.5;

/// Filter state held between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterPhase {
    /// Nothing is applied.
    #[default]
    Idle,
    /// Audio is muted; `original_muted` is restored on exit.
    Muting {
        /// Mute flag before filtering started.
        original_muted: bool,
    },
    /// The blur overlay is shown.
    Blurring,
}

impl FilterPhase {
    /// Returns true if a filter is currently held.
    pub fn is_filtering(&self) -> bool {
        !matches!(self, FilterPhase::Idle)
    }

    /// Returns the mode being held, if any.
    pub fn held_mode(&self) -> Option<FilterMode> {
        match self {
            FilterPhase::Idle => None,
            FilterPhase::Muting { .. } => Some(FilterMode::Mute),
            FilterPhase::Blurring => Some(FilterMode::Blur),
        }
    }
}

/// Action the controller performed on the video element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterAction {
    /// Playback jumped from `from` to `to`.
    Skipped {
        /// Position when the segment was detected.
        from: f64,
        /// Position after the seek.
        to: f64,
    },
    /// Audio was muted.
    MuteEngaged,
    /// Audio mute flag was restored.
    MuteRestored,
    /// Blur overlay was shown.
    BlurShown,
    /// Blur overlay was hidden.
    BlurHidden,
}

impl FilterAction {
    /// Short name for logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            FilterAction::Skipped { .. } => "skip",
            FilterAction::MuteEngaged => "mute",
            FilterAction::MuteRestored => "unmute",
            FilterAction::BlurShown => "blur",
            FilterAction::BlurHidden => "unblur",
        }
    }

    /// Returns true for actions that undo a held filter.
    pub fn is_restore(&self) -> bool {
        matches!(self, FilterAction::MuteRestored | FilterAction::BlurHidden)
    }
}

/// Drives filter actions from playback time.
///
/// One controller serves one page. Per-element state is cleared with
/// [`reset`](Self::reset) whenever a different video element is monitored.
#[derive(Debug)]
pub struct FilterController<H: FilterHooks = NoopHooks> {
    settings: FilterSettings,
    criteria: FilterCriteria,
    segments: Vec<Segment>,
    phase: FilterPhase,
    overlay_ready: bool,
    pending_skip: Option<f64>,
    advancement_buffer: f64,
    hooks: H,
}

impl FilterController<NoopHooks> {
    /// Creates a controller without UI hooks.
    pub fn new(settings: FilterSettings, segments: Vec<Segment>) -> Self {
        Self::with_hooks(settings, segments, NoopHooks)
    }
}

impl<H: FilterHooks> FilterController<H> {
    /// Creates a controller reporting to `hooks`.
    pub fn with_hooks(settings: FilterSettings, segments: Vec<Segment>, hooks: H) -> Self {
        Self {
            criteria: settings.criteria(),
            settings,
            segments,
            phase: FilterPhase::Idle,
            overlay_ready: false,
            pending_skip: None,
            advancement_buffer: DEFAULT_ADVANCEMENT_BUFFER,
            hooks,
        }
    }

    /// Sets the distance past a segment's end used when skipping.
    ///
    /// Negative or non-finite values would seek back into the segment, so
    /// they are ignored.
    pub fn with_advancement_buffer(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds >= 0.0 {
            self.advancement_buffer = seconds;
        } else {
            warn!("Ignoring invalid advancement buffer {}", seconds);
        }
        self
    }

    /// Current settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Current segment list.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Current held state.
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// Returns true while a mute or blur is held.
    pub fn is_filtering(&self) -> bool {
        self.phase.is_filtering()
    }

    /// UI hooks.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Replaces the segment list wholesale.
    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        debug!("Segment list replaced: {} segments", segments.len());
        self.segments = segments;
        self.pending_skip = None;
    }

    /// Discards per-element state without touching any element.
    ///
    /// Call when the monitored element changes or disappears.
    pub fn reset(&mut self) {
        if self.phase.is_filtering() {
            debug!("Discarding held {:?} state", self.phase);
        }
        self.phase = FilterPhase::Idle;
        self.overlay_ready = false;
        self.pending_skip = None;
    }

    /// Evaluates the playback position and applies or restores filters.
    ///
    /// Returns the action performed, if any. Failed element mutations are
    /// logged and not retried; the next tick starts from the resulting state.
    pub fn tick<V: VideoElement>(&mut self, video: &mut V, current_time: f64) -> Option<FilterAction> {
        if !self.settings.enabled {
            return None;
        }

        let active = find_active_segment(current_time, &self.segments, &self.criteria)
            .map(|m| (m.index, m.end_seconds));

        let result = match active {
            Some((index, end_seconds)) => self.engage(video, index, end_seconds, current_time),
            None => {
                self.pending_skip = None;
                self.release(video)
            }
        };

        match result {
            Ok(action) => action,
            Err(e) => {
                warn!("Filter action on {} failed: {}", video.id(), e);
                None
            }
        }
    }

    /// Applies a settings change.
    ///
    /// Disabling filtering, or switching mode while a filter is held, restores
    /// the held filter immediately. `video` is `None` when no element is
    /// monitored, in which case held state is simply discarded.
    pub fn apply_settings<V: VideoElement>(
        &mut self,
        video: Option<&mut V>,
        change: &SettingsChange,
    ) -> Option<FilterAction> {
        let was_enabled = self.settings.enabled;

        self.settings.apply(change);
        self.criteria = self.settings.criteria();

        if let Some(timestamps) = &change.timestamps {
            self.set_segments(timestamps.clone());
        }

        if was_enabled != self.settings.enabled {
            info!(
                "Filtering {}",
                if self.settings.enabled { "enabled" } else { "disabled" }
            );
        }

        let disabled = was_enabled && !self.settings.enabled;
        let stale_mode = self
            .phase
            .held_mode()
            .is_some_and(|held| held != self.settings.filter_mode);

        if !self.phase.is_filtering() || !(disabled || stale_mode) {
            return None;
        }

        match video {
            Some(video) => match self.release(video) {
                Ok(action) => action,
                Err(e) => {
                    warn!("Restoring {} failed: {}", video.id(), e);
                    None
                }
            },
            None => {
                self.phase = FilterPhase::Idle;
                None
            }
        }
    }

    fn engage<V: VideoElement>(
        &mut self,
        video: &mut V,
        index: usize,
        end_seconds: f64,
        current_time: f64,
    ) -> Result<Option<FilterAction>> {
        if self.phase.is_filtering() {
            return Ok(None);
        }

        let mode = self.settings.filter_mode;
        let segment = &self.segments[index];

        let action = match mode {
            FilterMode::Skip => {
                let target = end_seconds + self.advancement_buffer;
                if self.pending_skip == Some(target) {
                    return Ok(None);
                }

                video.set_current_time(target)?;
                self.pending_skip = Some(target);
                debug!(
                    "Skipped {} segment to {}",
                    segment.content_type,
                    format_time(target)
                );
                self.hooks.on_skip(segment, target);
                FilterAction::Skipped {
                    from: current_time,
                    to: target,
                }
            }
            FilterMode::Mute => {
                let original_muted = video.is_muted();
                video.set_muted(true)?;
                self.phase = FilterPhase::Muting { original_muted };
                debug!("Muted for {} segment", segment.content_type);
                self.hooks.on_mute_start(segment);
                FilterAction::MuteEngaged
            }
            FilterMode::Blur => {
                if !self.overlay_ready {
                    video.create_blur_overlay()?;
                    self.overlay_ready = true;
                }
                video.set_blur_visible(true)?;
                self.phase = FilterPhase::Blurring;
                debug!("Blurred for {} segment", segment.content_type);
                self.hooks.on_blur_start(segment);
                FilterAction::BlurShown
            }
        };

        self.hooks.on_notify(mode.notification());
        Ok(Some(action))
    }

    // Restoration follows the held state, not the configured mode.
    fn release<V: VideoElement>(&mut self, video: &mut V) -> Result<Option<FilterAction>> {
        match std::mem::take(&mut self.phase) {
            FilterPhase::Idle => Ok(None),
            FilterPhase::Muting { original_muted } => {
                video.set_muted(original_muted)?;
                debug!("Audio restored (muted={})", original_muted);
                self.hooks.on_mute_end();
                Ok(Some(FilterAction::MuteRestored))
            }
            FilterPhase::Blurring => {
                video.set_blur_visible(false)?;
                debug!("Blur removed");
                self.hooks.on_blur_end();
                Ok(Some(FilterAction::BlurHidden))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;
    use crate::player::{ElementId, PlayerError, SimulatedPlayer};

    #[derive(Debug, Default)]
    struct RecordingHooks {
        events: Vec<String>,
    }

    impl FilterHooks for RecordingHooks {
        fn on_skip(&mut self, _segment: &Segment, target: f64) {
            self.events.push(format!("skip:{target}"));
        }
        fn on_mute_start(&mut self, segment: &Segment) {
            self.events.push(format!("mute_start:{}", segment.content_type));
        }
        fn on_mute_end(&mut self) {
            self.events.push("mute_end".to_string());
        }
        fn on_blur_start(&mut self, _segment: &Segment) {
            self.events.push("blur_start".to_string());
        }
        fn on_blur_end(&mut self) {
            self.events.push("blur_end".to_string());
        }
        fn on_notify(&mut self, message: &str) {
            self.events.push(format!("notify:{message}"));
        }
    }

    /// Player whose mutations always fail.
    struct BrokenPlayer;

    impl VideoElement for BrokenPlayer {
        fn id(&self) -> ElementId {
            ElementId(99)
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        fn set_current_time(&mut self, _seconds: f64) -> Result<()> {
            Err(PlayerError::Detached(ElementId(99)))
        }
        fn is_muted(&self) -> bool {
            false
        }
        fn set_muted(&mut self, _muted: bool) -> Result<()> {
            Err(PlayerError::Detached(ElementId(99)))
        }
        fn create_blur_overlay(&mut self) -> Result<()> {
            Err(PlayerError::Detached(ElementId(99)))
        }
        fn set_blur_visible(&mut self, _visible: bool) -> Result<()> {
            Err(PlayerError::Detached(ElementId(99)))
        }
        fn size(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
    }

    fn settings(mode: FilterMode) -> FilterSettings {
        FilterSettings {
            filter_mode: mode,
            ..Default::default()
        }
    }

    fn violence(start: f64, end: f64) -> Segment {
        Segment::new(start, end, ContentType::Violence, 5)
    }

    fn controller(mode: FilterMode, segments: Vec<Segment>) -> FilterController<RecordingHooks> {
        FilterController::with_hooks(settings(mode), segments, RecordingHooks::default())
    }

    fn run(
        controller: &mut FilterController<RecordingHooks>,
        player: &mut SimulatedPlayer,
        times: &[f64],
    ) -> Vec<(f64, FilterAction)> {
        times
            .iter()
            .filter_map(|&t| {
                player.advance_to(t);
                controller.tick(player, t).map(|a| (t, a))
            })
            .collect()
    }

    // ==================== Action Tests ====================

    #[test]
    fn restore_actions_are_flagged() {
        assert!(FilterAction::MuteRestored.is_restore());
        assert!(FilterAction::BlurHidden.is_restore());
        assert!(!FilterAction::MuteEngaged.is_restore());
        assert!(!FilterAction::Skipped { from: 1.0, to: 2.0 }.is_restore());
        assert_eq!(FilterAction::BlurHidden.name(), "unblur");
    }

    // ==================== Mute Tests ====================

    #[test]
    fn mute_engages_once_and_restores_once() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);

        let actions = run(&mut controller, &mut player, &[29.0, 30.0, 32.0, 35.0, 36.0]);

        assert_eq!(
            actions,
            vec![(30.0, FilterAction::MuteEngaged), (35.0, FilterAction::MuteRestored)]
        );
        assert!(!player.is_muted());
        assert_eq!(
            controller.hooks().events,
            vec![
                "mute_start:violence",
                "notify:Audio muted - filtered content",
                "mute_end"
            ]
        );
    }

    #[test]
    fn mute_restores_original_flag() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1).with_muted(true);

        run(&mut controller, &mut player, &[31.0]);
        assert_eq!(controller.phase(), FilterPhase::Muting { original_muted: true });

        run(&mut controller, &mut player, &[40.0]);
        assert!(player.is_muted());
        assert_eq!(controller.phase(), FilterPhase::Idle);
    }

    #[test]
    fn repeated_ticks_at_same_instant_are_idempotent() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);

        let actions = run(&mut controller, &mut player, &[31.0, 31.0, 31.0]);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn adjacent_segments_of_same_mode_do_not_refire() {
        let mut controller = controller(
            FilterMode::Mute,
            vec![violence(30.0, 35.0), violence(35.0, 40.0)],
        );
        let mut player = SimulatedPlayer::new(1);

        let actions = run(&mut controller, &mut player, &[31.0, 35.0, 39.0, 40.0]);

        assert_eq!(
            actions,
            vec![(31.0, FilterAction::MuteEngaged), (40.0, FilterAction::MuteRestored)]
        );
    }

    // ==================== Blur Tests ====================

    #[test]
    fn blur_creates_overlay_once() {
        let mut controller = controller(
            FilterMode::Blur,
            vec![violence(10.0, 20.0), violence(50.0, 60.0)],
        );
        let mut player = SimulatedPlayer::new(1);

        let actions = run(&mut controller, &mut player, &[12.0, 15.0, 25.0, 55.0, 61.0]);

        assert_eq!(
            actions.iter().map(|(_, a)| *a).collect::<Vec<_>>(),
            vec![
                FilterAction::BlurShown,
                FilterAction::BlurHidden,
                FilterAction::BlurShown,
                FilterAction::BlurHidden
            ]
        );
        assert!(player.has_overlay());
        assert!(!player.is_blurred());
    }

    // ==================== Skip Tests ====================

    #[test]
    fn skip_seeks_past_end_with_buffer() {
        let mut controller = controller(FilterMode::Skip, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);

        let action = controller.tick(&mut player, 30.0);

        assert_eq!(action, Some(FilterAction::Skipped { from: 30.0, to: 35.5 }));
        assert_eq!(player.current_time(), 35.5);
        assert!(!controller.is_filtering());
        assert_eq!(
            controller.hooks().events,
            vec!["skip:35.5", "notify:Skipped filtered content"]
        );
    }

    #[test]
    fn skip_is_not_repeated_for_stale_samples() {
        let mut controller = controller(FilterMode::Skip, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);

        assert!(controller.tick(&mut player, 30.0).is_some());
        // A sample taken before the seek landed
        assert!(controller.tick(&mut player, 30.05).is_none());
        // Seek landed, then the viewer seeks back into the segment
        assert!(controller.tick(&mut player, 35.5).is_none());
        assert!(controller.tick(&mut player, 31.0).is_some());
    }

    #[test]
    fn custom_advancement_buffer() {
        let mut controller =
            FilterController::new(settings(FilterMode::Skip), vec![violence(30.0, 35.0)])
                .with_advancement_buffer(2.0);
        let mut player = SimulatedPlayer::new(1);

        controller.tick(&mut player, 33.0);
        assert_eq!(player.current_time(), 37.0);
    }

    #[test]
    fn negative_advancement_buffer_keeps_default() {
        let mut controller =
            FilterController::new(settings(FilterMode::Skip), vec![violence(30.0, 35.0)])
                .with_advancement_buffer(-10.0)
                .with_advancement_buffer(f64::NAN);
        let mut player = SimulatedPlayer::new(1);

        controller.tick(&mut player, 30.0);
        assert_eq!(player.current_time(), 35.5);
        assert!(controller.tick(&mut player, 35.5).is_none());
    }

    // ==================== Criteria Tests ====================

    #[test]
    fn disabled_types_and_low_severity_are_ignored() {
        let mut settings = settings(FilterMode::Mute);
        settings.enabled_types = [ContentType::Nudity].into_iter().collect();
        settings.min_severity = 5;

        let segments = vec![
            violence(10.0, 20.0),
            Segment::new(30.0, 40.0, ContentType::Nudity, 4),
            Segment::new(50.0, 60.0, ContentType::Nudity, 5),
        ];
        let mut controller = FilterController::new(settings, segments);
        let mut player = SimulatedPlayer::new(1);

        assert!(controller.tick(&mut player, 15.0).is_none());
        assert!(controller.tick(&mut player, 35.0).is_none());
        assert_eq!(controller.tick(&mut player, 55.0), Some(FilterAction::MuteEngaged));
    }

    // ==================== Settings Tests ====================

    #[test]
    fn disabled_controller_is_inert() {
        let mut settings = settings(FilterMode::Skip);
        settings.enabled = false;
        let mut controller = FilterController::new(settings, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);

        assert!(controller.tick(&mut player, 31.0).is_none());
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn disabling_while_muted_restores() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        let action = controller.apply_settings(Some(&mut player), &SettingsChange::enabled(false));

        assert_eq!(action, Some(FilterAction::MuteRestored));
        assert!(!player.is_muted());
        assert!(controller.tick(&mut player, 32.0).is_none());
    }

    #[test]
    fn disabling_while_blurred_restores() {
        let mut controller = controller(FilterMode::Blur, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        let action = controller.apply_settings(Some(&mut player), &SettingsChange::enabled(false));

        assert_eq!(action, Some(FilterAction::BlurHidden));
        assert!(!player.is_blurred());
    }

    #[test]
    fn mode_switch_restores_held_mode_then_engages_new_one() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);
        assert_eq!(controller.phase().held_mode(), Some(FilterMode::Mute));

        let action = controller.apply_settings(
            Some(&mut player),
            &SettingsChange::filter_mode(FilterMode::Blur),
        );
        assert_eq!(action, Some(FilterAction::MuteRestored));
        assert!(!player.is_muted());
        assert_eq!(controller.phase().held_mode(), None);

        assert_eq!(controller.tick(&mut player, 31.1), Some(FilterAction::BlurShown));
        assert_eq!(controller.phase().held_mode(), Some(FilterMode::Blur));
    }

    #[test]
    fn setting_same_mode_keeps_held_filter() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        let action = controller.apply_settings(
            Some(&mut player),
            &SettingsChange::filter_mode(FilterMode::Mute),
        );
        assert!(action.is_none());
        assert!(player.is_muted());
    }

    #[test]
    fn replacing_segments_releases_on_next_tick() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        let change = SettingsChange::timestamps(vec![violence(100.0, 110.0)]);
        assert!(controller.apply_settings(Some(&mut player), &change).is_none());
        assert_eq!(controller.segments().len(), 1);

        assert_eq!(controller.tick(&mut player, 31.1), Some(FilterAction::MuteRestored));
    }

    #[test]
    fn settings_change_without_video_discards_state() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        let action = controller.apply_settings::<SimulatedPlayer>(None, &SettingsChange::enabled(false));
        assert!(action.is_none());
        assert!(!controller.is_filtering());
    }

    // ==================== Failure Tests ====================

    #[test]
    fn failed_actions_are_not_retried_as_held_state() {
        let mut controller = controller(FilterMode::Mute, vec![violence(30.0, 35.0)]);
        let mut player = BrokenPlayer;

        assert!(controller.tick(&mut player, 31.0).is_none());
        assert!(!controller.is_filtering());
        assert!(controller.hooks().events.is_empty());
    }

    #[test]
    fn reset_discards_state() {
        let mut controller = controller(FilterMode::Blur, vec![violence(30.0, 35.0)]);
        let mut player = SimulatedPlayer::new(1);
        controller.tick(&mut player, 31.0);

        controller.reset();
        assert_eq!(controller.phase(), FilterPhase::Idle);

        // A fresh element needs its own overlay
        let mut next = SimulatedPlayer::new(2);
        assert_eq!(controller.tick(&mut next, 31.0), Some(FilterAction::BlurShown));
        assert!(next.has_overlay());
    }
}

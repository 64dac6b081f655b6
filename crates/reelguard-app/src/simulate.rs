//! Playback simulation.
//!
//! Drives a [`VideoMonitor`] against an in-memory page holding one
//! [`SimulatedPlayer`]. Playback can be stepped as fast as possible or run in
//! real time through the monitor's event loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use reelguard_core::player::Result as PlayerResult;
use reelguard_core::{
    format_time, ElementId, FilterAction, FilterHooks, MonitorEvent, Segment, SimulatedPlayer,
    VideoElement, VideoMonitor, VideoPage,
};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};

/// Handle to a simulated player shared between the page and the driver.
#[derive(Debug, Clone)]
pub struct SharedPlayer(Rc<RefCell<SimulatedPlayer>>);

impl SharedPlayer {
    /// Wraps a simulated player.
    pub fn new(player: SimulatedPlayer) -> Self {
        Self(Rc::new(RefCell::new(player)))
    }

    /// Moves the playhead.
    pub fn advance_to(&self, seconds: f64) {
        self.0.borrow_mut().advance_to(seconds);
    }

    /// Snapshot of the underlying player.
    pub fn snapshot(&self) -> SimulatedPlayer {
        self.0.borrow().clone()
    }
}

impl VideoElement for SharedPlayer {
    fn id(&self) -> ElementId {
        self.0.borrow().id()
    }

    fn current_time(&self) -> f64 {
        self.0.borrow().current_time()
    }

    fn set_current_time(&mut self, seconds: f64) -> PlayerResult<()> {
        self.0.borrow_mut().set_current_time(seconds)
    }

    fn is_muted(&self) -> bool {
        self.0.borrow().is_muted()
    }

    fn set_muted(&mut self, muted: bool) -> PlayerResult<()> {
        self.0.borrow_mut().set_muted(muted)
    }

    fn create_blur_overlay(&mut self) -> PlayerResult<()> {
        self.0.borrow_mut().create_blur_overlay()
    }

    fn set_blur_visible(&mut self, visible: bool) -> PlayerResult<()> {
        self.0.borrow_mut().set_blur_visible(visible)
    }

    fn size(&self) -> (f64, f64) {
        self.0.borrow().size()
    }
}

/// A page containing a single simulated video.
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    player: SharedPlayer,
}

impl SimulatedPage {
    /// Creates a page showing `player`.
    pub fn new(player: SharedPlayer) -> Self {
        Self { player }
    }
}

impl VideoPage for SimulatedPage {
    type Element = SharedPlayer;

    fn query_videos(&self, _selector: &str) -> Vec<SharedPlayer> {
        vec![self.player.clone()]
    }
}

/// Hooks that print viewer notifications and keep a transcript.
#[derive(Debug, Default)]
pub struct ConsoleHooks {
    /// Print notifications as they happen.
    pub echo: bool,
    /// Every notification, in order.
    pub transcript: Vec<String>,
}

impl ConsoleHooks {
    /// Creates hooks that print when `echo` is set.
    pub fn new(echo: bool) -> Self {
        Self {
            echo,
            transcript: Vec::new(),
        }
    }

    fn record(&mut self, line: String) {
        if self.echo {
            println!("{}", line);
        }
        self.transcript.push(line);
    }
}

impl FilterHooks for ConsoleHooks {
    fn on_skip(&mut self, segment: &Segment, target: f64) {
        self.record(format!(
            "skip {} (severity {}) -> {}",
            segment.content_type,
            segment.severity,
            format_time(target)
        ));
    }

    fn on_mute_start(&mut self, segment: &Segment) {
        self.record(format!(
            "mute {} (severity {})",
            segment.content_type, segment.severity
        ));
    }

    fn on_mute_end(&mut self) {
        self.record("unmute".to_string());
    }

    fn on_blur_start(&mut self, segment: &Segment) {
        self.record(format!(
            "blur {} (severity {})",
            segment.content_type, segment.severity
        ));
    }

    fn on_blur_end(&mut self) {
        self.record("unblur".to_string());
    }

    fn on_notify(&mut self, message: &str) {
        self.record(format!("notice: {}", message));
    }
}

/// One action observed during a stepped simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStep {
    /// Playback position when the action fired.
    pub at: f64,
    /// Action taken by the controller.
    pub action: FilterAction,
}

/// Steps playback from `from` to `to` in increments of `step` seconds.
///
/// Playback continues from wherever the controller leaves the playhead, so a
/// skip moves the simulation forward too.
pub fn run_stepped<H: FilterHooks>(
    monitor: &mut VideoMonitor<SimulatedPage, H>,
    player: &SharedPlayer,
    from: f64,
    to: f64,
    step: f64,
) -> anyhow::Result<Vec<SimStep>> {
    if !(step > 0.0 && step.is_finite()) {
        anyhow::bail!("step must be a positive number of seconds");
    }

    monitor.poll_for_video();

    let mut steps = Vec::new();
    let mut position = from.max(0.0);

    while position < to {
        player.advance_to(position);
        if let Some(action) = monitor.check_video_time() {
            steps.push(SimStep {
                at: position,
                action,
            });
        }
        position = player.current_time() + step;
    }

    Ok(steps)
}

/// Plays back in real time at `speed`x until `to`, then shuts the monitor
/// down and returns it.
pub async fn run_realtime<H: FilterHooks>(
    monitor: VideoMonitor<SimulatedPage, H>,
    player: SharedPlayer,
    to: f64,
    speed: f64,
) -> VideoMonitor<SimulatedPage, H> {
    let (tx, rx) = mpsc::unbounded_channel();
    let tick = monitor.config().check_interval().min(Duration::from_millis(250));

    let driver = async move {
        let mut ticker = interval(tick);
        let mut last = Instant::now();

        loop {
            ticker.tick().await;
            let now = Instant::now();
            let position = player.current_time() + (now - last).as_secs_f64() * speed;
            last = now;

            player.advance_to(position);
            if position >= to || tx.send(MonitorEvent::TimeUpdate(player.id())).is_err() {
                break;
            }
        }

        let _ = tx.send(MonitorEvent::Shutdown);
    };

    let (monitor, ()) = tokio::join!(monitor.run(rx), driver);
    monitor
}

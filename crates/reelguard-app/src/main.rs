//! ReelGuard - playback content filtering.
//!
//! Command-line front end for the filtering engine:
//! - Timestamp file validation, statistics and segment lookups
//! - Local timestamp store (import, export, list, delete)
//! - Persisted viewer settings
//! - Playback simulation through the video monitor

mod commands;
mod simulate;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use directories::ProjectDirs;
use reelguard_core::{
    format_time, FilterAction, FilterController, FilterCriteria, FilterMode, FilterSettings,
    MonitorConfig, PlatformRegistry, Segment, SimulatedPlayer, VideoElement, VideoMonitor,
};
use reelguard_storage::Database;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::commands::SegmentOrigin;
use crate::simulate::{ConsoleHooks, SharedPlayer, SimulatedPage};

/// ReelGuard - skip, mute or blur objectionable segments during playback
#[derive(Parser, Debug)]
#[command(name = "reelguard", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (also logs to the console)
    #[arg(long, global = true)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Database path (defaults to the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Monitor configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Segment selection shared by several commands.
#[derive(ClapArgs, Debug, Clone)]
struct SegmentArgs {
    /// Read segments from a timestamp file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Use segments stored for this IMDb id
    #[arg(long)]
    imdb: Option<String>,
}

impl SegmentArgs {
    fn origin(&self) -> SegmentOrigin {
        SegmentOrigin::from_args(self.file.clone(), self.imdb.clone())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a timestamp file
    Validate {
        /// Timestamp file (JSON)
        file: PathBuf,
    },
    /// Show statistics for a set of segments
    Stats {
        #[command(flatten)]
        segments: SegmentArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the segment active at a playback position
    Match {
        /// Position as HH:MM:SS or seconds
        time: String,
        #[command(flatten)]
        segments: SegmentArgs,
        /// Ignore stored type and severity settings
        #[arg(long)]
        all: bool,
    },
    /// List segments starting soon after a playback position
    Upcoming {
        /// Position as HH:MM:SS or seconds
        time: String,
        #[command(flatten)]
        segments: SegmentArgs,
        /// Look-ahead window in seconds
        #[arg(long)]
        window: Option<f64>,
    },
    /// Identify the streaming platform for a URL
    Detect {
        /// Page URL
        url: String,
    },
    /// Validate and store timestamp files
    Import {
        /// Timestamp files (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write a stored timestamp file
    Export {
        /// IMDb id of the title
        imdb_id: String,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored titles
    List,
    /// Delete a stored title
    Delete {
        /// IMDb id of the title
        imdb_id: String,
    },
    /// Play segments through the filter with a simulated player
    Simulate(SimulateArgs),
    /// Show or change filter settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(ClapArgs, Debug)]
struct SimulateArgs {
    #[command(flatten)]
    segments: SegmentArgs,

    /// Filter mode (defaults to the stored setting)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<FilterMode>,

    /// Start position
    #[arg(long, default_value = "0")]
    from: String,

    /// End position (defaults to 10s past the last segment)
    #[arg(long)]
    to: Option<String>,

    /// Step size in seconds
    #[arg(long, default_value_t = 0.5)]
    step: f64,

    /// Play in real time through the monitor loop
    #[arg(long)]
    realtime: bool,

    /// Playback speed for --realtime
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print current settings
    Show,
    /// Change one setting (enabled, filter_mode, enabled_types, min_severity)
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Restore default settings
    Reset,
}

fn parse_mode(s: &str) -> Result<FilterMode, String> {
    FilterMode::parse(s).ok_or_else(|| format!("unknown mode {:?} (skip, mute or blur)", s))
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "reelguard", "reelguard").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
///
/// Command output goes to stdout, so console logging uses stderr and is
/// only enabled with `--debug` or when no log file can be opened.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reelguard={},warn", log_level)));

    let file_appender = logs_dir().and_then(|log_dir| {
        std::fs::create_dir_all(&log_dir).ok()?;
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(5)
            .filename_prefix("reelguard")
            .filename_suffix("log")
            .build(&log_dir)
            .ok()
    });

    match file_appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let console = args
                .debug
                .then(|| fmt::layer().with_writer(std::io::stderr));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!("File logging unavailable, using console only");
            None
        }
    }
}

fn open_database(path: Option<&Path>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    };
    db.context("Failed to open database")
}

/// Opens the database only when the segment origin needs it.
fn database_for(args: &Args, origin: &SegmentOrigin) -> anyhow::Result<Option<Database>> {
    if origin.needs_database() {
        open_database(args.db.as_deref()).map(Some)
    } else {
        Ok(None)
    }
}

fn default_end(segments: &[Segment]) -> f64 {
    segments
        .iter()
        .map(Segment::end_seconds)
        .fold(0.0_f64, f64::max)
        + 10.0
}

async fn run_simulation(
    out: &mut dyn Write,
    args: &Args,
    config: MonitorConfig,
    sim: &SimulateArgs,
) -> anyhow::Result<()> {
    let origin = sim.segments.origin();

    // Stored settings are only consulted when no mode was given
    let db = if origin.needs_database() || sim.mode.is_none() {
        match open_database(args.db.as_deref()) {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!("{:#}, using default settings", e);
                None
            }
        }
    } else {
        None
    };

    let segments = commands::resolve_segments(db.as_ref(), &origin)?;
    let mut settings = match &db {
        Some(db) => db.load_settings()?,
        None => FilterSettings::default(),
    };
    settings.enabled = true;
    if let Some(mode) = sim.mode {
        settings.filter_mode = mode;
    }

    let from = commands::parse_position(&sim.from)?;
    let to = match &sim.to {
        Some(to) => commands::parse_position(to)?,
        None => default_end(&segments),
    };

    writeln!(
        out,
        "Simulating {} segment(s), mode {}, {} -> {}",
        segments.len(),
        settings.filter_mode,
        format_time(from),
        format_time(to)
    )?;

    let player = SharedPlayer::new(SimulatedPlayer::new(1));
    let hooks = ConsoleHooks::new(sim.realtime);
    let controller = FilterController::with_hooks(settings, segments, hooks);
    let mut monitor = VideoMonitor::new(
        SimulatedPage::new(player.clone()),
        "video",
        controller,
        config,
    );

    if sim.realtime {
        if !(sim.speed > 0.0 && sim.speed.is_finite()) {
            anyhow::bail!("speed must be positive");
        }
        player.advance_to(from);
        let monitor = simulate::run_realtime(monitor, player.clone(), to, sim.speed).await;
        tracing::info!(
            "Realtime simulation finished at {} with {} notice(s)",
            format_time(player.current_time()),
            monitor.controller().hooks().transcript.len()
        );
        return Ok(());
    }

    for observed in simulate::run_stepped(&mut monitor, &player, from, to, sim.step)? {
        let detail = match observed.action {
            FilterAction::Skipped { to: target, .. } => format!(" -> {}", format_time(target)),
            _ => String::new(),
        };
        writeln!(
            out,
            "{}  {}{}",
            format_time(observed.at),
            observed.action.name(),
            detail
        )?;
    }
    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<bool> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &args.command {
        Command::Validate { file } => return commands::validate(&mut out, file),
        Command::Stats { segments, json } => {
            let origin = segments.origin();
            let db = database_for(args, &origin)?;
            let file = commands::resolve_file(db.as_ref(), &origin)?;
            commands::stats(&mut out, &file, *json)?;
        }
        Command::Match {
            time,
            segments,
            all,
        } => {
            let time = commands::parse_position(time)?;
            let db = open_database(args.db.as_deref())?;
            let list = commands::resolve_segments(Some(&db), &segments.origin())?;
            let criteria = if *all {
                FilterCriteria::all()
            } else {
                db.load_settings()?.criteria()
            };
            commands::match_at(&mut out, time, &list, &criteria)?;
        }
        Command::Upcoming {
            time,
            segments,
            window,
        } => {
            let time = commands::parse_position(time)?;
            let origin = segments.origin();
            let db = database_for(args, &origin)?;
            let list = commands::resolve_segments(db.as_ref(), &origin)?;
            let window = match window {
                Some(window) => *window,
                None => commands::load_config(args.config.as_deref())?.upcoming_window,
            };
            commands::upcoming(&mut out, time, &list, window)?;
        }
        Command::Detect { url } => {
            return commands::detect(&mut out, &PlatformRegistry::bundled(), url);
        }
        Command::Import { files } => {
            let db = open_database(args.db.as_deref())?;
            commands::import(&mut out, &db, files)?;
        }
        Command::Export { imdb_id, output } => {
            let db = open_database(args.db.as_deref())?;
            commands::export(&mut out, &db, imdb_id, output.as_deref())?;
        }
        Command::List => {
            let db = open_database(args.db.as_deref())?;
            commands::list(&mut out, &db)?;
        }
        Command::Delete { imdb_id } => {
            let db = open_database(args.db.as_deref())?;
            commands::delete(&mut out, &db, imdb_id)?;
        }
        Command::Simulate(sim) => {
            let config = commands::load_config(args.config.as_deref())?;
            run_simulation(&mut out, args, config, sim).await?;
        }
        Command::Settings { action } => {
            let db = open_database(args.db.as_deref())?;
            match action {
                SettingsCommand::Show => commands::show_settings(&mut out, &db.load_settings()?)?,
                SettingsCommand::Set { key, value } => {
                    commands::set_setting(&mut out, &db, key, value)?
                }
                SettingsCommand::Reset => {
                    db.reset_settings()?;
                    commands::show_settings(&mut out, &db.load_settings()?)?;
                }
            }
        }
    }

    Ok(true)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&args);

    tracing::debug!("Args: {:?}", args);

    if run(&args).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

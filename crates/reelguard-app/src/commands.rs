//! Subcommand implementations.
//!
//! Each command writes its human-readable output to the supplied writer so
//! it can be checked in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use reelguard_core::{
    demo_segments, find_active_segment, format_time, get_timestamp_stats, get_upcoming_segments,
    load_segments, parse_time_str, validate_timestamp_file, Fallback, FilterCriteria,
    FilterSettings, MonitorConfig, PlatformRegistry, Segment, TimestampFile,
};
use reelguard_storage::{Database, SettingKey};
use serde_json::Value;
use tracing::{info, warn};

/// Where a command takes its segments from.
#[derive(Debug, Clone, Default)]
pub enum SegmentOrigin {
    /// A timestamp file on disk.
    File(PathBuf),
    /// A title stored in the database.
    Stored(String),
    /// The built-in demo list.
    #[default]
    Demo,
}

impl SegmentOrigin {
    /// Picks the origin from optional `--file` and `--imdb` arguments.
    pub fn from_args(file: Option<PathBuf>, imdb: Option<String>) -> Self {
        match (file, imdb) {
            (Some(path), _) => SegmentOrigin::File(path),
            (None, Some(imdb_id)) => SegmentOrigin::Stored(imdb_id),
            (None, None) => SegmentOrigin::Demo,
        }
    }

    /// Returns true if the database is needed to resolve segments.
    pub fn needs_database(&self) -> bool {
        matches!(self, SegmentOrigin::Stored(_))
    }
}

/// Loads the monitor configuration, using defaults without a file.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let Some(path) = path else {
        return Ok(MonitorConfig::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: MonitorConfig = serde_json::from_str(&json)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config {}", path.display()))?;
    info!("Loaded monitor config from {}", path.display());
    Ok(config)
}

/// Parses a playback position given as `HH:MM:SS`, `MM:SS` or seconds.
pub fn parse_position(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    let looks_numeric = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == ':' || c == '.');
    if trimmed.is_empty() || !looks_numeric {
        bail!("invalid time {:?} (expected HH:MM:SS or seconds)", input);
    }
    Ok(parse_time_str(trimmed))
}

fn read_json(path: &Path) -> Result<Value> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Reads and validates a timestamp file.
pub fn read_timestamp_file(path: &Path) -> Result<TimestampFile> {
    let raw = read_json(path)?;
    let validation = validate_timestamp_file(&raw);
    if !validation.valid {
        bail!(
            "{} failed validation:\n  {}",
            path.display(),
            validation.errors.join("\n  ")
        );
    }
    serde_json::from_value(raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn demo_file() -> TimestampFile {
    TimestampFile::new("Demo", "tt0000000", demo_segments())
}

/// Resolves a whole timestamp file.
pub fn resolve_file(db: Option<&Database>, origin: &SegmentOrigin) -> Result<TimestampFile> {
    match origin {
        SegmentOrigin::File(path) => read_timestamp_file(path),
        SegmentOrigin::Stored(imdb_id) => {
            let db = db.context("Database is required for --imdb")?;
            db.load_timestamps(imdb_id)?
                .with_context(|| format!("No timestamps stored for {}", imdb_id))
        }
        SegmentOrigin::Demo => Ok(demo_file()),
    }
}

/// Resolves segments, applying the demo fallback for stored titles.
pub fn resolve_segments(db: Option<&Database>, origin: &SegmentOrigin) -> Result<Vec<Segment>> {
    match origin {
        SegmentOrigin::Stored(imdb_id) => {
            let db = db.context("Database is required for --imdb")?;
            Ok(load_segments(db, Some(imdb_id), Fallback::Demo))
        }
        _ => Ok(resolve_file(db, origin)?.timestamps),
    }
}

// ==================== Inspection ====================

/// `validate`: prints each error; returns whether the file is valid.
pub fn validate(out: &mut dyn Write, path: &Path) -> Result<bool> {
    let raw = read_json(path)?;
    let result = validate_timestamp_file(&raw);

    if result.valid {
        writeln!(out, "{}: valid", path.display())?;
    } else {
        writeln!(out, "{}: {} error(s)", path.display(), result.errors.len())?;
        for error in &result.errors {
            writeln!(out, "  - {}", error)?;
        }
    }
    Ok(result.valid)
}

/// `stats`: prints statistics as text or JSON.
pub fn stats(out: &mut dyn Write, file: &TimestampFile, json: bool) -> Result<()> {
    let stats = get_timestamp_stats(file);

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
        return Ok(());
    }

    writeln!(out, "{} ({})", file.title, file.imdb_id)?;
    writeln!(out, "  segments:    {}", stats.total)?;
    for (content_type, count) in &stats.by_type {
        writeln!(out, "    {:<12} {}", content_type.name(), count)?;
    }
    writeln!(
        out,
        "  severity:    low {} / medium {} / high {}",
        stats.by_severity.low, stats.by_severity.medium, stats.by_severity.high
    )?;
    writeln!(
        out,
        "  filter time: {} ({:.1}s)",
        stats.total_filter_time_formatted, stats.total_filter_time
    )?;
    writeln!(
        out,
        "  verified:    {} of {}",
        stats.verified,
        stats.verified + stats.unverified
    )?;
    Ok(())
}

/// `match`: reports the segment active at `time`, if any.
pub fn match_at(
    out: &mut dyn Write,
    time: f64,
    segments: &[Segment],
    criteria: &FilterCriteria,
) -> Result<()> {
    match find_active_segment(time, segments, criteria) {
        Some(active) => {
            let segment = active.segment;
            writeln!(
                out,
                "{} {} severity {} [{} - {}], {:.1}s remaining",
                format_time(time),
                segment.content_type,
                segment.severity,
                format_time(active.start_seconds),
                format_time(active.end_seconds),
                active.remaining(time)
            )?;
            if let Some(description) = &segment.description {
                writeln!(out, "  {}", description)?;
            }
        }
        None => writeln!(out, "{} no active segment", format_time(time))?,
    }
    Ok(())
}

/// `upcoming`: lists segments starting within `window` seconds.
pub fn upcoming(out: &mut dyn Write, time: f64, segments: &[Segment], window: f64) -> Result<()> {
    let upcoming = get_upcoming_segments(time, segments, window);
    if upcoming.is_empty() {
        writeln!(out, "Nothing in the next {}s", window)?;
        return Ok(());
    }

    for item in upcoming {
        writeln!(
            out,
            "in {:>6.1}s  {} - {}  {} (severity {})",
            item.start_seconds - time,
            format_time(item.start_seconds),
            format_time(item.end_seconds),
            item.segment.content_type,
            item.segment.severity
        )?;
    }
    Ok(())
}

/// `detect`: names the platform serving a URL.
pub fn detect(out: &mut dyn Write, registry: &PlatformRegistry, url: &str) -> Result<bool> {
    match registry.detect(url) {
        Some(platform) => {
            writeln!(
                out,
                "{} ({}): video {:?}, title {:?}",
                platform.display_name,
                platform.name,
                platform.video_selector,
                platform.title_selector
            )?;
            Ok(true)
        }
        None => {
            writeln!(out, "Unsupported site: {}", url)?;
            Ok(false)
        }
    }
}

// ==================== Store ====================

/// `import`: validates and stores each file. Stops at the first failure.
pub fn import(out: &mut dyn Write, db: &Database, paths: &[PathBuf]) -> Result<usize> {
    for path in paths {
        let file = read_timestamp_file(path)?;
        db.save_timestamps(&file)?;
        writeln!(
            out,
            "Imported {} ({}): {} segments",
            file.title,
            file.imdb_id,
            file.timestamps.len()
        )?;
    }
    Ok(paths.len())
}

/// `export`: writes a stored file to `output`, or to `out` without one.
pub fn export(
    out: &mut dyn Write,
    db: &Database,
    imdb_id: &str,
    output: Option<&Path>,
) -> Result<()> {
    let file = db
        .load_timestamps(imdb_id)?
        .with_context(|| format!("No timestamps stored for {}", imdb_id))?;
    let json = file.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(out, "Exported {} to {}", imdb_id, path.display())?;
        }
        None => writeln!(out, "{}", json)?,
    }
    Ok(())
}

/// `list`: prints stored titles.
pub fn list(out: &mut dyn Write, db: &Database) -> Result<()> {
    let titles = db.list_titles()?;
    if titles.is_empty() {
        writeln!(out, "No stored titles")?;
        return Ok(());
    }

    for title in titles {
        writeln!(
            out,
            "{:<12} {:>4} segments  {}  (updated {})",
            title.imdb_id,
            title.segment_count,
            title.title,
            title.updated_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    writeln!(out, "{} stored", db.title_count()?)?;
    Ok(())
}

/// `delete`: removes a stored title.
pub fn delete(out: &mut dyn Write, db: &Database, imdb_id: &str) -> Result<()> {
    if db.delete_timestamps(imdb_id)? {
        writeln!(out, "Deleted {}", imdb_id)?;
    } else {
        warn!("Nothing stored for {}", imdb_id);
        writeln!(out, "Nothing stored for {}", imdb_id)?;
    }
    Ok(())
}

// ==================== Settings ====================

/// `settings show`.
pub fn show_settings(out: &mut dyn Write, settings: &FilterSettings) -> Result<()> {
    let mut types: Vec<_> = settings.enabled_types.iter().collect();
    types.sort();
    let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();

    writeln!(out, "enabled       {}", settings.enabled)?;
    writeln!(out, "filter_mode   {}", settings.filter_mode)?;
    writeln!(out, "enabled_types {}", types.join(","))?;
    writeln!(out, "min_severity  {}", settings.min_severity)?;
    Ok(())
}

/// `settings set`.
pub fn set_setting(out: &mut dyn Write, db: &Database, key: &str, value: &str) -> Result<()> {
    let Some(setting) = SettingKey::parse(key) else {
        let known: Vec<&str> = SettingKey::all().iter().map(|k| k.as_str()).collect();
        bail!("unknown setting {:?} (expected one of: {})", key, known.join(", "));
    };

    let change = db.set_setting(setting, value)?;
    writeln!(out, "{}", serde_json::to_string(&change)?)?;
    Ok(())
}

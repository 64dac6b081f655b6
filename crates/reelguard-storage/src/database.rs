//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use reelguard_core::{
    validate_file, FilterSettings, SegmentSource, SettingsChange, SourceError, TimestampFile,
};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::models::{SettingKey, StoredTitle};
use crate::pool::ConnectionPool;
use crate::repository::{SettingsRepo, TimestampsRepo};

/// High-level database interface for ReelGuard.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open the database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Open the database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::open(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "reelguard", "reelguard")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("reelguard.db"))
    }

    // === Timestamps ===

    /// Validate and store a timestamp file, replacing any existing one.
    pub fn save_timestamps(&self, file: &TimestampFile) -> Result<()> {
        let validation = validate_file(file);
        if !validation.valid {
            return Err(StorageError::Invalid(validation.errors));
        }

        let conn = self.pool.get()?;
        TimestampsRepo::upsert(&conn, file)?;
        debug!(
            "Saved {} timestamps for {}",
            file.timestamps.len(),
            file.imdb_id
        );
        Ok(())
    }

    /// Load the timestamp file for an IMDb id.
    pub fn load_timestamps(&self, imdb_id: &str) -> Result<Option<TimestampFile>> {
        let conn = self.pool.get()?;
        TimestampsRepo::get(&conn, imdb_id)
    }

    /// Delete the timestamp file for an IMDb id.
    pub fn delete_timestamps(&self, imdb_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        TimestampsRepo::delete(&conn, imdb_id)
    }

    /// List all stored titles.
    pub fn list_titles(&self) -> Result<Vec<StoredTitle>> {
        let conn = self.pool.get()?;
        TimestampsRepo::list(&conn)
    }

    /// Number of stored titles.
    pub fn title_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        TimestampsRepo::count(&conn)
    }

    // === Settings ===

    /// Load filter settings, falling back to defaults.
    pub fn load_settings(&self) -> Result<FilterSettings> {
        let conn = self.pool.get()?;
        SettingsRepo::load(&conn)
    }

    /// Persist a settings change and return it for delivery to listeners.
    ///
    /// Empty changes are not written.
    pub fn save_settings(&self, change: SettingsChange) -> Result<SettingsChange> {
        if !change.is_empty() {
            let conn = self.pool.get()?;
            SettingsRepo::save(&conn, &change)?;
        }
        Ok(change)
    }

    /// Parse and persist a single setting from user input.
    pub fn set_setting(&self, key: SettingKey, raw: &str) -> Result<SettingsChange> {
        let change = key.parse_value(raw)?;
        info!("Setting {} = {}", key, raw.trim());
        self.save_settings(change)
    }

    /// Remove stored settings so defaults apply.
    pub fn reset_settings(&self) -> Result<()> {
        let conn = self.pool.get()?;
        SettingsRepo::reset(&conn)?;
        Ok(())
    }
}

impl SegmentSource for Database {
    fn load(&self, imdb_id: &str) -> reelguard_core::source::Result<TimestampFile> {
        match self.load_timestamps(imdb_id) {
            Ok(Some(file)) => Ok(file),
            Ok(None) => Err(SourceError::NotFound(imdb_id.to_string())),
            Err(e) => Err(SourceError::Unavailable(e.to_string())),
        }
    }
}

//! Viewer settings repository.
//!
//! Settings are rows in the `config` table, one per [`SettingKey`], with
//! JSON values. Missing or unreadable rows fall back to the defaults.

use reelguard_core::{FilterSettings, SettingsChange};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::models::SettingKey;

/// Repository for persisted filter settings.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Load settings, using defaults for anything not stored.
    pub fn load(conn: &Connection) -> Result<FilterSettings> {
        let mut settings = FilterSettings::default();

        let mut stmt = conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for (key, value) in rows {
            let Some(key) = SettingKey::parse(&key) else {
                continue;
            };

            match key {
                SettingKey::Enabled => {
                    if let Some(v) = decode(key, &value) {
                        settings.enabled = v;
                    }
                }
                SettingKey::FilterMode => {
                    if let Some(v) = decode(key, &value) {
                        settings.filter_mode = v;
                    }
                }
                SettingKey::EnabledTypes => {
                    if let Some(v) = decode(key, &value) {
                        settings.enabled_types = v;
                    }
                }
                SettingKey::MinSeverity => {
                    if let Some(v) = decode(key, &value) {
                        settings.min_severity = v;
                    }
                }
            }
        }

        Ok(settings)
    }

    /// Persist every settings field present in `change`.
    ///
    /// Segment replacements in the change are not persisted here.
    pub fn save(conn: &Connection, change: &SettingsChange) -> Result<()> {
        let mut entries: Vec<(SettingKey, Value)> = Vec::new();

        if let Some(enabled) = change.enabled {
            entries.push((SettingKey::Enabled, serde_json::to_value(enabled)?));
        }
        if let Some(mode) = change.filter_mode {
            entries.push((SettingKey::FilterMode, serde_json::to_value(mode)?));
        }
        if let Some(types) = &change.enabled_types {
            let mut types: Vec<_> = types.iter().copied().collect();
            types.sort();
            entries.push((SettingKey::EnabledTypes, serde_json::to_value(types)?));
        }
        if let Some(min_severity) = change.min_severity {
            entries.push((SettingKey::MinSeverity, serde_json::to_value(min_severity)?));
        }

        let tx = conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                params![key.as_str(), value.to_string()],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    /// Remove all stored settings. Returns the number of rows removed.
    pub fn reset(conn: &Connection) -> Result<usize> {
        let mut removed = 0;
        for key in SettingKey::all() {
            removed += conn.execute("DELETE FROM config WHERE key = ?1", [key.as_str()])?;
        }
        Ok(removed)
    }
}

fn decode<T: DeserializeOwned>(key: SettingKey, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring stored {} ({}): {}", key, raw, e);
            None
        }
    }
}

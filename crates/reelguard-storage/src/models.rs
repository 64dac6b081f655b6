//! Data models for database entities.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use reelguard_core::{ContentType, FilterMode, SettingsChange};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Summary of a stored timestamp file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTitle {
    /// IMDb id (`tt` followed by digits).
    pub imdb_id: String,
    /// Title name.
    pub title: String,
    /// Number of segments in the file.
    pub segment_count: i64,
    /// Last time the file was written.
    pub updated_at: DateTime<Utc>,
}

/// Persisted viewer setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Master switch.
    Enabled,
    /// Skip, mute or blur.
    FilterMode,
    /// Filtered content types.
    EnabledTypes,
    /// Minimum filtered severity.
    MinSeverity,
}

impl SettingKey {
    /// Returns all setting keys.
    pub fn all() -> &'static [SettingKey] {
        &[
            SettingKey::Enabled,
            SettingKey::FilterMode,
            SettingKey::EnabledTypes,
            SettingKey::MinSeverity,
        ]
    }

    /// Key as stored in the `config` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Enabled => "enabled",
            SettingKey::FilterMode => "filter_mode",
            SettingKey::EnabledTypes => "enabled_types",
            SettingKey::MinSeverity => "min_severity",
        }
    }

    /// Parses a key name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "enabled" => Some(SettingKey::Enabled),
            "filter_mode" | "mode" => Some(SettingKey::FilterMode),
            "enabled_types" | "types" => Some(SettingKey::EnabledTypes),
            "min_severity" | "severity" => Some(SettingKey::MinSeverity),
            _ => None,
        }
    }

    /// Parses a user-supplied value for this key into a settings change.
    ///
    /// `enabled_types` takes a comma separated list; an empty string clears it.
    pub fn parse_value(&self, raw: &str) -> Result<SettingsChange> {
        let raw = raw.trim();
        let mut change = SettingsChange::default();

        match self {
            SettingKey::Enabled => {
                let enabled = match raw.to_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid_value(*self, raw, "expected true or false")),
                };
                change.enabled = Some(enabled);
            }
            SettingKey::FilterMode => {
                let mode = FilterMode::parse(raw)
                    .ok_or_else(|| invalid_value(*self, raw, "expected skip, mute or blur"))?;
                change.filter_mode = Some(mode);
            }
            SettingKey::EnabledTypes => {
                let types = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        ContentType::parse(&s.to_lowercase())
                            .ok_or_else(|| invalid_value(*self, s, "unknown content type"))
                    })
                    .collect::<Result<HashSet<_>>>()?;
                change.enabled_types = Some(types);
            }
            SettingKey::MinSeverity => {
                let severity = raw
                    .parse::<u8>()
                    .ok()
                    .filter(|s| (1..=10).contains(s))
                    .ok_or_else(|| invalid_value(*self, raw, "expected an integer 1-10"))?;
                change.min_severity = Some(severity);
            }
        }

        Ok(change)
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid_value(key: SettingKey, raw: &str, reason: &str) -> StorageError {
    StorageError::Config(format!("invalid value {:?} for {}: {}", raw, key, reason))
}

//! Viewer filter settings and change notifications.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::content::{ContentType, FilterCriteria, FilterMode, Segment};

/// Persisted viewer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Master switch.
    pub enabled: bool,
    /// Action applied inside active segments.
    pub filter_mode: FilterMode,
    /// Content types that are filtered.
    pub enabled_types: HashSet<ContentType>,
    /// Minimum severity that is filtered.
    pub min_severity: u8,
}

impl Default for FilterSettings {
    fn default() -> Self {
        let criteria = FilterCriteria::default();
        Self {
            enabled: true,
            filter_mode: FilterMode::Skip,
            enabled_types: criteria.enabled_types,
            min_severity: criteria.min_severity,
        }
    }
}

impl FilterSettings {
    /// Returns the matcher criteria for these settings.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            enabled_types: self.enabled_types.clone(),
            min_severity: self.min_severity,
        }
    }

    /// Applies the settings fields of a change, ignoring `timestamps`.
    pub fn apply(&mut self, change: &SettingsChange) {
        if let Some(enabled) = change.enabled {
            self.enabled = enabled;
        }
        if let Some(mode) = change.filter_mode {
            self.filter_mode = mode;
        }
        if let Some(types) = &change.enabled_types {
            self.enabled_types = types.clone();
        }
        if let Some(min_severity) = change.min_severity {
            self.min_severity = min_severity;
        }
    }
}

/// Partial update delivered by the settings store.
///
/// Only the fields that changed are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsChange {
    /// New master switch value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// New filter mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_mode: Option<FilterMode>,
    /// New set of filtered content types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_types: Option<HashSet<ContentType>>,
    /// New severity threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<u8>,
    /// Replacement segment list for the current title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<Segment>>,
}

impl SettingsChange {
    /// Change that only toggles the master switch.
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    /// Change that only switches the filter mode.
    pub fn filter_mode(mode: FilterMode) -> Self {
        Self {
            filter_mode: Some(mode),
            ..Default::default()
        }
    }

    /// Change that replaces the segment list.
    pub fn timestamps(timestamps: Vec<Segment>) -> Self {
        Self {
            timestamps: Some(timestamps),
            ..Default::default()
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.filter_mode.is_none()
            && self.enabled_types.is_none()
            && self.min_severity.is_none()
            && self.timestamps.is_none()
    }
}

//! Summary statistics for timestamp files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::{ContentType, TimestampFile};
use crate::time_codec::format_time;

/// Segment counts grouped by severity band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    /// Severity 1-3.
    pub low: usize,
    /// Severity 4-6.
    pub medium: usize,
    /// Severity 7 and above.
    pub high: usize,
}

impl SeverityBreakdown {
    fn record(&mut self, severity: u8) {
        match severity {
            0..=3 => self.low += 1,
            4..=6 => self.medium += 1,
            _ => self.high += 1,
        }
    }
}

/// Statistics for one timestamp file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampStats {
    /// Number of segments.
    pub total: usize,
    /// Segment count per content type.
    pub by_type: BTreeMap<ContentType, usize>,
    /// Segment count per severity band.
    pub by_severity: SeverityBreakdown,
    /// Sum of segment durations in seconds, ignoring any filter criteria.
    pub total_filter_time: f64,
    /// `total_filter_time` as `HH:MM:SS`.
    pub total_filter_time_formatted: String,
    /// Segments marked verified.
    pub verified: usize,
    /// Segments not marked verified.
    pub unverified: usize,
}

/// Computes statistics over every segment of a file.
pub fn get_timestamp_stats(file: &TimestampFile) -> TimestampStats {
    let mut by_type = BTreeMap::new();
    let mut by_severity = SeverityBreakdown::default();
    let mut total_filter_time = 0.0;
    let mut verified = 0;

    for segment in &file.timestamps {
        *by_type.entry(segment.content_type).or_insert(0) += 1;
        by_severity.record(segment.severity);
        total_filter_time += segment.duration_seconds();
        if segment.is_verified() {
            verified += 1;
        }
    }

    let total = file.timestamps.len();

    TimestampStats {
        total,
        by_type,
        by_severity,
        total_filter_time,
        total_filter_time_formatted: format_time(total_filter_time),
        verified,
        unverified: total - verified,
    }
}

//! Segment matching against the current playback position.
//!
//! ## Matching Rules
//!
//! 1. Segments are scanned in list order
//! 2. Segments whose type is disabled or whose severity is below the
//!    threshold are skipped
//! 3. A segment matches when `start <= time < end`
//!
//! Overlapping segments are not merged: the first qualifying segment in list
//! order wins.

use crate::content::{FilterCriteria, Segment};

/// Default look-ahead window for [`get_upcoming_segments`], in seconds.
pub const DEFAULT_UPCOMING_WINDOW: f64 = 60.0;

/// A segment that contains the current playback position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveMatch<'a> {
    /// Position of the segment in the list.
    pub index: usize,
    /// The matching segment.
    pub segment: &'a Segment,
    /// Normalized start in seconds.
    pub start_seconds: f64,
    /// Normalized end in seconds.
    pub end_seconds: f64,
}

impl ActiveMatch<'_> {
    /// Seconds left in the segment at `current_time`.
    pub fn remaining(&self, current_time: f64) -> f64 {
        (self.end_seconds - current_time).max(0.0)
    }
}

/// A segment starting within the look-ahead window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpcomingSegment<'a> {
    /// The upcoming segment.
    pub segment: &'a Segment,
    /// Normalized start in seconds.
    pub start_seconds: f64,
    /// Normalized end in seconds.
    pub end_seconds: f64,
}

/// Finds the first segment that is active at `current_time`.
pub fn find_active_segment<'a>(
    current_time: f64,
    segments: &'a [Segment],
    criteria: &FilterCriteria,
) -> Option<ActiveMatch<'a>> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| criteria.allows(segment))
        .find_map(|(index, segment)| {
            let start_seconds = segment.start_seconds();
            let end_seconds = segment.end_seconds();

            (current_time >= start_seconds && current_time < end_seconds).then_some(ActiveMatch {
                index,
                segment,
                start_seconds,
                end_seconds,
            })
        })
}

/// Returns segments starting after `current_time` and no later than
/// `current_time + window_seconds`, ordered by start.
///
/// Filter criteria are not applied here.
pub fn get_upcoming_segments(
    current_time: f64,
    segments: &[Segment],
    window_seconds: f64,
) -> Vec<UpcomingSegment<'_>> {
    let horizon = current_time + window_seconds;

    let mut upcoming: Vec<UpcomingSegment<'_>> = segments
        .iter()
        .map(|segment| UpcomingSegment {
            segment,
            start_seconds: segment.start_seconds(),
            end_seconds: segment.end_seconds(),
        })
        .filter(|u| u.start_seconds > current_time && u.start_seconds <= horizon)
        .collect();

    upcoming.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    upcoming
}

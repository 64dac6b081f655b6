//! Playback time parsing and formatting.
//!
//! Segment boundaries are written either as `HH:MM:SS` strings or as plain
//! seconds. Two parsers are provided:
//!
//! - [`parse_time`] / [`parse_time_str`]: lenient. Accepts `HH:MM:SS`, `MM:SS`,
//!   bare numbers, and degrades anything unparseable to `0.0`. This is what
//!   the matcher and the controller use on the hot path.
//! - [`parse_time_strict`]: only accepts the canonical `HH:MM:SS` form and
//!   reports an error otherwise. Used by validation paths.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::content::TimeValue;

/// Canonical timestamp format used in timestamp files.
static CANONICAL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}$").expect("Invalid regex pattern"));

/// Longest numeric prefix of a bare-number timestamp ("12abc" reads as 12).
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("Invalid regex pattern")
});

/// Errors from strict timestamp parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The input is not in `HH:MM:SS` form.
    #[error("invalid time format '{0}' (expected HH:MM:SS)")]
    InvalidFormat(String),
}

/// Returns true if `input` is a canonical `HH:MM:SS` timestamp.
pub fn is_canonical(input: &str) -> bool {
    CANONICAL_TIME.is_match(input)
}

/// Converts a time value to seconds.
///
/// Numbers pass through unchanged; strings go through [`parse_time_str`].
pub fn parse_time(value: &TimeValue) -> f64 {
    match value {
        TimeValue::Seconds(seconds) => *seconds,
        TimeValue::Text(text) => parse_time_str(text),
    }
}

/// Leniently converts a timestamp string to seconds.
///
/// Three `:`-separated parts are read as hours/minutes/seconds, two parts as
/// minutes/seconds, anything else as a plain number read from its leading
/// numeric prefix. Malformed input yields `0.0`; this function never fails.
pub fn parse_time_str(input: &str) -> f64 {
    let parts: Vec<&str> = input.split(':').collect();

    let seconds = match parts.as_slice() {
        [h, m, s] => combine(&[(*h, 3600.0), (*m, 60.0), (*s, 1.0)]),
        [m, s] => combine(&[(*m, 60.0), (*s, 1.0)]),
        _ => leading_number(input),
    };

    seconds.filter(|s| s.is_finite()).unwrap_or(0.0)
}

/// Strictly parses a canonical `HH:MM:SS` timestamp.
pub fn parse_time_strict(input: &str) -> Result<f64, TimeError> {
    if !is_canonical(input) {
        return Err(TimeError::InvalidFormat(input.to_string()));
    }
    Ok(parse_time_str(input))
}

/// Formats seconds as zero-padded `HH:MM:SS`, dropping sub-second precision.
///
/// Negative and non-finite inputs render as `00:00:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00:00".to_string();
    }

    let total = seconds.floor() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

fn leading_number(input: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(input.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn combine(parts: &[(&str, f64)]) -> Option<f64> {
    parts
        .iter()
        .try_fold(0.0, |acc, &(part, scale)| component(part).map(|v| acc + v * scale))
}

// An empty component counts as zero ("1:" is one minute).
fn component(part: &str) -> Option<f64> {
    let trimmed = part.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Lenient Parse Tests ====================

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(parse_time_str("00:00:30"), 30.0);
        assert_eq!(parse_time_str("01:02:03"), 3723.0);
        assert_eq!(parse_time_str("99:59:59"), 359_999.0);
    }

    #[test]
    fn parses_minutes_seconds() {
        assert_eq!(parse_time_str("02:10"), 130.0);
        assert_eq!(parse_time_str("0:05"), 5.0);
    }

    #[test]
    fn parses_bare_numbers() {
        assert_eq!(parse_time_str("42"), 42.0);
        assert_eq!(parse_time_str("12.5"), 12.5);
        assert_eq!(parse_time_str(" 7 "), 7.0);
    }

    #[test]
    fn bare_numbers_use_leading_prefix() {
        assert_eq!(parse_time_str("12abc"), 12.0);
        assert_eq!(parse_time_str("90s"), 90.0);
        assert_eq!(parse_time_str(".5x"), 0.5);
        assert_eq!(parse_time_str("1:2:3:4"), 1.0);
        assert_eq!(parse_time_str("x12"), 0.0);
    }

    #[test]
    fn fractional_seconds_component() {
        assert_eq!(parse_time_str("00:01:02.5"), 62.5);
    }

    #[test]
    fn malformed_input_degrades_to_zero() {
        assert_eq!(parse_time_str(""), 0.0);
        assert_eq!(parse_time_str("abc"), 0.0);
        assert_eq!(parse_time_str("aa:bb:cc"), 0.0);
        assert_eq!(parse_time_str("-"), 0.0);
        assert_eq!(parse_time_str("inf"), 0.0);
        assert_eq!(parse_time_str("NaN"), 0.0);
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_time(&TimeValue::Seconds(12.75)), 12.75);
        assert_eq!(parse_time(&TimeValue::Text("00:00:12".into())), 12.0);
    }

    // ==================== Strict Parse Tests ====================

    #[test]
    fn strict_accepts_canonical() {
        assert_eq!(parse_time_strict("00:02:00"), Ok(120.0));
    }

    #[test]
    fn strict_rejects_other_forms() {
        for input in ["2:00", "00:2:00", "120", "", "00:00:00.5", "aa:bb:cc"] {
            assert_eq!(
                parse_time_strict(input),
                Err(TimeError::InvalidFormat(input.to_string())),
                "{input} should be rejected"
            );
        }
    }

    // ==================== Format Tests ====================

    #[test]
    fn formats_zero_padded() {
        assert_eq!(format_time(0.0), "00:00:00");
        assert_eq!(format_time(5.0), "00:00:05");
        assert_eq!(format_time(3723.0), "01:02:03");
        assert_eq!(format_time(359_999.0), "99:59:59");
    }

    #[test]
    fn format_truncates_sub_second() {
        assert_eq!(format_time(35.999), "00:00:35");
        assert_eq!(format_time(0.4), "00:00:00");
    }

    #[test]
    fn format_clamps_invalid_input() {
        assert_eq!(format_time(-3.0), "00:00:00");
        assert_eq!(format_time(f64::NAN), "00:00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00:00");
    }

    #[test]
    fn parse_of_format_is_floor() {
        let samples = [0.0, 0.5, 29.999, 30.0, 59.9, 61.25, 3599.5, 86_400.7, 359_999.0];
        for s in samples {
            assert_eq!(parse_time_str(&format_time(s)), s.floor(), "sample {s}");
        }

        let mut s = 0.0;
        while s <= 359_999.0 {
            assert_eq!(parse_time_str(&format_time(s)), s.floor());
            s += 977.3;
        }
    }
}

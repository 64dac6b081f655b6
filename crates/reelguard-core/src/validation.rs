//! Timestamp file validation.
//!
//! Validation works on raw JSON so that files which would not even
//! deserialize (missing fields, unknown types, out-of-range severities) still
//! produce a readable list of problems. Nothing here returns an error: the
//! caller decides whether an invalid file is rejected or only warned about.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{ContentType, TimeValue, TimestampFile};
use crate::time_codec::{parse_time, parse_time_strict};

static IMDB_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tt[0-9]+$").expect("Invalid regex pattern"));

/// Outcome of validating a segment or a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no errors were found.
    pub valid: bool,
    /// Problems in the order they were detected.
    pub errors: Vec<String>,
}

impl ValidationResult {
    /// Builds a result from collected errors.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Returns true if `id` looks like an IMDb title id.
pub fn is_valid_imdb_id(id: &str) -> bool {
    IMDB_ID.is_match(id)
}

/// Validates a single segment object.
pub fn validate_timestamp(timestamp: &Value) -> ValidationResult {
    let mut errors = Vec::new();

    let start = present(timestamp, "start");
    let end = present(timestamp, "end");
    let content_type = present(timestamp, "type");
    let severity = timestamp.get("severity");

    if start.is_none() {
        errors.push("Missing start time".to_string());
    }
    if end.is_none() {
        errors.push("Missing end time".to_string());
    }
    if content_type.is_none() {
        errors.push("Missing type".to_string());
    }
    if severity.is_none() {
        errors.push("Missing severity".to_string());
    }

    if start.is_some_and(|v| !is_strict_time(v)) {
        errors.push("Invalid start time format (expected HH:MM:SS)".to_string());
    }
    if end.is_some_and(|v| !is_strict_time(v)) {
        errors.push("Invalid end time format (expected HH:MM:SS)".to_string());
    }

    if let Some(value) = content_type {
        let known = value.as_str().and_then(ContentType::parse).is_some();
        if !known {
            errors.push(format!(
                "Invalid type: {}. Must be one of: {}",
                display(value),
                type_names()
            ));
        }
    }

    if let Some(value) = severity {
        if !is_valid_severity(value) {
            errors.push("Severity must be integer between 1-10".to_string());
        }
    }

    if let (Some(start), Some(end)) = (start.and_then(time_value), end.and_then(time_value)) {
        if parse_time(&end) <= parse_time(&start) {
            errors.push("End time must be after start time".to_string());
        }
    }

    ValidationResult::from_errors(errors)
}

/// Validates a whole timestamp file.
///
/// Per-segment problems are reported as `Timestamp {index}: {errors}`.
pub fn validate_timestamp_file(data: &Value) -> ValidationResult {
    let mut errors = Vec::new();

    let title = present(data, "title");
    let imdb_id = present(data, "imdb_id");
    let timestamps = data.get("timestamps").and_then(Value::as_array);

    if title.is_none() {
        errors.push("Missing title".to_string());
    }
    if imdb_id.is_none() {
        errors.push("Missing imdb_id".to_string());
    }
    if timestamps.is_none() {
        errors.push("Missing or invalid timestamps array".to_string());
    }

    if let Some(id) = imdb_id {
        if !id.as_str().is_some_and(is_valid_imdb_id) {
            errors.push("Invalid imdb_id format (expected tt followed by numbers)".to_string());
        }
    }

    for (index, timestamp) in timestamps.into_iter().flatten().enumerate() {
        let result = validate_timestamp(timestamp);
        if !result.valid {
            errors.push(format!("Timestamp {}: {}", index, result.errors.join(", ")));
        }
    }

    ValidationResult::from_errors(errors)
}

/// Validates an already-parsed timestamp file.
pub fn validate_file(file: &TimestampFile) -> ValidationResult {
    match serde_json::to_value(file) {
        Ok(value) => validate_timestamp_file(&value),
        Err(e) => ValidationResult::from_errors(vec![format!("Unserializable file: {}", e)]),
    }
}

// Absent, null and empty-string fields all count as missing.
fn present<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn is_strict_time(value: &Value) -> bool {
    value.as_str().is_some_and(|s| parse_time_strict(s).is_ok())
}

fn time_value(value: &Value) -> Option<TimeValue> {
    match value {
        Value::String(s) => Some(TimeValue::Text(s.clone())),
        Value::Number(n) => n.as_f64().map(TimeValue::Seconds),
        _ => None,
    }
}

fn is_valid_severity(value: &Value) -> bool {
    value
        .as_f64()
        .is_some_and(|s| s.fract() == 0.0 && (1.0..=10.0).contains(&s))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_names() -> String {
    ContentType::all()
        .iter()
        .map(ContentType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Batch file names: `{timestamp}-{uuid4}.parquet`.
//!
//! The timestamp is compact ISO 8601 in UTC with a fixed width, so names (and the timestamps
//! taken from them) sort in write order.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{PackageError, PackageResult};

/// `strftime` layout of the timestamp part, e.g. `2025-03-26T100346Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%SZ";

pub const BATCH_EXTENSION: &str = "parquet";

/// Full pattern of a batch file name. Group 1 is the timestamp.
pub const BATCH_NAME_PATTERN: &str = r"^(\d{4}-\d{2}-\d{2}T\d{6}Z)-([0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12})\.parquet$";

static BATCH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(BATCH_NAME_PATTERN).expect("valid batch name regex"));

/// A fresh, unique batch file name for a batch written at `now`.
pub fn new_batch_name(now: DateTime<Utc>) -> String {
    format!(
        "{}-{}.{BATCH_EXTENSION}",
        now.format(TIMESTAMP_FORMAT),
        Uuid::new_v4()
    )
}

/// The time to stamp a new batch with: `now`, unless that would not sort strictly after
/// `newest` (the latest existing batch timestamp), in which case one second past `newest`.
///
/// Timestamps have one-second resolution, so back-to-back writes would otherwise tie and their
/// order would fall to the random UUID.
pub fn next_batch_time(now: DateTime<Utc>, newest: Option<&str>) -> DateTime<Utc> {
    let Some(newest) = newest else {
        return now;
    };
    let Ok(newest) = NaiveDateTime::parse_from_str(newest, TIMESTAMP_FORMAT) else {
        return now;
    };
    let newest = newest.and_utc();
    if now.format(TIMESTAMP_FORMAT).to_string() > newest.format(TIMESTAMP_FORMAT).to_string() {
        now
    } else {
        newest + TimeDelta::seconds(1)
    }
}

/// Check `path`'s extension and file name and return the timestamp part of the name.
pub fn batch_timestamp(path: &Path) -> PackageResult<String> {
    let invalid = |message: String| PackageError::BatchFile {
        path: path.to_path_buf(),
        message,
    };

    if path.extension().and_then(|e| e.to_str()) != Some(BATCH_EXTENSION) {
        return Err(invalid(format!("expected a '.{BATCH_EXTENSION}' file")));
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| invalid("file name is not valid UTF-8".to_string()))?;

    let timestamp = BATCH_NAME_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| invalid(format!("file name does not match '{BATCH_NAME_PATTERN}'")))?;

    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .map_err(|e| invalid(format!("timestamp '{timestamp}' is not a valid date-time: {e}")))?;

    Ok(timestamp.to_string())
}

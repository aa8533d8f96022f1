//! Per-type textual format checks.
//!
//! Each check returns `Ok(())` or the reason the value was rejected; nothing here panics or
//! short-circuits a column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::inference::{InferredType, parse_as};
use crate::properties::FieldType;

/// Tokens accepted for `boolean` fields.
pub const BOOLEAN_TOKENS: [&str; 8] = ["true", "True", "TRUE", "1", "false", "False", "FALSE", "0"];

const MAX_EMAIL_LEN: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid email regex")
});
static BASE64_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$")
        .expect("valid base64 regex")
});
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("valid datetime regex")
});
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(?:\.\d+)?$").expect("valid time regex"));
static YEARMONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid yearmonth regex"));
static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:\d+Y)?(?:\d+M)?(?:\d+W)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$")
        .expect("valid duration regex")
});

/// Whether a `datetime` column carries a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneMode {
    Aware,
    Naive,
}

/// Checks the cells of one column in row order.
///
/// Stateful only for `datetime` with the default format: the first well-shaped value fixes
/// whether the column is timezone-aware, and later values must agree.
#[derive(Debug, Clone)]
pub struct FormatChecker {
    field_type: Option<FieldType>,
    format: Option<String>,
    timezone: Option<TimezoneMode>,
}

impl FormatChecker {
    pub fn new(field_type: Option<FieldType>, format: Option<&str>) -> Self {
        Self {
            field_type,
            format: format.map(str::to_string),
            timezone: None,
        }
    }

    /// Check one non-null cell.
    pub fn check(&mut self, value: &str) -> Result<(), String> {
        let Some(field_type) = self.field_type else {
            return Ok(());
        };
        let format = self.format.as_deref().filter(|f| *f != "default");

        match field_type {
            FieldType::String => check_string_format(format, value),
            FieldType::Any => Ok(()),
            FieldType::Boolean => check_boolean(value),
            FieldType::Integer | FieldType::Year => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| "not an integer".to_string()),
            FieldType::Number => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| "not a number".to_string()),
            FieldType::Yearmonth => check_yearmonth(value),
            FieldType::Datetime => match format {
                Some("any") => check_any(InferredType::Datetime, value),
                Some(pattern) => check_pattern(pattern, value, |v, p| {
                    NaiveDateTime::parse_from_str(v, p).is_ok()
                        || DateTime::parse_from_str(v, p).is_ok()
                }),
                None => self.check_iso_datetime(value),
            },
            FieldType::Date => match format {
                Some("any") => check_any(InferredType::Date, value),
                Some(pattern) => {
                    check_pattern(pattern, value, |v, p| NaiveDate::parse_from_str(v, p).is_ok())
                }
                None => check_iso_date(value),
            },
            FieldType::Time => match format {
                Some("any") => check_any(InferredType::Time, value),
                Some(pattern) => {
                    check_pattern(pattern, value, |v, p| NaiveTime::parse_from_str(v, p).is_ok())
                }
                None => check_iso_time(value),
            },
            FieldType::Duration => check_duration(value),
            FieldType::Geopoint => check_geopoint(value),
            FieldType::Object => check_json(value, JsonKind::Object),
            FieldType::Array => check_json(value, JsonKind::Array),
            FieldType::Geojson => check_json(value, JsonKind::Geojson),
        }
    }

    fn check_iso_datetime(&mut self, value: &str) -> Result<(), String> {
        let caps = DATETIME_RE
            .captures(value)
            .ok_or_else(|| "not an ISO 8601 date-time (YYYY-MM-DDTHH:MM:SS)".to_string())?;
        let mode = if caps.get(1).is_some() {
            TimezoneMode::Aware
        } else {
            TimezoneMode::Naive
        };

        let parsed = match mode {
            TimezoneMode::Aware => DateTime::parse_from_rfc3339(value).is_ok(),
            TimezoneMode::Naive => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
        };
        if !parsed {
            return Err("not a valid date-time".to_string());
        }

        match self.timezone {
            None => {
                self.timezone = Some(mode);
                Ok(())
            }
            Some(expected) if expected == mode => Ok(()),
            Some(TimezoneMode::Aware) => Err("has no timezone but earlier values do".to_string()),
            Some(TimezoneMode::Naive) => Err("has a timezone but earlier values do not".to_string()),
        }
    }
}

fn check_string_format(format: Option<&str>, value: &str) -> Result<(), String> {
    match format {
        Some("email") if !is_email(value) => Err("not an email address".to_string()),
        Some("uuid") if Uuid::parse_str(value).is_err() => Err("not a UUID".to_string()),
        Some("binary") if !BASE64_RE.is_match(value) => Err("not base64 encoded".to_string()),
        _ => Ok(()),
    }
}

pub fn is_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(value)
}

fn check_boolean(value: &str) -> Result<(), String> {
    if BOOLEAN_TOKENS.contains(&value) {
        Ok(())
    } else {
        Err(format!("not one of {}", BOOLEAN_TOKENS.join(", ")))
    }
}

fn check_yearmonth(value: &str) -> Result<(), String> {
    if YEARMONTH_RE.is_match(value) && NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err("not a year and month (YYYY-MM)".to_string())
    }
}

fn check_iso_date(value: &str) -> Result<(), String> {
    if !DATE_RE.is_match(value) {
        return Err("not an ISO 8601 date (YYYY-MM-DD)".to_string());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| "not a valid date".to_string())
}

fn check_iso_time(value: &str) -> Result<(), String> {
    if !TIME_RE.is_match(value) {
        return Err("not an ISO 8601 time (HH:MM:SS)".to_string());
    }
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .map(|_| ())
        .map_err(|_| "not a valid time".to_string())
}

fn check_any(ty: InferredType, value: &str) -> Result<(), String> {
    parse_as(ty, value.trim())
        .map(|_| ())
        .map_err(|rejection| rejection.0.to_string())
}

fn check_pattern(pattern: &str, value: &str, parses: impl Fn(&str, &str) -> bool) -> Result<(), String> {
    if parses(value, pattern) {
        Ok(())
    } else {
        Err(format!("does not match format '{pattern}'"))
    }
}

fn check_duration(value: &str) -> Result<(), String> {
    if DURATION_RE.is_match(value) && value != "P" && !value.ends_with('T') {
        Ok(())
    } else {
        Err("not an ISO 8601 duration".to_string())
    }
}

fn check_geopoint(value: &str) -> Result<(), String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [lat, long] = parts.as_slice() else {
        return Err("not a geopoint (lat, long)".to_string());
    };
    let (Ok(lat), Ok(long)) = (lat.parse::<f64>(), long.parse::<f64>()) else {
        return Err("not a geopoint (lat, long)".to_string());
    };
    if !(-90.0..=90.0).contains(&lat) {
        return Err("latitude out of range [-90, 90]".to_string());
    }
    if !(-180.0..=180.0).contains(&long) {
        return Err("longitude out of range [-180, 180]".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum JsonKind {
    Object,
    Array,
    Geojson,
}

fn check_json(value: &str, kind: JsonKind) -> Result<(), String> {
    let parsed: serde_json::Value =
        serde_json::from_str(value).map_err(|e| format!("not valid JSON: {e}"))?;
    match (kind, &parsed) {
        (JsonKind::Object, serde_json::Value::Object(_)) => Ok(()),
        (JsonKind::Array, serde_json::Value::Array(_)) => Ok(()),
        (JsonKind::Geojson, serde_json::Value::Object(map))
            if map.get("type").is_some_and(serde_json::Value::is_string) =>
        {
            Ok(())
        }
        (JsonKind::Object, _) => Err("not a JSON object".to_string()),
        (JsonKind::Array, _) => Err("not a JSON array".to_string()),
        (JsonKind::Geojson, _) => Err("not a GeoJSON object".to_string()),
    }
}

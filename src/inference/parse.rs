//! Per-type parsers used by inference. Each returns the parsed value or the reason it was
//! rejected; the hierarchy search only looks at which one it got.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::InferredType;

/// A successfully parsed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Bool(bool),
    Int(i64),
    Float(f64),
    Time(NaiveTime),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
    Str(String),
}

/// Why a value is not of a candidate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection(pub &'static str);

const MIN_TIME_LEN: usize = 5;
const MIN_DATE_LEN: usize = 8;

const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S%.f"];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Try to read `value` (already trimmed) as `ty`.
pub fn parse_as(ty: InferredType, value: &str) -> Result<Parsed, Rejection> {
    match ty {
        InferredType::Bool => parse_bool(value).map(Parsed::Bool),
        InferredType::Int => value
            .parse::<i64>()
            .map(Parsed::Int)
            .map_err(|_| Rejection("not an integer")),
        InferredType::Float => value
            .parse::<f64>()
            .map(Parsed::Float)
            .map_err(|_| Rejection("not a float")),
        InferredType::Time => parse_time(value).map(Parsed::Time),
        InferredType::Date => parse_date(value).map(Parsed::Date),
        InferredType::Datetime => parse_datetime(value).map(Parsed::Datetime),
        InferredType::Str => Ok(Parsed::Str(value.to_string())),
    }
}

fn parse_bool(value: &str) -> Result<bool, Rejection> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        _ => Err(Rejection("expected bool (true/false/yes/no/y/n/1/0)")),
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, Rejection> {
    if value.len() < MIN_TIME_LEN {
        return Err(Rejection("too short for a time"));
    }
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(value, f).ok())
        .ok_or(Rejection("expected HH:MM[:SS[.ffffff]]"))
}

/// A date is a date-time at exactly midnight; anything else is left for `datetime`.
fn parse_date(value: &str) -> Result<NaiveDate, Rejection> {
    let dt = parse_datetime(value)?;
    if dt.time() == NaiveTime::MIN {
        Ok(dt.date())
    } else {
        Err(Rejection("has a time of day"))
    }
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime, Rejection> {
    if value.len() < MIN_DATE_LEN {
        return Err(Rejection("too short for a date"));
    }
    parse_any_datetime(value).ok_or(Rejection("not a recognisable date or date-time"))
}

/// Lenient date-time reading: RFC 3339, common date-time layouts, or a bare date at midnight.
fn parse_any_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(value, f).ok())
    {
        return Some(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
    {
        return Some(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

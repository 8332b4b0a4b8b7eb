//! Wildcard date/time parsing.
//!
//! Date tokens in the rule document take the form `YYYY-MM-DD` or
//! `YYYY-MM-DD HH:MM[:SS]`. Any field may be replaced by a wildcard
//! (`xxxx` for the year, `xx` elsewhere) which resolves against the
//! evaluation instant:
//!
//! - year/month/day/hour/minute take the current value
//! - a wildcarded second takes the current second plus one, so a range
//!   written as "starting now" begins one tick in the future
//!
//! Missing time fields fill to the start of the day (`00:00:00`) or the end
//! of the day (`23:59:59`) depending on which end of a range is being parsed.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_yaml::Value;

use crate::error::{PrerollError, Result};

const YEAR_WILDCARD: &str = "xxxx";
const FIELD_WILDCARD: &str = "xx";

/// A raw date value as found in the rule document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateValue {
    /// Convert a YAML scalar into a date value. Only strings are accepted.
    pub fn from_yaml(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(DateValue::Text(s.clone())),
            other => Err(PrerollError::Type(format!(
                "expected a date string, got {}",
                yaml_kind(other)
            ))),
        }
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Text(s.to_string())
    }
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::Date(d)
    }
}

impl From<NaiveDateTime> for DateValue {
    fn from(dt: NaiveDateTime) -> Self {
        DateValue::DateTime(dt)
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// One decoded field of the date grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Wild,
    Value(u32),
}

impl Field {
    fn or(self, current: u32) -> u32 {
        match self {
            Field::Wild => current,
            Field::Value(v) => v,
        }
    }
}

fn decode_field(raw: &str, text: &str, max_width: usize, wildcard: &str) -> Result<Field> {
    if text == wildcard {
        return Ok(Field::Wild);
    }
    if text.is_empty() || text.len() > max_width || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PrerollError::Parse(format!(
            "invalid field '{}' in date '{}'",
            text, raw
        )));
    }
    text.parse::<u32>()
        .map(Field::Value)
        .map_err(|_| PrerollError::Parse(format!("invalid field '{}' in date '{}'", text, raw)))
}

fn shape_error(raw: &str) -> PrerollError {
    PrerollError::Parse(format!(
        "'{}' is not of the form YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
        raw
    ))
}

/// Resolve a date value to a concrete instant.
///
/// `fill_low_time` selects `00:00:00` (true) or `23:59:59` (false) for
/// values that carry no time of day.
pub fn parse_datetime(value: &DateValue, fill_low_time: bool, now: NaiveDateTime) -> Result<NaiveDateTime> {
    match value {
        DateValue::DateTime(dt) => Ok(*dt),
        DateValue::Date(d) => Ok(d.and_time(fill_time(fill_low_time))),
        DateValue::Text(s) => parse_text(s, fill_low_time, now),
    }
}

fn fill_time(fill_low_time: bool) -> NaiveTime {
    if fill_low_time {
        NaiveTime::MIN
    } else {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    }
}

fn parse_text(raw: &str, fill_low_time: bool, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let mut parts = raw.split_whitespace();
    let date_part = parts.next().ok_or_else(|| shape_error(raw))?;
    let time_part = parts.next();
    if parts.next().is_some() {
        return Err(shape_error(raw));
    }

    let date_fields: Vec<&str> = date_part.split('-').collect();
    let [year, month, day] = date_fields[..] else {
        return Err(shape_error(raw));
    };
    let year = decode_field(raw, year, 4, YEAR_WILDCARD)?;
    let month = decode_field(raw, month, 2, FIELD_WILDCARD)?;
    let day = decode_field(raw, day, 2, FIELD_WILDCARD)?;

    let year = match year {
        Field::Wild => now.year(),
        Field::Value(v) => v as i32,
    };
    let date = NaiveDate::from_ymd_opt(year, month.or(now.month()), day.or(now.day()))
        .ok_or_else(|| PrerollError::Parse(format!("'{}' is not a valid calendar date", raw)))?;

    let Some(time_part) = time_part else {
        return Ok(date.and_time(fill_time(fill_low_time)));
    };

    let time_fields: Vec<&str> = time_part.split(':').collect();
    let (hour, minute, second) = match time_fields[..] {
        [h, m] => (h, m, None),
        [h, m, s] => (h, m, Some(s)),
        _ => return Err(shape_error(raw)),
    };
    let hour = decode_field(raw, hour, 2, FIELD_WILDCARD)?.or(now.hour());
    let minute = decode_field(raw, minute, 2, FIELD_WILDCARD)?.or(now.minute());

    let (second, bump) = match second {
        None => (if fill_low_time { 0 } else { 59 }, false),
        Some(s) => match decode_field(raw, s, 2, FIELD_WILDCARD)? {
            Field::Wild => (now.second(), true),
            Field::Value(v) => (v, false),
        },
    };

    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| PrerollError::Parse(format!("'{}' is not a valid time of day", raw)))?;
    let resolved = date.and_time(time);

    if bump {
        resolved
            .checked_add_signed(Duration::seconds(1))
            .ok_or_else(|| PrerollError::Parse(format!("'{}' is out of range", raw)))
    } else {
        Ok(resolved)
    }
}

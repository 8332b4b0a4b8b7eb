//! Calendar window calculation for weekly and monthly rules.
//!
//! Week numbering follows the convention schedules were historically authored
//! against: week `n` starts on the Sunday that closes Monday-based week `n - 1`
//! of the year, where week 0 is the partial run of days before the first
//! Monday. This is NOT ISO-8601. When January 1st is a Monday there is no
//! week 0, so weeks 1 and 2 share the same start.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{PrerollError, Result};

pub const MAX_WEEK: u32 = 52;

/// Three-letter lowercase month keys, January first.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last whole second of `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

/// Inclusive window covering week `week` (1..=52) of `year`.
pub fn week_window(year: i32, week: u32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    if !(1..=MAX_WEEK).contains(&week) {
        return Err(PrerollError::Validation(format!(
            "week number {} out of range 1..={}",
            week, MAX_WEEK
        )));
    }
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| PrerollError::Validation(format!("year {} out of range", year)))?;

    let first_weekday = i64::from(jan1.weekday().num_days_from_monday());
    let week_index = i64::from(week - 1);
    let week0_len = (7 - first_weekday) % 7;
    // Sunday is the seventh day of a Monday-based week.
    let offset = if week_index == 0 {
        6 - first_weekday
    } else {
        week0_len + 7 * (week_index - 1) + 6
    };

    let start = jan1 + Duration::days(offset);
    let end = start + Duration::days(6);
    Ok((start_of_day(start), end_of_day(end)))
}

/// Inclusive window covering month `month` (1..=12) of `year`.
pub fn month_window(year: i32, month: u32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        PrerollError::Validation(format!("month {} of year {} out of range", month, year))
    })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| PrerollError::Validation(format!("year {} out of range", year)))?;
    let last = next_first - Duration::days(1);

    Ok((start_of_day(first), end_of_day(last)))
}

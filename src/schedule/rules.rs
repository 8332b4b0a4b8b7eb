//! Rule document loading and entry building.
//!
//! The rule document is a YAML mapping with up to five sections, one per
//! [`Category`]. Each present section must carry an `enabled` flag; a
//! disabled section is skipped without looking at its children.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde_yaml::{Mapping, Value};

use super::calendar::{self, MAX_WEEK, MONTH_ABBREVIATIONS};
use super::entry::{Category, ScheduleEntry};
use super::wildcard::{parse_datetime, DateValue};
use crate::error::{PrerollError, Result};

/// File names searched for when no schedule path is given, in order.
pub const DEFAULT_SCHEDULE_FILES: [&str; 2] = ["preroll_schedules.yaml", "preroll_schedules.yml"];

/// Find the rule document.
///
/// An explicit path must exist. Otherwise the default file names are tried
/// in `search_dir`.
pub fn locate_rules(explicit: Option<&Path>, search_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(PrerollError::ConfigNotFound(format!(
            "schedule file '{}' not found",
            path.display()
        )));
    }

    DEFAULT_SCHEDULE_FILES
        .iter()
        .map(|name| search_dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| {
            PrerollError::ConfigNotFound(format!(
                "no {} found in {}",
                DEFAULT_SCHEDULE_FILES.join(" / "),
                search_dir.display()
            ))
        })
}

/// Locate and parse the rule document.
pub fn load_rules(explicit: Option<&Path>, search_dir: &Path) -> Result<Value> {
    let path = locate_rules(explicit, search_dir)?;
    let content = fs::read_to_string(&path)?;
    let doc: Value = serde_yaml::from_str(&content)?;
    info!("Loaded schedule rules from: {}", path.display());
    Ok(doc)
}

/// Build every schedule entry described by `doc`, relative to `now`.
///
/// Entries come back sorted by start, latest first. The sort is stable so
/// entries sharing a start keep document order.
pub fn build_schedule(doc: &Value, now: NaiveDateTime) -> Result<Vec<ScheduleEntry>> {
    let sections = match doc {
        Value::Null => {
            info!("Schedule document is empty");
            return Ok(Vec::new());
        }
        Value::Mapping(m) => m,
        _ => {
            return Err(PrerollError::Validation(
                "schedule document must be a mapping of categories".to_string(),
            ));
        }
    };

    for key in sections.keys() {
        let name = key.as_str().ok_or_else(|| {
            PrerollError::Validation(format!("schedule category names must be strings, got {:?}", key))
        })?;
        name.parse::<Category>()?;
    }

    let today = now.date();
    let mut entries = Vec::new();

    for category in Category::ALL {
        let Some(section) = sections.get(category.as_str()) else {
            debug!("No '{}' section, skipping", category);
            continue;
        };
        let section = section_mapping(category, section)?;
        if !is_enabled(category, section)? {
            debug!("Section '{}' disabled", category);
            continue;
        }

        let before = entries.len();
        match category {
            Category::Default => parse_single(category, section, "path", today, &mut entries)?,
            Category::Monthly => parse_monthly(section, now.year(), &mut entries)?,
            Category::Weekly => parse_weekly(section, now.year(), &mut entries)?,
            Category::DateRange => parse_date_ranges(section, now, &mut entries)?,
            Category::Misc => parse_single(category, section, "always_use", today, &mut entries)?,
        }
        debug!("Section '{}' produced {} entries", category, entries.len() - before);
    }

    entries.sort_by(|a, b| b.start.cmp(&a.start));
    info!("Parsed {} schedule entries", entries.len());
    Ok(entries)
}

fn section_mapping(category: Category, section: &Value) -> Result<&Mapping> {
    section.as_mapping().ok_or_else(|| {
        PrerollError::Validation(format!(
            "section '{}' must be a mapping with an 'enabled' key",
            category
        ))
    })
}

fn is_enabled(category: Category, section: &Mapping) -> Result<bool> {
    match section.get("enabled") {
        Some(Value::Bool(enabled)) => Ok(*enabled),
        Some(other) => Err(PrerollError::Validation(format!(
            "{}.enabled must be true or false, got {:?}",
            category, other
        ))),
        None => Err(PrerollError::Validation(format!(
            "key 'enabled' not found in '{}' section",
            category
        ))),
    }
}

/// Read a path value. Null and blank strings mean "unset".
fn path_value(context: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(PrerollError::Validation(format!(
            "{}: path must be a string, got {:?}",
            context, other
        ))),
    }
}

/// Read an optional repeat count. Absent or null means one.
fn weight_value(context: &str, value: Option<&Value>) -> Result<u32> {
    match value {
        None | Some(Value::Null) => Ok(1),
        Some(Value::Number(n)) => n
            .as_u64()
            .filter(|w| *w >= 1)
            .and_then(|w| u32::try_from(w).ok())
            .ok_or_else(|| {
                PrerollError::Validation(format!("{}: weight must be a positive integer, got {}", context, n))
            }),
        Some(other) => Err(PrerollError::Validation(format!(
            "{}: weight must be a positive integer, got {:?}",
            context, other
        ))),
    }
}

/// A monthly or weekly slot: either a bare path or `{path, weight}`.
fn slot_value(context: &str, value: &Value) -> Result<Option<(String, u32)>> {
    let Value::Mapping(slot) = value else {
        return Ok(path_value(context, value)?.map(|path| (path, 1)));
    };
    let path = slot.get("path").ok_or_else(|| {
        PrerollError::Validation(format!("{}: key 'path' not found", context))
    })?;
    let Some(path) = path_value(context, path)? else {
        return Ok(None);
    };
    Ok(Some((path, weight_value(context, slot.get("weight"))?)))
}

/// `default` and `misc`: one required key, active for the whole of today.
fn parse_single(
    category: Category,
    section: &Mapping,
    key: &str,
    today: NaiveDate,
    entries: &mut Vec<ScheduleEntry>,
) -> Result<()> {
    let context = format!("{}.{}", category, key);
    let value = section.get(key).ok_or_else(|| {
        PrerollError::Validation(format!("key '{}' not found in '{}' section", key, category))
    })?;

    match path_value(&context, value)? {
        Some(path) => {
            let weight = weight_value(&format!("{}.weight", category), section.get("weight"))?;
            entries.push(
                ScheduleEntry::new(
                    category,
                    key,
                    calendar::start_of_day(today),
                    calendar::end_of_day(today),
                    path,
                )
                .with_weight(weight),
            );
        }
        None => debug!("{} is empty, skipping", context),
    }
    Ok(())
}

fn parse_monthly(section: &Mapping, year: i32, entries: &mut Vec<ScheduleEntry>) -> Result<()> {
    for (month, abbrev) in (1u32..).zip(MONTH_ABBREVIATIONS) {
        let Some(value) = section.get(abbrev) else {
            debug!("Key value not found: monthly -> {}, skipping month", abbrev);
            continue;
        };
        let Some((path, weight)) = slot_value(&format!("monthly.{}", abbrev), value)? else {
            debug!("monthly.{} is empty, skipping month", abbrev);
            continue;
        };
        let (start, end) = calendar::month_window(year, month)?;
        entries.push(ScheduleEntry::new(Category::Monthly, abbrev, start, end, path).with_weight(weight));
    }
    Ok(())
}

/// Week slots may be keyed by integer (`5:`) or by string (`"5":`).
fn week_slot(section: &Mapping, week: u32) -> Option<&Value> {
    section
        .get(Value::Number(week.into()))
        .or_else(|| section.get(week.to_string()))
}

fn parse_weekly(section: &Mapping, year: i32, entries: &mut Vec<ScheduleEntry>) -> Result<()> {
    for week in 1..=MAX_WEEK {
        let Some(value) = week_slot(section, week) else {
            debug!("Key value not found: weekly -> {}, skipping week", week);
            continue;
        };
        let Some((path, weight)) = slot_value(&format!("weekly.{}", week), value)? else {
            debug!("weekly.{} is empty, skipping week", week);
            continue;
        };
        let (start, end) = calendar::week_window(year, week)?;
        entries.push(
            ScheduleEntry::new(Category::Weekly, format!("week {}", week), start, end, path).with_weight(weight),
        );
    }
    Ok(())
}

fn parse_date_ranges(section: &Mapping, now: NaiveDateTime, entries: &mut Vec<ScheduleEntry>) -> Result<()> {
    let ranges = match section.get("ranges") {
        Some(Value::Sequence(ranges)) => ranges.as_slice(),
        Some(Value::Null) => &[],
        Some(other) => {
            return Err(PrerollError::Validation(format!(
                "date_range.ranges must be a list, got {:?}",
                other
            )));
        }
        None => {
            return Err(PrerollError::Validation(
                "key 'ranges' not found in 'date_range' section".to_string(),
            ));
        }
    };

    for (index, range) in ranges.iter().enumerate() {
        if let Some(entry) = parse_range(index, range, now)? {
            entries.push(entry);
        }
    }
    Ok(())
}

fn parse_range(index: usize, range: &Value, now: NaiveDateTime) -> Result<Option<ScheduleEntry>> {
    let context = format!("date_range.ranges[{}]", index);
    let range = range.as_mapping().ok_or_else(|| {
        PrerollError::Validation(format!("{}: each range must be a mapping", context))
    })?;

    let required = |key: &str| {
        range.get(key).ok_or_else(|| {
            PrerollError::Validation(format!("{}: key '{}' not found", context, key))
        })
    };
    let start_raw = required("start_date")?;
    let end_raw = required("end_date")?;
    let path_raw = required("path")?;

    let name = range
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("range {}", index + 1));

    let Some(path) = path_value(&context, path_raw)? else {
        debug!("{} ({}) has an empty path, skipping", context, name);
        return Ok(None);
    };

    let with_context = |err: PrerollError| match err {
        PrerollError::Parse(msg) => PrerollError::Parse(format!("{} ({}): {}", context, name, msg)),
        PrerollError::Type(msg) => PrerollError::Type(format!("{} ({}): {}", context, name, msg)),
        other => other,
    };
    let start = DateValue::from_yaml(start_raw)
        .and_then(|v| parse_datetime(&v, true, now))
        .map_err(with_context)?;
    let end = DateValue::from_yaml(end_raw)
        .and_then(|v| parse_datetime(&v, false, now))
        .map_err(with_context)?;

    if start > end {
        return Err(PrerollError::Validation(format!(
            "{} ({}): start {} is after end {}; ranges do not wrap around the year end, \
             split it into two ranges (one ending xxxx-12-31, one starting xxxx-01-01)",
            context, name, start, end
        )));
    }

    let force = match range.get("force") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(force)) => *force,
        Some(other) => {
            return Err(PrerollError::Validation(format!(
                "{} ({}): force must be true or false, got {:?}",
                context, name, other
            )));
        }
    };

    let weight = weight_value(&format!("{} ({})", context, name), range.get("weight"))?;

    Ok(Some(
        ScheduleEntry::new(Category::DateRange, name, start, end, path)
            .with_force(force)
            .with_weight(weight),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn christmas() -> NaiveDateTime {
        at(2024, 12, 25, 12, 0, 0)
    }

    fn build(yaml: &str) -> Result<Vec<ScheduleEntry>> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        build_schedule(&doc, christmas())
    }

    #[test]
    fn test_empty_document() {
        assert!(build("").unwrap().is_empty());
    }

    #[test]
    fn test_non_mapping_document() {
        assert!(matches!(build("- a\n- b\n"), Err(PrerollError::Validation(_))));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let err = build("montly:\n  enabled: true\n").unwrap_err();
        assert!(matches!(err, PrerollError::Validation(_)));
        assert!(err.to_string().contains("montly"));
    }

    #[test]
    fn test_missing_enabled_rejected() {
        let err = build("monthly:\n  dec: holiday.mp4\n").unwrap_err();
        assert!(matches!(err, PrerollError::Validation(_)));
        assert!(err.to_string().contains("monthly"));
    }

    #[test]
    fn test_non_bool_enabled_rejected() {
        assert!(matches!(
            build("misc:\n  enabled: yes please\n  always_use: a.mp4\n"),
            Err(PrerollError::Validation(_))
        ));
    }

    #[test]
    fn test_disabled_section_skips_validation() {
        let entries = build(
            "date_range:\n  enabled: false\n  ranges:\n    - path: broken.mp4\n",
        )
        .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_default_and_misc_cover_today() {
        let entries = build(
            "default:\n  enabled: true\n  path: default.mp4\nmisc:\n  enabled: true\n  always_use: ambient.mp4\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.start, at(2024, 12, 25, 0, 0, 0));
            assert_eq!(entry.end, at(2024, 12, 25, 23, 59, 59));
            assert!(!entry.force);
        }
        // equal starts keep parse order
        assert_eq!(entries[0].category, Category::Default);
        assert_eq!(entries[1].category, Category::Misc);
    }

    #[test]
    fn test_misc_missing_always_use_rejected() {
        assert!(matches!(
            build("misc:\n  enabled: true\n"),
            Err(PrerollError::Validation(_))
        ));
    }

    #[test]
    fn test_default_empty_path_skipped() {
        assert!(build("default:\n  enabled: true\n  path: ''\n").unwrap().is_empty());
    }

    #[test]
    fn test_monthly_entries_and_missing_months() {
        let entries = build("monthly:\n  enabled: true\n  jan: jan.mp4\n  dec: dec.mp4\n  feb:\n").unwrap();
        assert_eq!(entries.len(), 2);
        // sorted latest start first
        assert_eq!(entries[0].path, "dec.mp4");
        assert_eq!(entries[0].name, "dec");
        assert_eq!(entries[0].start, at(2024, 12, 1, 0, 0, 0));
        assert_eq!(entries[0].end, at(2024, 12, 31, 23, 59, 59));
        assert_eq!(entries[1].path, "jan.mp4");
    }

    #[test]
    fn test_weekly_integer_and_string_keys() {
        let entries = build("weekly:\n  enabled: true\n  1: one.mp4\n  \"2\": two.mp4\n  53: ignored.mp4\n").unwrap();
        assert_eq!(entries.len(), 2);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"one.mp4"));
        assert!(paths.contains(&"two.mp4"));
        assert!(entries.iter().all(|e| e.category == Category::Weekly));
    }

    #[test]
    fn test_date_range_entry() {
        let entries = build(
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n      path: xmas.mp4\n      force: true\n      name: Christmas\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.category, Category::DateRange);
        assert_eq!(entry.name, "Christmas");
        assert_eq!(entry.start, at(2024, 12, 24, 0, 0, 0));
        assert_eq!(entry.end, at(2024, 12, 26, 23, 59, 59));
        assert!(entry.force);
    }

    #[test]
    fn test_date_range_wildcards() {
        let entries = build(
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: xxxx-12-01\n      end_date: xxxx-12-31\n      path: december.mp4\n",
        )
        .unwrap();
        assert_eq!(entries[0].start, at(2024, 12, 1, 0, 0, 0));
        assert_eq!(entries[0].end, at(2024, 12, 31, 23, 59, 59));
        assert!(!entries[0].force);
    }

    #[test]
    fn test_date_range_missing_field_rejected() {
        for yaml in [
            "date_range:\n  enabled: true\n  ranges:\n    - end_date: 2024-12-26\n      path: a.mp4\n",
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      path: a.mp4\n",
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n",
            "date_range:\n  enabled: true\n",
        ] {
            assert!(matches!(build(yaml), Err(PrerollError::Validation(_))), "{yaml}");
        }
    }

    #[test]
    fn test_date_range_bad_date_is_parse_error() {
        let err = build(
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-1x-24\n      end_date: 2024-12-26\n      path: a.mp4\n",
        )
        .unwrap_err();
        assert!(matches!(err, PrerollError::Parse(_)));
        assert!(err.to_string().contains("2024-1x-24"));
    }

    #[test]
    fn test_date_range_non_string_date_is_type_error() {
        let err = build(
            "date_range:\n  enabled: true\n  ranges:\n    - start_date: 20241224\n      end_date: 2024-12-26\n      path: a.mp4\n",
        )
        .unwrap_err();
        assert!(matches!(err, PrerollError::Type(_)));
    }

    #[test]
    fn test_date_range_inverted_rejected() {
        assert!(matches!(
            build("date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-26\n      end_date: 2024-12-24\n      path: a.mp4\n"),
            Err(PrerollError::Validation(_))
        ));
    }

    #[test]
    fn test_year_wrapping_range_suggests_split() {
        let err = build(
            "monthly:\n  enabled: true\n  dec: dec.mp4\ndate_range:\n  enabled: true\n  ranges:\n    - start_date: xxxx-12-31\n      end_date: xxxx-01-01\n      path: nye.mp4\n",
        )
        .unwrap_err();
        assert!(matches!(err, PrerollError::Validation(_)));
        let msg = err.to_string();
        assert!(msg.contains("split it into two ranges"));
        assert!(msg.contains("xxxx-12-31"));
    }

    #[test]
    fn test_weights_on_every_category() {
        let entries = build(
            "default:\n  enabled: true\n  path: default.mp4\n  weight: 2\nmisc:\n  enabled: true\n  always_use: ambient.mp4\nmonthly:\n  enabled: true\n  dec:\n    path: dec.mp4\n    weight: 3\n  nov: nov.mp4\nweekly:\n  enabled: true\n  52:\n    path: week.mp4\n    weight: 4\ndate_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n      path: xmas.mp4\n      weight: 5\n",
        )
        .unwrap();
        let weight_of = |path: &str| entries.iter().find(|e| e.path == path).unwrap().weight;
        assert_eq!(weight_of("default.mp4"), 2);
        assert_eq!(weight_of("ambient.mp4"), 1);
        assert_eq!(weight_of("dec.mp4"), 3);
        assert_eq!(weight_of("nov.mp4"), 1);
        assert_eq!(weight_of("week.mp4"), 4);
        assert_eq!(weight_of("xmas.mp4"), 5);
    }

    #[test]
    fn test_invalid_weight_rejected() {
        for weight in ["0", "-1", "1.5", "lots"] {
            let yaml = format!(
                "date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n      path: a.mp4\n      weight: {}\n",
                weight
            );
            assert!(matches!(build(&yaml), Err(PrerollError::Validation(_))), "weight {weight}");
        }
    }

    #[test]
    fn test_slot_mapping_requires_path() {
        assert!(matches!(
            build("monthly:\n  enabled: true\n  dec:\n    weight: 2\n"),
            Err(PrerollError::Validation(_))
        ));
        assert!(build("monthly:\n  enabled: true\n  dec:\n    path: ''\n    weight: 2\n").unwrap().is_empty());
    }

    #[test]
    fn test_date_range_bad_force_rejected() {
        assert!(matches!(
            build("date_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n      path: a.mp4\n      force: maybe\n"),
            Err(PrerollError::Validation(_))
        ));
    }

    #[test]
    fn test_sorted_latest_start_first() {
        let entries = build(
            "monthly:\n  enabled: true\n  dec: dec.mp4\ndate_range:\n  enabled: true\n  ranges:\n    - start_date: 2024-12-24\n      end_date: 2024-12-26\n      path: xmas.mp4\n    - start_date: 2024-11-01\n      end_date: 2024-12-31\n      path: season.mp4\n",
        )
        .unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["xmas.mp4", "dec.mp4", "season.mp4"]);
    }

    #[test]
    fn test_locate_rules_prefers_yaml() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("preroll_schedules.yml"), "")?;
        fs::write(dir.path().join("preroll_schedules.yaml"), "")?;
        let found = locate_rules(None, dir.path())?;
        assert_eq!(found, dir.path().join("preroll_schedules.yaml"));
        Ok(())
    }

    #[test]
    fn test_locate_rules_falls_back_to_yml() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("preroll_schedules.yml"), "")?;
        assert_eq!(locate_rules(None, dir.path())?, dir.path().join("preroll_schedules.yml"));
        Ok(())
    }

    #[test]
    fn test_locate_rules_missing() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(matches!(locate_rules(None, dir.path()), Err(PrerollError::ConfigNotFound(_))));
        let explicit = dir.path().join("nope.yaml");
        assert!(matches!(
            locate_rules(Some(&explicit), dir.path()),
            Err(PrerollError::ConfigNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_load_rules_parses_yaml() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "misc:\n  enabled: true\n  always_use: a.mp4\n")?;
        let doc = load_rules(Some(&path), dir.path())?;
        assert!(doc.get("misc").is_some());
        Ok(())
    }
}

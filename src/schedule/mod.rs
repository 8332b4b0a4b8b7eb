//! Pre-roll schedule resolution.
//!
//! The pipeline is pure: a rule document and an evaluation instant go in, a
//! listing string comes out.
//!
//! 1. [`build_schedule`] turns the document into [`ScheduleEntry`] values
//! 2. [`resolve`] picks the entries active at `now` and merges categories
//! 3. [`build_listing`] joins the resulting paths

pub mod calendar;
pub mod entry;
pub mod listing;
pub mod resolve;
pub mod rules;
pub mod wildcard;

pub use calendar::{month_window, week_window};
pub use entry::{Category, ScheduleEntry};
pub use listing::build_listing;
pub use resolve::{resolve, resolve_buckets, Buckets};
pub use rules::{build_schedule, load_rules, locate_rules, DEFAULT_SCHEDULE_FILES};
pub use wildcard::{parse_datetime, DateValue};

use chrono::NaiveDateTime;
use log::info;
use serde_yaml::Value;

use crate::error::Result;

/// Build, resolve and format in one step.
pub fn preroll_listing(doc: &Value, now: NaiveDateTime, play_all: bool) -> Result<String> {
    let entries = build_schedule(doc, now)?;
    let buckets = resolve_buckets(&entries, now);

    for category in Category::PRIORITY {
        let active = buckets.get(category);
        if !active.is_empty() {
            let names: Vec<&str> = active.iter().map(|e| e.name.as_str()).collect();
            info!(
                "{} - {} active ({}){}",
                category,
                active.len(),
                names.join(", "),
                if buckets.included(category) { "" } else { ", suppressed" }
            );
        }
    }

    let listing = build_listing(&buckets.merge(), play_all);
    info!("Resolved listing for {}: \"{}\"", now, listing);
    Ok(listing)
}

//! Schedule entry and category types.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::PrerollError;

/// The five fixed kinds of schedule rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Default,
    Monthly,
    Weekly,
    DateRange,
    Misc,
}

impl Category {
    /// Order in which sections of the rule document are parsed.
    pub const ALL: [Category; 5] = [
        Category::Default,
        Category::Monthly,
        Category::Weekly,
        Category::DateRange,
        Category::Misc,
    ];

    /// Merge order, highest priority first.
    pub const PRIORITY: [Category; 5] = [
        Category::Misc,
        Category::DateRange,
        Category::Weekly,
        Category::Monthly,
        Category::Default,
    ];

    /// Key of this category in the rule document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Default => "default",
            Category::Monthly => "monthly",
            Category::Weekly => "weekly",
            Category::DateRange => "date_range",
            Category::Misc => "misc",
        }
    }

    /// Dense index, used for per-category buckets.
    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Default => 0,
            Category::Monthly => 1,
            Category::Weekly => 2,
            Category::DateRange => 3,
            Category::Misc => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PrerollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Category::Default),
            "monthly" => Ok(Category::Monthly),
            "weekly" => Ok(Category::Weekly),
            "date_range" => Ok(Category::DateRange),
            "misc" => Ok(Category::Misc),
            other => Err(PrerollError::Validation(format!(
                "unknown schedule category '{}' (expected one of: default, monthly, weekly, date_range, misc)",
                other
            ))),
        }
    }
}

/// One resolved rule with a concrete interval and an asset path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub category: Category,
    /// Human label for logs: month abbreviation, week number, range name.
    pub name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Exempt from narrowest-interval suppression.
    pub force: bool,
    /// Opaque asset path (may itself be a joined list).
    pub path: String,
    /// Times the path is repeated in the listing, biasing random picks.
    pub weight: u32,
}

impl ScheduleEntry {
    pub fn new(
        category: Category,
        name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        path: impl Into<String>,
    ) -> Self {
        debug_assert!(start <= end, "schedule entry starts after it ends");
        Self {
            category,
            name: name.into(),
            start,
            end,
            force: false,
            path: path.into(),
            weight: 1,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the repeat count, never below one.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.max(1);
        self
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `now` falls inside the inclusive interval.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now <= self.end
    }
}

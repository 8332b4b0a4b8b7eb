//! Resolution of active entries and cross-category merge.
//!
//! Within a category the narrowest active entry wins; entries marked
//! `force` are never evicted. Across categories a fixed priority applies:
//!
//! - misc is always included
//! - date_range is included when non-empty
//! - weekly only when date_range is empty
//! - monthly only when weekly and date_range are empty
//! - default only when monthly, weekly and date_range are empty

use chrono::NaiveDateTime;
use log::debug;

use super::entry::{Category, ScheduleEntry};

/// Active entries per category, in admission order.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    buckets: [Vec<ScheduleEntry>; 5],
}

impl Buckets {
    pub fn get(&self, category: Category) -> &[ScheduleEntry] {
        &self.buckets[category.index()]
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.buckets[category.index()].is_empty()
    }

    /// Offer an active entry to its category bucket.
    fn admit(&mut self, entry: &ScheduleEntry) {
        let bucket = &mut self.buckets[entry.category.index()];
        let duration = entry.duration();

        let narrower_than_all = bucket.iter().all(|e| duration < e.duration());
        let admitted = bucket.is_empty() || entry.force || narrower_than_all;

        bucket.retain(|e| {
            let keep = e.force || duration >= e.duration();
            if !keep {
                debug!("'{}' supersedes broader '{}' in {}", entry.name, e.name, entry.category);
            }
            keep
        });

        if admitted {
            bucket.push(entry.clone());
        } else {
            debug!("'{}' is broader than an active {} entry, dropped", entry.name, entry.category);
        }
    }

    /// Whether a category takes part in the merged listing.
    pub fn included(&self, category: Category) -> bool {
        let empty = |c| self.is_empty(c);
        match category {
            Category::Misc | Category::DateRange => true,
            Category::Weekly => empty(Category::DateRange),
            Category::Monthly => empty(Category::Weekly) && empty(Category::DateRange),
            Category::Default => {
                empty(Category::Monthly) && empty(Category::Weekly) && empty(Category::DateRange)
            }
        }
    }

    /// Flatten included buckets into paths, highest priority first. Each
    /// path appears `weight` times.
    pub fn merge(&self) -> Vec<String> {
        Category::PRIORITY
            .into_iter()
            .filter(|c| self.included(*c))
            .flat_map(|c| self.get(c).iter())
            .flat_map(|e| std::iter::repeat_n(e.path.clone(), e.weight as usize))
            .collect()
    }
}

/// Sort active entries into per-category buckets.
pub fn resolve_buckets(entries: &[ScheduleEntry], now: NaiveDateTime) -> Buckets {
    let mut buckets = Buckets::default();
    for entry in entries.iter().filter(|e| e.is_active(now)) {
        buckets.admit(entry);
    }
    buckets
}

/// Ordered asset paths active at `now`.
pub fn resolve(entries: &[ScheduleEntry], now: NaiveDateTime) -> Vec<String> {
    resolve_buckets(entries, now).merge()
}

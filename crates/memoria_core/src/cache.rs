use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Months resident at once: the displayed month and two neighbors.
const CAPACITY: usize = 3;

/// Bounded cache of narrow month grids, keyed by the first day of the month.
///
/// Eviction removes the lowest-sorted key, not the least recently used one.
/// In the common forward/back navigation case that keeps the displayed month
/// and its temporal neighbors resident; a far jump backward can evict the
/// month just inserted. That trade-off is intentional.
#[derive(Debug, Default)]
pub struct MonthDayCache {
    entries: BTreeMap<NaiveDate, Vec<Option<NaiveDate>>>,
}

impl MonthDayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, month_key: NaiveDate) -> Option<&Vec<Option<NaiveDate>>> {
        self.entries.get(&month_key)
    }

    pub fn put(&mut self, month_key: NaiveDate, grid: Vec<Option<NaiveDate>>) {
        self.entries.insert(month_key, grid);
        while self.entries.len() > CAPACITY {
            if let Some((evicted, _)) = self.entries.pop_first() {
                tracing::debug!(month = %evicted, "evicting cached month grid");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

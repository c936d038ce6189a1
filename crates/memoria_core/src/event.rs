use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::{PersonRecord, RecordId};
use crate::recurrence::{self, Anchor};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Birthday,
    DeathAnniversary,
}

impl EventKind {
    pub fn slug(self) -> &'static str {
        match self {
            EventKind::Birthday => "birthday",
            EventKind::DeathAnniversary => "death-anniversary",
        }
    }
}

/// One concrete occurrence of a recurring anniversary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub record: RecordId,
    pub kind: EventKind,
    pub date: NaiveDate,
}

impl CalendarEvent {
    /// Deterministic identity derived from the record and event kind, so
    /// recomputing a window reproduces the same ids.
    pub fn id(&self) -> String {
        format!("{}:{}", self.record, self.kind.slug())
    }
}

/// Date-keyed view of the events inside one wide grid window. Replaced
/// wholesale on every successful pipeline run, never merged or patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventIndex {
    by_date: HashMap<NaiveDate, Vec<CalendarEvent>>,
}

impl EventIndex {
    /// Events on `date`, ordered by kind then record id. Empty for dates
    /// outside the computed window or with no events.
    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_count(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// Assemble the index for one window: a record contributes an event on a
/// grid date exactly when that date is the next occurrence of its anchor as
/// seen from that date, i.e. when the month/day matches. Records with
/// unparseable dates contribute nothing. Dates with zero events are omitted.
pub fn build_index(records: &[PersonRecord], window: &[NaiveDate]) -> EventIndex {
    let anchors: Vec<(RecordId, EventKind, Anchor)> = records
        .iter()
        .flat_map(|record| {
            let birth = record
                .birth_anchor()
                .map(|anchor| (record.id.clone(), EventKind::Birthday, anchor));
            let death = record
                .death_anchor()
                .map(|anchor| (record.id.clone(), EventKind::DeathAnniversary, anchor));
            [birth, death].into_iter().flatten()
        })
        .collect();

    let mut by_date: HashMap<NaiveDate, Vec<CalendarEvent>> = HashMap::new();
    for &date in window {
        let mut bucket: Vec<CalendarEvent> = Vec::new();
        for (record, kind, anchor) in &anchors {
            if recurrence::next_occurrence(*anchor, date) == Some(date) {
                bucket.push(CalendarEvent {
                    record: record.clone(),
                    kind: *kind,
                    date,
                });
            }
        }
        if !bucket.is_empty() {
            bucket.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.record.cmp(&b.record)));
            by_date.insert(date, bucket);
        }
    }

    EventIndex { by_date }
}

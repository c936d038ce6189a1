use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::recurrence::{parse_anchor, Anchor};

/// Non-owning lookup key for a person record. Events carry this back to the
/// record instead of an owned copy, so they never outlive or duplicate the
/// record's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked person, as provided by the record store. Dates are free-form
/// strings; an unparseable date means the matching event kind simply does
/// not exist for this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: RecordId,
    pub name: String,
    pub occupation: String,
    pub birth_date: String,
    pub death_date: Option<String>,
    pub deceased: bool,
}

impl PersonRecord {
    pub fn birth_anchor(&self) -> Option<Anchor> {
        parse_anchor(&self.birth_date)
    }

    /// Death anniversaries exist only for deceased records with a parsable
    /// death date.
    pub fn death_anchor(&self) -> Option<Anchor> {
        if !self.deceased {
            return None;
        }
        self.death_date.as_deref().and_then(parse_anchor)
    }
}

/// External collaborator boundary: whatever owns the person records hands
/// the engine a full, consistent snapshot on demand.
pub trait RecordStore: Send + Sync {
    fn fetch_all_records(&self) -> Vec<PersonRecord>;
}

/// Reference store backed by an in-memory list. Hosts that keep records in
/// their own storage implement [`RecordStore`] directly instead.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<PersonRecord>>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<PersonRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn replace_all(&self, records: Vec<PersonRecord>) {
        *self.records.write() = records;
    }
}

impl RecordStore for InMemoryRecordStore {
    fn fetch_all_records(&self) -> Vec<PersonRecord> {
        self.records.read().clone()
    }
}

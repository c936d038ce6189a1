pub mod cache;
pub mod engine;
pub mod event;
pub mod grid;
pub mod record;
pub mod recurrence;

pub use crate::engine::{CalendarEngine, CalendarEngineBuilder, MonthChangeSink};
pub use crate::event::{CalendarEvent, EventIndex, EventKind};
pub use crate::record::{InMemoryRecordStore, PersonRecord, RecordId, RecordStore};

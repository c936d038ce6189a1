use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use memoria_core::{
    CalendarEngine, EventKind, InMemoryRecordStore, MonthChangeSink, PersonRecord, RecordId,
    RecordStore,
};
use parking_lot::Mutex;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn person(id: &str, birth: &str) -> PersonRecord {
    PersonRecord {
        id: RecordId::new(id),
        name: id.to_string(),
        occupation: "Example".to_string(),
        birth_date: birth.to_string(),
        death_date: None,
        deceased: false,
    }
}

/// Store whose first snapshot fetch blocks until the test releases it,
/// simulating a slow run that finishes after the user has navigated away.
struct GateStore {
    records: Vec<PersonRecord>,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    calls: AtomicUsize,
}

impl GateStore {
    fn new(records: Vec<PersonRecord>, gate: mpsc::Receiver<()>) -> Self {
        Self {
            records,
            gate: Mutex::new(Some(gate)),
            calls: AtomicUsize::new(0),
        }
    }
}

impl RecordStore for GateStore {
    fn fetch_all_records(&self) -> Vec<PersonRecord> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let gate = self.gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.recv_timeout(Duration::from_secs(5));
            }
        }
        self.records.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    months: Mutex<Vec<NaiveDate>>,
}

/// Engine-side handle to a shared [`RecordingSink`].
struct SinkHandle(Arc<RecordingSink>);

impl MonthChangeSink for SinkHandle {
    fn month_changed(&self, month: NaiveDate) {
        self.0.months.lock().push(month);
    }
}

#[test]
fn birthday_appears_on_the_reference_date_itself() {
    let store = Arc::new(InMemoryRecordStore::new(vec![person("ada", "July 21")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 7, 21))
        .build()
        .expect("build engine");
    engine.wait_for_idle();

    let events = engine.events_on(date(2025, 7, 21));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Birthday);
    assert_eq!(events[0].record, RecordId::new("ada"));
}

#[test]
fn birthday_one_day_out_lands_on_tomorrow() {
    let store = Arc::new(InMemoryRecordStore::new(vec![person("ada", "July 21")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 7, 20))
        .build()
        .expect("build engine");
    engine.wait_for_idle();

    assert!(engine.events_on(date(2025, 7, 20)).is_empty());
    assert_eq!(engine.events_on(date(2025, 7, 21)).len(), 1);
}

#[test]
fn shared_birthdays_both_appear() {
    let store = Arc::new(InMemoryRecordStore::new(vec![
        person("ada", "July 21"),
        person("grace", "July 21"),
    ]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 7, 1))
        .build()
        .expect("build engine");
    engine.wait_for_idle();

    let events = engine.events_on(date(2025, 7, 21));
    assert_eq!(events.len(), 2);
}

#[test]
fn superseded_run_never_overwrites_newer_commit() {
    let (release, gate) = mpsc::channel();
    let store = Arc::new(GateStore::new(
        vec![person("ada", "July 21"), person("carl", "March 15")],
        gate,
    ));

    // The initial run (March) blocks in its snapshot fetch.
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2026, 3, 10))
        .build()
        .expect("build engine");

    // Navigate to July before the March run can finish; that cancels it.
    engine.step_month(4);
    assert_eq!(engine.selected_month(), date(2026, 7, 1));

    // Let the stale March run resume; it must observe cancellation and
    // never commit.
    release.send(()).expect("release gated fetch");
    engine.wait_for_idle();

    assert_eq!(engine.events_on(date(2026, 7, 21)).len(), 1);
    assert!(engine.events_on(date(2026, 3, 15)).is_empty());
}

#[test]
fn poll_applies_a_finished_run_without_blocking() {
    let (release, gate) = mpsc::channel();
    let store = Arc::new(GateStore::new(vec![person("ada", "July 21")], gate));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 7, 4))
        .build()
        .expect("build engine");

    // The worker is parked in its snapshot fetch: nothing to apply yet.
    assert!(engine.run_in_flight());
    assert!(!engine.poll());
    assert!(engine.events_on(date(2025, 7, 21)).is_empty());

    release.send(()).expect("release gated fetch");
    let deadline = Instant::now() + Duration::from_secs(5);
    while !engine.poll() {
        assert!(Instant::now() < deadline, "run never committed");
        thread::sleep(Duration::from_millis(5));
    }

    assert!(!engine.run_in_flight());
    assert_eq!(engine.events_on(date(2025, 7, 21)).len(), 1);
}

#[test]
fn same_month_selection_changes_do_not_recompute() {
    let store = Arc::new(InMemoryRecordStore::new(vec![person("carl", "March 15")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2026, 3, 10))
        .build()
        .expect("build engine");
    engine.wait_for_idle();
    assert_eq!(engine.events_on(date(2026, 3, 15)).len(), 1);

    // Same-month date changes do not trigger a run, so after moving the
    // plain selection there is nothing in flight and the index is intact.
    engine.set_selected_date(date(2026, 3, 20));
    assert!(!engine.run_in_flight());
    assert_eq!(engine.events_on(date(2026, 3, 15)).len(), 1);

    // Crossing a month boundary does trigger one.
    engine.set_selected_date(date(2026, 9, 1));
    assert!(engine.run_in_flight());
    engine.wait_for_idle();
    assert!(engine.events_on(date(2026, 3, 15)).is_empty());
}

#[test]
fn month_change_sink_fires_only_on_boundary_crossings() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(InMemoryRecordStore::new(vec![person("ada", "July 21")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .with_month_change_sink(Box::new(SinkHandle(Arc::clone(&sink))))
        .starting_at(date(2025, 7, 4))
        .build()
        .expect("build engine");
    engine.wait_for_idle();
    assert!(sink.months.lock().is_empty());

    engine.set_selected_date(date(2025, 7, 30));
    assert!(sink.months.lock().is_empty());

    engine.step_month(1);
    engine.wait_for_idle();
    engine.set_selected_date(date(2025, 9, 2));
    engine.wait_for_idle();

    let months = sink.months.lock().clone();
    assert_eq!(months, vec![date(2025, 8, 1), date(2025, 9, 1)]);
}

#[test]
fn days_in_selected_month_is_idempotent() {
    let store = Arc::new(InMemoryRecordStore::new(vec![person("ada", "July 21")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 7, 4))
        .build()
        .expect("build engine");
    engine.wait_for_idle();

    let first = engine.days_in_selected_month();
    let second = engine.days_in_selected_month();
    assert_eq!(first, second);
    // July 2025 starts on a Tuesday: one leading blank, 31 days.
    assert_eq!(first.len(), 32);
    assert_eq!(first[0], None);
    assert_eq!(first[1], Some(date(2025, 7, 1)));
}

#[test]
fn rapid_navigation_settles_on_the_last_month() {
    let store = Arc::new(InMemoryRecordStore::new(vec![person("ada", "July 21")]));
    let mut engine = CalendarEngine::builder()
        .with_store(store)
        .starting_at(date(2025, 1, 15))
        .build()
        .expect("build engine");

    // Each step cancels the previous in-flight run; at most one handle is
    // ever outstanding.
    for _ in 0..6 {
        engine.step_month(1);
    }
    engine.wait_for_idle();

    assert_eq!(engine.selected_month(), date(2025, 7, 1));
    assert_eq!(engine.events_on(date(2025, 7, 21)).len(), 1);
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{anyhow, Result};
use chrono::{Local, Months, NaiveDate};
use tracing::{debug, info};

use crate::cache::MonthDayCache;
use crate::event::{self, CalendarEvent, EventIndex};
use crate::grid;
use crate::record::RecordStore;

/// Explicit month-navigation broadcast. Hosts subscribe by handing the
/// builder a sink; the payload is the first day of the newly selected month.
pub trait MonthChangeSink: Send + Sync {
    fn month_changed(&self, month: NaiveDate);
}

enum RunOutcome {
    Completed {
        target_month: NaiveDate,
        index: EventIndex,
        narrow: Vec<Option<NaiveDate>>,
    },
    Cancelled,
}

/// Handle to the single in-flight computation. Dropping it detaches the
/// worker; the cancel flag makes the worker exit at its next checkpoint.
struct RunHandle {
    target_month: NaiveDate,
    cancel: Arc<AtomicBool>,
    rx: mpsc::Receiver<RunOutcome>,
}

pub struct CalendarEngineBuilder {
    store: Option<Arc<dyn RecordStore>>,
    sink: Option<Box<dyn MonthChangeSink>>,
    start: Option<NaiveDate>,
}

impl CalendarEngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            sink: None,
            start: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_month_change_sink(mut self, sink: Box<dyn MonthChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn starting_at(mut self, date: NaiveDate) -> Self {
        self.start = Some(date);
        self
    }

    pub fn build(self) -> Result<CalendarEngine> {
        let store = self
            .store
            .ok_or_else(|| anyhow!("a record store is required"))?;
        let selected_date = self.start.unwrap_or_else(|| Local::now().date_naive());
        let mut engine = CalendarEngine {
            store,
            sink: self.sink,
            selected_date,
            index: EventIndex::default(),
            cache: MonthDayCache::new(),
            current_run: None,
        };
        info!(month = %engine.selected_month(), "calendar engine starting");
        engine.start_run();
        Ok(engine)
    }
}

impl Default for CalendarEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns selection state, the last-committed event index, and the month-grid
/// cache, and orchestrates the cancellable recomputation pipeline.
///
/// All mutation happens on the thread that owns the engine; worker threads
/// only compute immutable intermediate values and hand them back over a
/// channel. Call [`CalendarEngine::poll`] from the host's event loop (or
/// [`CalendarEngine::wait_for_idle`] in synchronous hosts) to apply
/// completed runs.
pub struct CalendarEngine {
    store: Arc<dyn RecordStore>,
    sink: Option<Box<dyn MonthChangeSink>>,
    selected_date: NaiveDate,
    index: EventIndex,
    cache: MonthDayCache,
    current_run: Option<RunHandle>,
}

impl CalendarEngine {
    pub fn builder() -> CalendarEngineBuilder {
        CalendarEngineBuilder::new()
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    /// First day of the currently selected month.
    pub fn selected_month(&self) -> NaiveDate {
        grid::month_key(self.selected_date)
    }

    /// Move the selection. Changing the date inside the already-loaded month
    /// does not recompute; crossing a month boundary does.
    pub fn set_selected_date(&mut self, date: NaiveDate) {
        let crossed = grid::month_key(date) != self.selected_month();
        self.selected_date = date;
        if crossed {
            self.notify_month_changed();
            self.start_run();
        }
    }

    /// Step the selection by whole months. Navigation is the authoritative
    /// trigger: a run starts even when the month key is unchanged.
    pub fn step_month(&mut self, delta: i32) {
        let key = self.selected_month();
        self.selected_date = if delta >= 0 {
            key + Months::new(delta as u32)
        } else {
            key - Months::new(delta.unsigned_abs())
        };
        self.notify_month_changed();
        self.start_run();
    }

    /// Narrow grid for the selected month, cache-backed.
    pub fn days_in_selected_month(&mut self) -> Vec<Option<NaiveDate>> {
        let key = self.selected_month();
        if let Some(cells) = self.cache.get(key) {
            return cells.clone();
        }
        let cells = grid::narrow_grid(self.selected_date);
        self.cache.put(key, cells.clone());
        cells
    }

    /// Events on `date` per the last-committed index. A pure read: absence
    /// means "no events or outside the computed window", never triggers a
    /// recomputation.
    pub fn events_on(&self, date: NaiveDate) -> &[CalendarEvent] {
        self.index.events_on(date)
    }

    /// True while a computation is in flight.
    pub fn run_in_flight(&self) -> bool {
        self.current_run.is_some()
    }

    /// Apply at most one finished run without blocking. Returns true when a
    /// result was committed.
    pub fn poll(&mut self) -> bool {
        let Some(run) = &self.current_run else {
            return false;
        };
        match run.rx.try_recv() {
            Ok(outcome) => {
                self.current_run = None;
                self.apply(outcome)
            }
            Err(mpsc::TryRecvError::Empty) => false,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.current_run = None;
                false
            }
        }
    }

    /// Block until the in-flight run (if any) has resolved and its commit
    /// decision is applied.
    pub fn wait_for_idle(&mut self) {
        while let Some(run) = self.current_run.take() {
            match run.rx.recv() {
                Ok(outcome) => {
                    self.apply(outcome);
                }
                Err(mpsc::RecvError) => break,
            }
        }
    }

    fn notify_month_changed(&self) {
        let month = self.selected_month();
        info!(%month, "month navigation");
        if let Some(sink) = &self.sink {
            sink.month_changed(month);
        }
    }

    /// Cancel any outstanding run and spawn a fresh one for the selected
    /// month. The worker checks the cancel flag after the snapshot fetch and
    /// again after index assembly; it never touches engine state itself.
    fn start_run(&mut self) {
        if let Some(previous) = self.current_run.take() {
            previous.cancel.store(true, Ordering::Relaxed);
            debug!(month = %previous.target_month, "cancelling superseded run");
        }

        let target_month = self.selected_month();
        let reference = self.selected_date;
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let store = Arc::clone(&self.store);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let records = store.fetch_all_records();
            if flag.load(Ordering::Relaxed) {
                let _ = tx.send(RunOutcome::Cancelled);
                return;
            }
            let window = grid::wide_grid(reference);
            let index = event::build_index(&records, &window);
            let narrow = grid::narrow_grid(reference);
            if flag.load(Ordering::Relaxed) {
                let _ = tx.send(RunOutcome::Cancelled);
                return;
            }
            let _ = tx.send(RunOutcome::Completed {
                target_month,
                index,
                narrow,
            });
        });

        debug!(month = %target_month, "computation run started");
        self.current_run = Some(RunHandle {
            target_month,
            cancel,
            rx,
        });
    }

    fn apply(&mut self, outcome: RunOutcome) -> bool {
        match outcome {
            RunOutcome::Completed {
                target_month,
                index,
                narrow,
            } => {
                if target_month != self.selected_month() {
                    debug!(
                        stale = %target_month,
                        current = %self.selected_month(),
                        "discarding stale run result"
                    );
                    return false;
                }
                let events = index.event_count();
                self.index = index;
                self.cache.put(target_month, narrow);
                debug!(month = %target_month, events, "committed event index");
                true
            }
            RunOutcome::Cancelled => {
                debug!("run observed cancellation");
                false
            }
        }
    }
}

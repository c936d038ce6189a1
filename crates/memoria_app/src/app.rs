use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};
use memoria_core::{
    CalendarEngine, InMemoryRecordStore, MonthChangeSink, PersonRecord,
};
use tracing::info;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) records_path: PathBuf,
    pub(crate) start_date: Option<NaiveDate>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let records_path = std::env::var("MEMORIA_RECORDS")
            .map(PathBuf::from)
            .map_err(|_| anyhow!("MEMORIA_RECORDS must point to a JSON record file"))?;
        let start_date = match std::env::var("MEMORIA_START_DATE") {
            Ok(raw) => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .context("MEMORIA_START_DATE must be YYYY-MM-DD")?,
            ),
            Err(_) => None,
        };
        Ok(Self {
            records_path,
            start_date,
        })
    }
}

struct LoggingSink;

impl MonthChangeSink for LoggingSink {
    fn month_changed(&self, month: NaiveDate) {
        info!(%month, "viewing month changed");
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let raw = fs::read_to_string(&config.records_path).with_context(|| {
        format!(
            "failed to read record file {}",
            config.records_path.display()
        )
    })?;
    let records: Vec<PersonRecord> =
        serde_json::from_str(&raw).context("record file is not a valid PersonRecord list")?;
    info!(record_count = records.len(), "loaded person records");

    let store = Arc::new(InMemoryRecordStore::new(records));
    let mut builder = CalendarEngine::builder()
        .with_store(store)
        .with_month_change_sink(Box::new(LoggingSink));
    if let Some(start) = config.start_date {
        builder = builder.starting_at(start);
    }
    let mut engine = builder.build()?;
    engine.wait_for_idle();

    render_month(&mut engine);
    repl(&mut engine)
}

fn repl(engine: &mut CalendarEngine) -> Result<()> {
    let stdin = io::stdin();
    loop {
        print!("memoria> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = line.trim();
        match command {
            "q" | "quit" => return Ok(()),
            "n" | "next" => {
                engine.step_month(1);
                engine.wait_for_idle();
                render_month(engine);
            }
            "p" | "prev" => {
                engine.step_month(-1);
                engine.wait_for_idle();
                render_month(engine);
            }
            "" => {}
            other => {
                if let Some(raw) = other.strip_prefix("g ") {
                    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
                        Ok(date) => {
                            engine.set_selected_date(date);
                            engine.wait_for_idle();
                            render_month(engine);
                        }
                        Err(_) => println!("expected: g YYYY-MM-DD"),
                    }
                } else {
                    println!("commands: n(ext), p(rev), g YYYY-MM-DD, q(uit)");
                }
            }
        }
    }
}

fn render_month(engine: &mut CalendarEngine) {
    let month = engine.selected_month();
    println!();
    println!("      {}", month.format("%B %Y"));
    println!("  Mo  Tu  We  Th  Fr  Sa  Su");

    let cells = engine.days_in_selected_month();
    for (position, cell) in cells.iter().enumerate() {
        match cell {
            None => print!("    "),
            Some(date) => {
                let marker = if engine.events_on(*date).is_empty() {
                    ' '
                } else {
                    '*'
                };
                print!(" {:>2}{}", date.day(), marker);
            }
        }
        if position % 7 == 6 {
            println!();
        }
    }
    if cells.len() % 7 != 0 {
        println!();
    }

    let mut listed = false;
    for cell in cells.iter().flatten() {
        for event in engine.events_on(*cell) {
            println!("  {}  {}", cell, event.id());
            listed = true;
        }
    }
    if !listed {
        println!("  no events this month");
    }
}

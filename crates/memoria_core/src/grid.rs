use chrono::{Datelike, Duration, NaiveDate};

/// Number of cells in the wide prefetch window: six full display weeks.
pub const WIDE_GRID_LEN: usize = 42;

/// First day of the month containing `date`. Cache keys and pipeline run
/// targets are always month keys.
pub fn month_key(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("first of month always exists")
}

/// Cells for rendering a single month: leading blanks (Monday-based weekday
/// offset of the first, 0..=6), then one cell per day of the month.
pub fn narrow_grid(reference: NaiveDate) -> Vec<Option<NaiveDate>> {
    let first = month_key(reference);
    let blanks = first.weekday().num_days_from_monday() as usize;
    let days = days_in_month(first);
    let mut cells: Vec<Option<NaiveDate>> = Vec::with_capacity(blanks + days as usize);
    cells.resize(blanks, None);
    for offset in 0..days {
        cells.push(Some(first + Duration::days(offset)));
    }
    cells
}

/// The 42 consecutive days backing a rendered month page, starting at the
/// Monday of the week containing the first of the month. Always spills into
/// at least one adjacent month; used purely for event prefetch.
pub fn wide_grid(reference: NaiveDate) -> Vec<NaiveDate> {
    let first = month_key(reference);
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_monday()));
    (0..WIDE_GRID_LEN as i64)
        .map(|offset| start + Duration::days(offset))
        .collect()
}

fn days_in_month(first: NaiveDate) -> i64 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .expect("first of month always exists");
    (next - first).num_days()
}

use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Accepted date-string formats, tried in order. Year-less forms are valid:
/// only the month/day position matters for a recurring anniversary.
const ACCEPTED_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%B %d", "%m/%d/%Y", "%m/%d"];

/// A fixed recurring calendar position (month and day, no year).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Anchor {
    pub month: u32,
    pub day: u32,
}

impl Anchor {
    /// True when the month/day pair names a real calendar position.
    /// Checked against a leap year so Feb 29 anchors are accepted.
    pub fn is_valid(self) -> bool {
        NaiveDate::from_ymd_opt(2000, self.month, self.day).is_some()
    }
}

/// Parse a free-form date string into an anchor using the ordered format
/// list. Returns `None` for anything that matches no format; callers treat
/// that as "no event of this kind", never as an error.
pub fn parse_anchor(raw: &str) -> Option<Anchor> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ACCEPTED_FORMATS {
        let mut parsed = Parsed::new();
        if parse(&mut parsed, trimmed, StrftimeItems::new(format)).is_err() {
            continue;
        }
        if let (Some(month), Some(day)) = (parsed.month(), parsed.day()) {
            let anchor = Anchor { month, day };
            if anchor.is_valid() {
                return Some(anchor);
            }
        }
    }
    None
}

/// Next calendar date on or after `reference` matching the anchor.
///
/// Same-day is inclusive: an anchor equal to the reference month/day occurs
/// on the reference date itself, not a year later. Feb 29 anchors clamp to
/// Feb 28 in non-leap candidate years, so the anniversary is still observed
/// annually. Returns `None` only for anchors that are not valid positions.
pub fn next_occurrence(anchor: Anchor, reference: NaiveDate) -> Option<NaiveDate> {
    if !anchor.is_valid() {
        return None;
    }
    let mut year = reference.year();
    if anchor.month < reference.month()
        || (anchor.month == reference.month() && anchor.day < reference.day())
    {
        year += 1;
    }
    occurrence_in_year(year, anchor)
}

fn occurrence_in_year(year: i32, anchor: Anchor) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, anchor.month, anchor.day).or_else(|| {
        if anchor.month == 2 && anchor.day == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

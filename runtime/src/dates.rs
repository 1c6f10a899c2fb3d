//! Target date intake.

use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Wire format for dates, both inbound and in `rentalDate`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse caller-supplied date strings into a sorted, deduplicated list.
///
/// Each input may hold several comma-separated dates. Entries that are not
/// `YYYY-MM-DD` are dropped with a warning rather than failing the request.
pub fn parse_target_dates<S: AsRef<str>>(raw: &[S]) -> Vec<NaiveDate> {
    let mut dates = BTreeSet::new();
    for chunk in raw {
        for piece in chunk.as_ref().split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            match NaiveDate::parse_from_str(piece, DATE_FORMAT) {
                Ok(d) => {
                    dates.insert(d);
                }
                Err(e) => tracing::warn!("ignoring date '{piece}': {e}"),
            }
        }
    }
    dates.into_iter().collect()
}

/// Format a date the way the schedule application and the report expect.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

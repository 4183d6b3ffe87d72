//! Date range selection over loaded records.

use counts_core::models::{DateRange, SessionRecord};

/// Rows with a non-null `created` inside `range` (inclusive), in input order.
///
/// An inverted range (`start > end`) selects nothing.
pub fn filter_by_range<'a>(records: &'a [SessionRecord], range: &DateRange) -> Vec<&'a SessionRecord> {
    if range.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|record| record.created.is_some_and(|ts| range.contains(ts)))
        .collect()
}

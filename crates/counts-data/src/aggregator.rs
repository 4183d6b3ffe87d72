//! First-visited page aggregation over a filtered set of records.

use std::collections::HashMap;

use counts_core::models::{AggregationEntry, SessionRecord};
use counts_core::origin::serialized_page_pattern;

// ── AggregateSummary ──────────────────────────────────────────────────────────

/// Totals over one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateSummary {
    /// Filtered rows fed into the pass.
    pub rows: usize,
    /// Rows carrying at least one first-visited page.
    pub rows_with_pages: usize,
    /// Page occurrences across all rows (sum of `origin_count`).
    pub total_occurrences: u64,
    /// Distinct base URLs (number of entries).
    pub distinct_urls: usize,
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Result of [`UrlAggregator::aggregate`]: entries in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub entries: Vec<AggregationEntry>,
    pub summary: AggregateSummary,
}

/// Running per-URL counters, keyed by URL with a stable encounter order.
#[derive(Default)]
struct UrlTally<'a> {
    index: HashMap<&'a str, usize>,
    entries: Vec<AggregationEntry>,
}

impl<'a> UrlTally<'a> {
    /// Slot for `url`, creating a zeroed entry on first sight.
    fn slot(&mut self, url: &'a str) -> usize {
        if let Some(&slot) = self.index.get(url) {
            return slot;
        }
        self.entries.push(AggregationEntry::new(url));
        let slot = self.entries.len() - 1;
        self.index.insert(url, slot);
        slot
    }

    /// Add one row's pages: global frequency plus the repeat buckets.
    fn add_row(&mut self, pages: &'a [String]) {
        let mut within_row: HashMap<usize, u64> = HashMap::new();
        let mut seen_order: Vec<usize> = Vec::new();
        for url in pages {
            let slot = self.slot(url);
            self.entries[slot].origin_count += 1;
            let count = within_row.entry(slot).or_insert(0);
            if *count == 0 {
                seen_order.push(slot);
            }
            *count += 1;
        }

        for slot in seen_order {
            let entry = &mut self.entries[slot];
            match within_row[&slot] {
                2 => entry.times_2 += 1,
                3 => entry.times_3 += 1,
                4 => entry.times_4 += 1,
                _ => {}
            }
        }
    }
}

// ── UrlAggregator ─────────────────────────────────────────────────────────────

/// Stateless helper that counts first-visited pages across rows.
pub struct UrlAggregator;

impl UrlAggregator {
    /// Aggregate `rows` into one entry per distinct base URL.
    ///
    /// 1. `origin_count` is the total number of occurrences.
    /// 2. `times_2` / `times_3` / `times_4` count rows in which the URL
    ///    appears exactly that many times.
    /// 3. `last_origin_count` counts rows whose `Last Origin` text contains
    ///    `'firstVisitedPage': '<url>'` verbatim.
    ///
    /// Entries come back in first-encounter order; sorting is left to the
    /// caller.
    pub fn aggregate(rows: &[&SessionRecord]) -> Aggregation {
        let mut tally = UrlTally::default();
        let mut rows_with_pages = 0;
        for row in rows {
            if !row.first_visited_pages.is_empty() {
                rows_with_pages += 1;
            }
            tally.add_row(&row.first_visited_pages);
        }

        let mut entries = tally.entries;
        for entry in &mut entries {
            entry.last_origin_count = Self::count_last_origin_mentions(rows, &entry.url);
        }

        let summary = AggregateSummary {
            rows: rows.len(),
            rows_with_pages,
            total_occurrences: entries.iter().map(|e| e.origin_count).sum(),
            distinct_urls: entries.len(),
        };
        Aggregation { entries, summary }
    }

    /// Same as [`UrlAggregator::aggregate`] over every record of a slice.
    pub fn aggregate_all(records: &[SessionRecord]) -> Aggregation {
        let rows: Vec<&SessionRecord> = records.iter().collect();
        Self::aggregate(&rows)
    }

    /// Rows whose `Last Origin` text mentions `url` in serialized form.
    pub fn count_last_origin_mentions(rows: &[&SessionRecord], url: &str) -> u64 {
        let pattern = serialized_page_pattern(url);
        rows.iter()
            .filter(|row| row.last_origin.contains(&pattern))
            .count() as u64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

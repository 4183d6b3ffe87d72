//! Report pipeline for page-counts.
//!
//! A [`ReportSession`] owns the loaded records and re-runs filter, aggregate
//! and sort for every range it is asked about. Nothing is cached between
//! runs, so the same range always produces the same report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use counts_core::error::Result;
use counts_core::models::{AggregationEntry, DateRange};
use counts_core::time_utils::TimestampParser;
use tracing::debug;

use crate::aggregator::{AggregateSummary, UrlAggregator};
use crate::export::sort_entries;
use crate::filter::filter_by_range;
use crate::loader::{load_records_from_path, LoadStats, RecordSet};

// ── Public types ──────────────────────────────────────────────────────────────

/// One computed table for one range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReport {
    /// The range the rows were filtered with; `None` when no range could be
    /// resolved (every timestamp null and no explicit bounds).
    pub range: Option<DateRange>,
    /// Entries sorted by `origin_count` descending.
    pub entries: Vec<AggregationEntry>,
    pub summary: AggregateSummary,
}

impl UrlReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The loaded export plus everything needed to report on it.
#[derive(Debug, Clone)]
pub struct ReportSession {
    source: Option<PathBuf>,
    records: RecordSet,
    parser: TimestampParser,
}

impl ReportSession {
    /// Load `path` and wrap it in a session.
    pub fn open(path: &Path, parser: TimestampParser) -> Result<Self> {
        let records = load_records_from_path(path, &parser)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            records,
            parser,
        })
    }

    /// Wrap an already loaded record set.
    pub fn from_records(records: RecordSet, parser: TimestampParser) -> Self {
        Self {
            source: None,
            records,
            parser,
        }
    }

    /// File the records came from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Short label for display: the file name, or `"<memory>"`.
    pub fn source_label(&self) -> String {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    pub fn parser(&self) -> &TimestampParser {
        &self.parser
    }

    pub fn load_stats(&self) -> &LoadStats {
        &self.records.stats
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Min / max `Created` over the whole file.
    pub fn default_range(&self) -> Option<DateRange> {
        self.records.default_range
    }

    /// Combine explicit bounds with the defaults. Each omitted bound falls
    /// back to the matching default; `None` if either side stays unknown.
    pub fn resolve_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Option<DateRange> {
        let default = self.default_range();
        let start = start.or(default.map(|r| r.start))?;
        let end = end.or(default.map(|r| r.end))?;
        Some(DateRange::new(start, end))
    }

    /// Filter, aggregate and sort for `range`.
    pub fn compute(&self, range: Option<DateRange>) -> UrlReport {
        let rows = match range {
            Some(range) => filter_by_range(&self.records.records, &range),
            None => Vec::new(),
        };
        let aggregation = UrlAggregator::aggregate(&rows);
        let entries = sort_entries(aggregation.entries);

        match range {
            Some(r) => debug!(
                "Range {} .. {}: {} rows, {} distinct URLs",
                self.parser.format_local(r.start),
                self.parser.format_local(r.end),
                rows.len(),
                entries.len()
            ),
            None => debug!("No range resolved; report is empty"),
        }

        UrlReport {
            range,
            entries,
            summary: aggregation.summary,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

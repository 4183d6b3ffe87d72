use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Header of the timestamp column.
pub const CREATED_COLUMN: &str = "Created";
/// Header of the column carrying the serialized first-visited-page events.
pub const ORIGIN_COLUMN: &str = "Origin";
/// Header of the free-text column cross-referenced against `Origin`.
pub const LAST_ORIGIN_COLUMN: &str = "Last Origin";

/// Export / display column headers, in output order.
pub const REPORT_COLUMNS: [&str; 6] = [
    "URL",
    "Origin",
    "2 Times",
    "3 Times",
    "4 Times",
    "Last Origin Count",
];

/// One input record from the uploaded session export.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// `Created` coerced to UTC; `None` when the cell could not be parsed.
    pub created: Option<DateTime<Utc>>,
    /// Raw `Origin` text.
    pub origin: String,
    /// Raw `Last Origin` text.
    pub last_origin: String,
    /// Base URLs extracted from `origin`, in order, duplicates preserved.
    pub first_visited_pages: Vec<String>,
}

/// One output row per distinct base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationEntry {
    #[serde(rename = "URL")]
    pub url: String,
    /// Total occurrences across every filtered row.
    #[serde(rename = "Origin")]
    pub origin_count: u64,
    /// Rows in which the URL appears exactly twice.
    #[serde(rename = "2 Times")]
    pub times_2: u64,
    /// Rows in which the URL appears exactly three times.
    #[serde(rename = "3 Times")]
    pub times_3: u64,
    /// Rows in which the URL appears exactly four times.
    #[serde(rename = "4 Times")]
    pub times_4: u64,
    /// Rows whose `Last Origin` text mentions the URL's serialized pattern.
    #[serde(rename = "Last Origin Count")]
    pub last_origin_count: u64,
}

impl AggregationEntry {
    /// A zeroed entry for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            origin_count: 0,
            times_2: 0,
            times_3: 0,
            times_4: 0,
            last_origin_count: 0,
        }
    }
}

/// Inclusive timestamp window used to select rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `true` when `ts` lies within `[start, end]`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// A window whose start is after its end selects nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Move the lower bound by `days` (negative moves it earlier).
    pub fn shift_start(self, days: i64) -> Self {
        Self {
            start: self.start + Duration::days(days),
            end: self.end,
        }
    }

    /// Move the upper bound by `days` (negative moves it earlier).
    pub fn shift_end(self, days: i64) -> Self {
        Self {
            start: self.start,
            end: self.end + Duration::days(days),
        }
    }
}

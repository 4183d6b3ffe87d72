//! CSV loading for page-counts.
//!
//! Reads the uploaded session export, checks that the three columns the
//! pipeline needs are present and converts every row into a
//! [`SessionRecord`] with its `Created` timestamp coerced and its
//! first-visited pages already extracted.

use std::path::Path;

use chrono::{DateTime, Utc};
use counts_core::error::{CountsError, Result};
use counts_core::models::{
    DateRange, SessionRecord, CREATED_COLUMN, LAST_ORIGIN_COLUMN, ORIGIN_COLUMN,
};
use counts_core::origin::decode_origin;
use counts_core::time_utils::TimestampParser;
use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info};

/// Text substituted for missing and NA-like cells in the text columns.
pub const MISSING_TEXT: &str = "nan";

/// Cell contents treated as missing values, as spreadsheet exports write them.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const UTF8_BOM: char = '\u{feff}';

// ── Public types ──────────────────────────────────────────────────────────────

/// Counters gathered while loading, reported once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read (header excluded).
    pub rows: usize,
    /// Rows whose `Created` value could not be parsed.
    pub null_timestamps: usize,
    /// Rows whose `Origin` text is not a literal at all.
    pub malformed_origins: usize,
    /// Rows yielding at least one first-visited page.
    pub rows_with_pages: usize,
    /// Rows carrying more fields than the header.
    pub oversized_rows: usize,
}

/// Every row of one export plus the range its timestamps span.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<SessionRecord>,
    /// Min / max of the non-null `Created` values; `None` when all are null.
    pub default_range: Option<DateRange>,
    pub stats: LoadStats,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Positions of the required columns in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    created: usize,
    origin: usize,
    last_origin: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read `path` and load it with [`load_records`].
pub fn load_records_from_path(path: &Path, parser: &TimestampParser) -> Result<RecordSet> {
    let bytes = std::fs::read(path).map_err(|source| CountsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    load_records(&bytes, parser)
}

/// Parse raw CSV bytes into a [`RecordSet`].
///
/// Fails only when the text cannot be tokenised or a required column is
/// missing. Unparseable timestamps become `None` and undecodable `Origin`
/// cells yield no pages; both are counted in [`LoadStats`].
pub fn load_records(bytes: &[u8], parser: &TimestampParser) -> Result<RecordSet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect();
    let columns = resolve_columns(&headers)?;

    let mut set = RecordSet::default();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        set.stats.rows += 1;
        if record.len() > headers.len() {
            set.stats.oversized_rows += 1;
        }

        let created = timestamp_cell(&record, columns.created, parser);
        let origin = text_cell(&record, columns.origin);
        let last_origin = text_cell(&record, columns.last_origin);

        let payload = decode_origin(&origin);
        if payload.is_malformed() {
            set.stats.malformed_origins += 1;
        }
        let first_visited_pages = payload.first_visited_pages();

        if created.is_none() {
            set.stats.null_timestamps += 1;
        }
        if !first_visited_pages.is_empty() {
            set.stats.rows_with_pages += 1;
        }

        set.records.push(SessionRecord {
            created,
            origin,
            last_origin,
            first_visited_pages,
        });
    }

    set.default_range = span_of(&set.records);
    log_stats(&set.stats);
    Ok(set)
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Locate the required columns. The `Created` check runs first.
fn resolve_columns(headers: &[String]) -> Result<ColumnIndex> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim_start_matches(UTF8_BOM) == name)
    };

    let created = find(CREATED_COLUMN).ok_or(CountsError::MissingCreatedColumn)?;
    match (find(ORIGIN_COLUMN), find(LAST_ORIGIN_COLUMN)) {
        (Some(origin), Some(last_origin)) => Ok(ColumnIndex {
            created,
            origin,
            last_origin,
        }),
        _ => Err(CountsError::MissingTextColumns),
    }
}

/// Decode one cell; `None` when the record is too short to have it.
fn cell(record: &ByteRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

fn is_na_marker(text: &str) -> bool {
    NA_MARKERS.contains(&text)
}

/// Text column value: missing and NA-like cells become `"nan"`.
fn text_cell(record: &ByteRecord, index: usize) -> String {
    match cell(record, index) {
        Some(text) if !is_na_marker(&text) => text,
        _ => MISSING_TEXT.to_string(),
    }
}

fn timestamp_cell(
    record: &ByteRecord,
    index: usize,
    parser: &TimestampParser,
) -> Option<DateTime<Utc>> {
    let text = cell(record, index)?;
    if is_na_marker(text.trim()) {
        return None;
    }
    parser.parse(&text)
}

/// Earliest and latest non-null `created` values.
fn span_of(records: &[SessionRecord]) -> Option<DateRange> {
    let mut stamps = records.iter().filter_map(|r| r.created);
    let first = stamps.next()?;
    let (start, end) = stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    Some(DateRange::new(start, end))
}

fn log_stats(stats: &LoadStats) {
    info!(
        "Loaded {} rows ({} with first-visited pages)",
        stats.rows, stats.rows_with_pages
    );
    if stats.null_timestamps > 0 {
        debug!(
            "{} rows have an unparseable Created value and fall outside every range",
            stats.null_timestamps
        );
    }
    if stats.malformed_origins > 0 {
        debug!(
            "{} rows have an Origin value that is not a literal",
            stats.malformed_origins
        );
    }
    if stats.oversized_rows > 0 {
        debug!(
            "{} rows carry more fields than the header; extras ignored",
            stats.oversized_rows
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use std::io::Write;
    use tempfile::TempDir;

    fn utc_parser() -> TimestampParser {
        TimestampParser::new("UTC")
    }

    fn load(text: &str) -> Result<RecordSet> {
        load_records(text.as_bytes(), &utc_parser())
    }

    fn write_csv(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    const SAMPLE: &str = "\
Id,Created,Origin,Last Origin
1,2024-01-01 09:00:00,\"{'firstVisitedPage': '/a?x=1'}\",\"{'firstVisitedPage': '/a'}\"
2,2024-01-03 12:30:00,\"[{'firstVisitedPage': '/b'}, {'firstVisitedPage': '/b'}]\",
3,2024-01-02 18:00:00,not a literal,nothing
";

    // ── Column checks ─────────────────────────────────────────────────────────

    #[test]
    fn test_missing_created_column() {
        let err = load("Origin,Last Origin\nx,y\n").unwrap_err();
        assert!(matches!(err, CountsError::MissingCreatedColumn));
        assert_eq!(
            err.to_string(),
            "The uploaded CSV must contain a 'Created' column."
        );
    }

    #[test]
    fn test_created_checked_before_text_columns() {
        let err = load("Id\n1\n").unwrap_err();
        assert!(matches!(err, CountsError::MissingCreatedColumn));
    }

    #[test]
    fn test_missing_text_columns() {
        for text in ["Created,Origin\n2024-01-01,x\n", "Created,Last Origin\n2024-01-01,x\n"] {
            let err = load(text).unwrap_err();
            assert!(matches!(err, CountsError::MissingTextColumns), "{text}");
        }
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let err = load("created,Origin,Last Origin\n").unwrap_err();
        assert!(matches!(err, CountsError::MissingCreatedColumn));
    }

    // ── Row loading ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_sample() {
        let set = load(SAMPLE).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.records[0].first_visited_pages, vec!["/a"]);
        assert_eq!(set.records[1].first_visited_pages, vec!["/b", "/b"]);
        assert!(set.records[2].first_visited_pages.is_empty());
        assert_eq!(set.records[2].origin, "not a literal");
        assert_eq!(set.records[0].last_origin, "{'firstVisitedPage': '/a'}");

        assert_eq!(set.stats.rows, 3);
        assert_eq!(set.stats.rows_with_pages, 2);
        assert_eq!(set.stats.malformed_origins, 1);
        assert_eq!(set.stats.null_timestamps, 0);
    }

    #[test]
    fn test_default_range_spans_min_and_max() {
        let range = load(SAMPLE).unwrap().default_range.unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 1, 3, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_unparseable_created_becomes_none() {
        let text = "Created,Origin,Last Origin\nyesterday,x,y\n,x,y\nNaT,x,y\n2024-05-05,x,y\n";
        let set = load(text).unwrap();
        assert_eq!(set.len(), 4);
        assert!(set.records[..3].iter().all(|r| r.created.is_none()));
        assert_eq!(set.stats.null_timestamps, 3);
        let range = set.default_range.unwrap();
        assert_eq!(range.start, range.end);
        assert_eq!(range.start.day(), 5);
    }

    #[test]
    fn test_all_null_timestamps_have_no_default_range() {
        let set = load("Created,Origin,Last Origin\nnope,x,y\n").unwrap();
        assert!(set.default_range.is_none());
    }

    #[test]
    fn test_na_text_cells_become_nan() {
        let text = "Created,Origin,Last Origin\n2024-01-01,,NULL\n2024-01-01,N/A,<NA>\n";
        let set = load(text).unwrap();
        for record in &set.records {
            assert_eq!(record.origin, MISSING_TEXT);
            assert_eq!(record.last_origin, MISSING_TEXT);
            assert!(record.first_visited_pages.is_empty());
        }
    }

    #[test]
    fn test_short_rows_are_padded_and_long_rows_truncated() {
        let text = "Created,Origin,Last Origin\n2024-01-01\n2024-01-02,\"{'firstVisitedPage': '/z'}\",x,extra,more\n";
        let set = load(text).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].origin, MISSING_TEXT);
        assert_eq!(set.records[0].last_origin, MISSING_TEXT);
        assert_eq!(set.records[1].first_visited_pages, vec!["/z"]);
        assert_eq!(set.records[1].last_origin, "x");
        assert_eq!(set.stats.oversized_rows, 1);
    }

    #[test]
    fn test_header_only_file_loads_zero_rows() {
        let set = load("Created,Origin,Last Origin\n").unwrap();
        assert!(set.is_empty());
        assert!(set.default_range.is_none());
    }

    #[test]
    fn test_bom_before_header_is_ignored() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(b"Created,Origin,Last Origin\n2024-01-01 10:00:00,x,y\n");
        let set = load_records(&bytes, &utc_parser()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].created.unwrap().hour(), 10);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_lossily() {
        let mut bytes = b"Created,Origin,Last Origin\n2024-01-01,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",y\n");
        let set = load_records(&bytes, &utc_parser()).unwrap();
        assert_eq!(set.records[0].origin, "\u{fffd}\u{fffd}");
    }

    #[test]
    fn test_naive_timestamps_use_parser_zone() {
        let parser = TimestampParser::new("Europe/Berlin");
        let set = load_records(
            b"Created,Origin,Last Origin\n2024-01-15 10:00:00,x,y\n",
            &parser,
        )
        .unwrap();
        assert_eq!(set.records[0].created.unwrap().hour(), 9);
    }

    #[test]
    fn test_multiline_quoted_cells() {
        let text = "Created,Origin,Last Origin\n2024-01-01,\"[{'firstVisitedPage': '/a'},\n {'firstVisitedPage': '/b'}]\",y\n";
        let set = load(text).unwrap();
        assert_eq!(set.records[0].first_visited_pages, vec!["/a", "/b"]);
    }

    // ── load_records_from_path ────────────────────────────────────────────────

    #[test]
    fn test_load_from_path() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(dir.path(), "sessions.csv", SAMPLE.as_bytes());
        let set = load_records_from_path(&path, &utc_parser()).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.default_range.unwrap().start.year(), 2024);
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        match load_records_from_path(&path, &utc_parser()) {
            Err(CountsError::FileRead { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected FileRead, got {other:?}"),
        }
    }
}

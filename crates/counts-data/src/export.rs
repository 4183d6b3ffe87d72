//! Result table ordering and serialization.
//!
//! The export is a plain CSV with the [`REPORT_COLUMNS`] header, `\n`
//! record terminators and minimal quoting. JSON output carries the same rows
//! under the same column names.

use std::io::{Read, Write};
use std::path::Path;

use counts_core::error::{CountsError, Result};
use counts_core::models::{AggregationEntry, REPORT_COLUMNS};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use tracing::{debug, info};

/// MIME type offered alongside the export.
pub const EXPORT_MIME_TYPE: &str = "text/csv";

/// Order entries by `origin_count`, highest first. Ties keep their incoming
/// (first-encounter) order.
pub fn sort_entries(mut entries: Vec<AggregationEntry>) -> Vec<AggregationEntry> {
    entries.sort_by(|a, b| b.origin_count.cmp(&a.origin_count));
    entries
}

/// Write `entries` as CSV, header first, into any writer.
pub fn write_csv<W: Write>(entries: &[AggregationEntry], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);

    // Written explicitly so an empty table still carries its header.
    csv_writer.write_record(REPORT_COLUMNS)?;
    for entry in entries {
        csv_writer.serialize(entry)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// The export as UTF-8 bytes.
pub fn to_csv_bytes(entries: &[AggregationEntry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(entries, &mut buf)?;
    Ok(buf)
}

/// Write the export to `path` atomically (temp file, then rename).
pub fn write_export_file(entries: &[AggregationEntry], path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(entries)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write_result = std::fs::File::create(&tmp_path).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(e) = write_result.and_then(|_| std::fs::rename(&tmp_path, path)) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(CountsError::Io(e));
    }

    info!(
        "Exported {} rows ({} bytes, {}) to {}",
        entries.len(),
        bytes.len(),
        EXPORT_MIME_TYPE,
        path.display()
    );
    Ok(())
}

/// Parse an export back into entries.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<AggregationEntry>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if !headers.iter().eq(REPORT_COLUMNS.iter().copied()) {
        debug!("Export header differs from the expected columns: {:?}", headers);
    }

    let mut entries = Vec::new();
    for row in csv_reader.deserialize() {
        entries.push(row?);
    }
    Ok(entries)
}

/// The rows as a pretty-printed JSON array keyed by the column names.
pub fn to_json(entries: &[AggregationEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

mod bootstrap;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use counts_core::error::CountsError;
use counts_core::formatting::format_count;
use counts_core::settings::Settings;
use counts_data::analysis::{ReportSession, UrlReport};
use counts_data::export::{to_json, write_export_file};
use counts_ui::app::App;
use counts_ui::components::header::{Header, RangeLabel};
use counts_ui::table_view::format_plain_table;
use counts_ui::themes::Theme;

fn main() -> ExitCode {
    let settings = Settings::load();

    if let Err(e) = bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref()) {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            let is_schema_error = e
                .downcast_ref::<CountsError>()
                .is_some_and(CountsError::is_schema_error);
            if is_schema_error {
                eprintln!("{e}");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(1)
        }
    }
}

fn run(settings: &Settings) -> Result<()> {
    tracing::info!("page-counts v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, View: {}, Timezone: {}",
        settings.input.display(),
        settings.view,
        settings.timezone
    );

    settings.validate()?;
    let (start, end) = settings.date_bounds()?;
    let session = ReportSession::open(&settings.input, settings.timestamp_parser())?;
    let range = session.resolve_range(start, end);

    if settings.is_interactive() {
        let app = App::new(
            session,
            range,
            &settings.theme,
            settings.timezone.clone(),
            settings.output.clone(),
        );
        app.run().map_err(|e| CountsError::Terminal(e.to_string()))?;
        return Ok(());
    }

    let report = session.compute(range);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_plain(&mut out, settings, &session, &report)?;
    out.flush()?;

    if !settings.no_export {
        // The export always carries the full table, whatever --top says.
        write_export_file(&report.entries, &settings.output)?;
        eprintln!(
            "Exported {} rows to {}",
            format_count(report.entries.len() as u64),
            settings.output.display()
        );
    }
    Ok(())
}

/// Plain view: header and table, or the JSON rows with `--json`.
fn write_plain<W: Write>(
    out: &mut W,
    settings: &Settings,
    session: &ReportSession,
    report: &UrlReport,
) -> Result<()> {
    let limit = settings.top.map(|n| n as usize);

    if settings.json {
        let len = report.entries.len();
        let shown = &report.entries[..limit.map_or(len, |n| n.min(len))];
        writeln!(out, "{}", to_json(shown)?)?;
        return Ok(());
    }

    let theme = Theme::classic();
    let source = session.source_label();
    let header = Header::new(
        &source,
        &settings.timezone,
        report.range.map(|r| RangeLabel::new(&r, session.parser())),
        report.summary,
        session.record_count(),
        &theme,
    );
    writeln!(out, "{}", header.to_plain_text())?;
    write!(out, "{}", format_plain_table(&report.entries, limit))?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

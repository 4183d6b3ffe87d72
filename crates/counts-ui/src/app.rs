//! Interactive report view and its event loop.
//!
//! [`App`] owns the loaded [`ReportSession`], the selected range and the
//! last computed report. Every range key re-runs the pipeline; nothing else
//! is cached.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use counts_core::formatting::format_count;
use counts_core::models::DateRange;
use counts_data::analysis::{ReportSession, UrlReport};
use counts_data::export::write_export_file;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Paragraph, TableState},
    Frame, Terminal,
};
use tracing::{debug, info, warn};

use crate::components::header::{Header, RangeLabel};
use crate::table_view;
use crate::themes::Theme;

/// Rows moved by PgUp / PgDn before the first frame reports a real height.
const DEFAULT_PAGE: usize = 10;

/// One-line feedback shown in the footer until the next key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub theme: Theme,
    session: ReportSession,
    timezone: String,
    /// Currently selected range; `None` when the file has no timestamps.
    pub range: Option<DateRange>,
    pub report: UrlReport,
    pub table_state: TableState,
    pub export_path: PathBuf,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
    page_size: usize,
}

impl App {
    /// Build the app and compute the first report for `range`.
    pub fn new(
        session: ReportSession,
        range: Option<DateRange>,
        theme_name: &str,
        timezone: String,
        export_path: PathBuf,
    ) -> Self {
        let report = session.compute(range);
        let mut app = Self {
            theme: Theme::from_name(theme_name),
            session,
            timezone,
            range,
            report,
            table_state: TableState::default(),
            export_path,
            status: None,
            should_quit: false,
            page_size: DEFAULT_PAGE,
        };
        app.clamp_selection();
        app
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the interactive view until the user quits.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout so the loop keeps
    /// redrawing after terminal resizes.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.status = None;

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,

            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-(self.page_size as isize)),
            KeyCode::PageDown => self.move_selection(self.page_size as isize),
            KeyCode::Home => self.move_selection(isize::MIN / 2),
            KeyCode::End => self.move_selection(isize::MAX / 2),

            KeyCode::Char('[') => self.shift_range(|r| r.shift_start(-1)),
            KeyCode::Char(']') => self.shift_range(|r| r.shift_start(1)),
            KeyCode::Char('{') => self.shift_range(|r| r.shift_end(-1)),
            KeyCode::Char('}') => self.shift_range(|r| r.shift_end(1)),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset_range(),

            KeyCode::Char('s') | KeyCode::Char('S') => self.save_export(),
            _ => {}
        }
    }

    /// Write the current table to the export path and report the outcome in
    /// the footer.
    pub fn save_export(&mut self) {
        match write_export_file(&self.report.entries, &self.export_path) {
            Ok(()) => {
                self.status = Some(StatusMessage {
                    text: format!(
                        "Saved {} rows to {}",
                        format_count(self.report.entries.len() as u64),
                        self.export_path.display()
                    ),
                    is_error: false,
                });
            }
            Err(e) => {
                warn!("Export to {} failed: {}", self.export_path.display(), e);
                self.status = Some(StatusMessage {
                    text: format!("Export failed: {e}"),
                    is_error: true,
                });
            }
        }
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn shift_range(&mut self, shift: impl FnOnce(DateRange) -> DateRange) {
        match self.range {
            Some(range) => self.set_range(Some(shift(range))),
            None => {
                self.status = Some(StatusMessage {
                    text: "No timestamps to select a range from".to_string(),
                    is_error: true,
                });
            }
        }
    }

    /// Back to the full span of the file.
    fn reset_range(&mut self) {
        self.set_range(self.session.default_range());
    }

    fn set_range(&mut self, range: Option<DateRange>) {
        self.range = range;
        self.report = self.session.compute(range);
        self.clamp_selection();
        debug!(
            "Range changed; {} URLs in {} rows",
            self.report.entries.len(),
            self.report.summary.rows
        );
        if range.is_some_and(|r| r.is_empty()) {
            info!("Selected range starts after it ends; nothing to show");
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.report.entries.len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            let current = self.table_state.selected().unwrap_or(0);
            self.table_state.select(Some(current.min(len - 1)));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.report.entries.len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = current.saturating_add(delta).clamp(0, len as isize - 1);
        self.table_state.select(Some(next as usize));
    }

    fn render(&mut self, frame: &mut Frame) {
        let [header_area, table_area, footer_area] = Layout::vertical([
            Constraint::Length(Header::HEIGHT),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let source = self.session.source_label();
        let range_label = self
            .range
            .map(|r| RangeLabel::new(&r, self.session.parser()));
        let header = Header::new(
            &source,
            &self.timezone,
            range_label,
            self.report.summary,
            self.session.record_count(),
            &self.theme,
        );
        frame.render_widget(Paragraph::new(header.to_lines()), header_area);

        // Borders and the header row.
        self.page_size = (table_area.height.saturating_sub(3) as usize).max(1);

        if self.report.is_empty() {
            let reason = match self.range {
                None => "The file has no parseable Created timestamps.".to_string(),
                Some(r) if r.is_empty() => "The start of the range is after its end.".to_string(),
                Some(_) => format!(
                    "The range selects {} rows.",
                    format_count(self.report.summary.rows as u64)
                ),
            };
            table_view::render_no_data(frame, table_area, &reason, &self.theme);
        } else {
            table_view::render_report_table(
                frame,
                table_area,
                &self.report.entries,
                &mut self.table_state,
                &self.theme,
            );
        }

        frame.render_widget(Paragraph::new(self.footer_line()), footer_area);
    }

    fn footer_line(&self) -> Line<'static> {
        if let Some(status) = &self.status {
            let style = if status.is_error {
                self.theme.error
            } else {
                self.theme.success
            };
            return Line::from(Span::styled(status.text.clone(), style));
        }

        let keys = [
            ("↑↓", "scroll"),
            ("[ ]", "start ±1d"),
            ("{ }", "end ±1d"),
            ("r", "reset"),
            ("s", "save"),
            ("q", "quit"),
        ];
        let mut spans = Vec::with_capacity(keys.len() * 2);
        for (key, help) in keys {
            spans.push(Span::styled(key, self.theme.key));
            spans.push(Span::styled(format!(" {help}  "), self.theme.key_help));
        }
        Line::from(spans)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use counts_core::time_utils::TimestampParser;
    use counts_data::export::read_csv;
    use counts_data::loader::load_records;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
Created,Origin,Last Origin
2024-01-01 10:00:00,\"{'firstVisitedPage': '/a'}\",\"{'firstVisitedPage': '/a'}\"
2024-01-02 10:00:00,\"[{'firstVisitedPage': '/b'}, {'firstVisitedPage': '/b'}]\",nan
2024-01-03 10:00:00,\"{'firstVisitedPage': '/c'}\",nan
2024-01-04 10:00:00,\"{'firstVisitedPage': '/b'}\",nan
";

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap()
    }

    fn make_app(text: &str, export_path: PathBuf) -> App {
        let parser = TimestampParser::new("UTC");
        let records = load_records(text.as_bytes(), &parser).unwrap();
        let session = ReportSession::from_records(records, parser);
        let range = session.default_range();
        App::new(session, range, "dark", "UTC".to_string(), export_path)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn urls(app: &App) -> Vec<&str> {
        app.report.entries.iter().map(|e| e.url.as_str()).collect()
    }

    // ── App::new ──────────────────────────────────────────────────────────────

    #[test]
    fn test_new_computes_initial_report() {
        let app = make_app(SAMPLE, PathBuf::from("out.csv"));
        assert_eq!(urls(&app), vec!["/b", "/a", "/c"]);
        assert_eq!(app.table_state.selected(), Some(0));
        assert!(!app.should_quit);
        assert!(app.status.is_none());
        assert_eq!(app.export_path(), Path::new("out.csv"));
    }

    #[test]
    fn test_new_without_rows_has_no_selection() {
        let app = make_app("Created,Origin,Last Origin\n", PathBuf::from("out.csv"));
        assert!(app.report.is_empty());
        assert!(app.range.is_none());
        assert_eq!(app.table_state.selected(), None);
    }

    // ── Quit keys ─────────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
            press(&mut app, code);
            assert!(app.should_quit, "{code:?}");
        }

        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        app.handle_key(key);
        assert!(!app.should_quit);
    }

    // ── Scrolling ─────────────────────────────────────────────────────────────

    #[test]
    fn test_selection_moves_and_clamps() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.table_state.selected(), Some(1));
        press(&mut app, KeyCode::End);
        assert_eq!(app.table_state.selected(), Some(2));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.table_state.selected(), Some(2));
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.table_state.selected(), Some(0));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.table_state.selected(), Some(0));
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.table_state.selected(), Some(2));
        press(&mut app, KeyCode::Home);
        assert_eq!(app.table_state.selected(), Some(0));
    }

    // ── Range keys ────────────────────────────────────────────────────────────

    #[test]
    fn test_shift_start_recomputes() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.range.unwrap().start, ts(2));
        assert_eq!(urls(&app), vec!["/b", "/c"]);

        press(&mut app, KeyCode::Char('['));
        assert_eq!(app.range.unwrap().start, ts(1));
        assert_eq!(urls(&app), vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn test_shift_end_recomputes() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        press(&mut app, KeyCode::Char('{'));
        press(&mut app, KeyCode::Char('{'));
        assert_eq!(app.range.unwrap().end, ts(2));
        assert_eq!(urls(&app), vec!["/b", "/a"]);
        assert_eq!(app.report.entries[0].times_2, 1);

        press(&mut app, KeyCode::Char('}'));
        assert_eq!(app.range.unwrap().end, ts(3));
    }

    #[test]
    fn test_inverted_range_empties_table() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        for _ in 0..4 {
            press(&mut app, KeyCode::Char('{'));
        }
        assert!(app.range.unwrap().is_empty());
        assert!(app.report.is_empty());
        assert_eq!(app.table_state.selected(), None);
    }

    #[test]
    fn test_reset_restores_full_range() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('{'));
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.range, Some(DateRange::new(ts(1), ts(4))));
        assert_eq!(urls(&app), vec!["/b", "/a", "/c"]);
    }

    #[test]
    fn test_selection_clamped_after_recompute() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        press(&mut app, KeyCode::End);
        assert_eq!(app.table_state.selected(), Some(2));
        press(&mut app, KeyCode::Char(']'));
        assert_eq!(app.table_state.selected(), Some(1));
    }

    #[test]
    fn test_range_keys_without_timestamps_set_status() {
        let mut app = make_app("Created,Origin,Last Origin\nnever,x,y\n", PathBuf::from("out.csv"));
        press(&mut app, KeyCode::Char(']'));
        assert!(app.range.is_none());
        assert!(app.status.as_ref().is_some_and(|s| s.is_error));
        press(&mut app, KeyCode::Down);
        assert!(app.status.is_none());
    }

    // ── Export ────────────────────────────────────────────────────────────────

    #[test]
    fn test_save_export_writes_current_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filtered_url_counts.csv");
        let mut app = make_app(SAMPLE, path.clone());
        press(&mut app, KeyCode::Char(']'));
        press(&mut app, KeyCode::Char('s'));

        let status = app.status.clone().unwrap();
        assert!(!status.is_error, "{}", status.text);
        assert!(status.text.starts_with("Saved 2 rows"));

        let saved = read_csv(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(saved, app.report.entries);
    }

    #[test]
    fn test_save_export_failure_sets_error_status() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be replaced by the export file.
        let mut app = make_app(SAMPLE, dir.path().to_path_buf());
        app.save_export();
        assert!(app.status.unwrap().is_error);
    }

    // ── Render ────────────────────────────────────────────────────────────────

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_report() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        let text = draw(&mut app, 110, 20);
        assert!(text.contains("FIRST-VISITED PAGE COUNTS"));
        assert!(text.contains("[ <memory> | UTC ]"));
        assert!(text.contains("Range: 2024-01-01 10:00:00"));
        assert!(text.contains("/b"));
        assert!(text.contains("quit"));
        assert_eq!(app.page_size, 20 - 6 - 1 - 3);
    }

    #[test]
    fn test_render_empty_range() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        for _ in 0..4 {
            press(&mut app, KeyCode::Char('{'));
        }
        let text = draw(&mut app, 100, 20);
        assert!(text.contains("No first-visited pages in this range"));
        assert!(text.contains("start of the range is after its end"));
    }

    #[test]
    fn test_render_status_message() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        app.status = Some(StatusMessage {
            text: "Saved 3 rows to out.csv".to_string(),
            is_error: false,
        });
        let text = draw(&mut app, 100, 20);
        assert!(text.contains("Saved 3 rows to out.csv"));
    }

    #[test]
    fn test_render_tiny_terminal_does_not_panic() {
        let mut app = make_app(SAMPLE, PathBuf::from("out.csv"));
        draw(&mut app, 10, 4);
    }
}

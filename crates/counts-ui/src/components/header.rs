use counts_core::formatting::{format_count, format_days};
use counts_core::models::DateRange;
use counts_core::time_utils::TimestampParser;
use counts_data::aggregator::AggregateSummary;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Title shown on the first header line.
pub const TITLE: &str = "FIRST-VISITED PAGE COUNTS";

/// Width of the `=` rule under the title.
const SEPARATOR_WIDTH: usize = 60;

/// A date range rendered in the display timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeLabel {
    pub start: String,
    pub end: String,
    /// Whole days between the bounds; negative for an inverted range.
    pub days: i64,
}

impl RangeLabel {
    pub fn new(range: &DateRange, parser: &TimestampParser) -> Self {
        Self {
            start: parser.format_local(range.start),
            end: parser.format_local(range.end),
            days: (range.end - range.start).num_days(),
        }
    }
}

/// Report header rendering six lines:
///
/// 1. Title.
/// 2. A 60-column `=` separator.
/// 3. Source file and timezone in `[ file | timezone ]` format.
/// 4. The selected range, or a warning when there is none.
/// 5. Row / URL totals for the selected range.
/// 6. An empty line.
pub struct Header<'a> {
    pub source: &'a str,
    pub timezone: &'a str,
    pub range: Option<RangeLabel>,
    pub summary: AggregateSummary,
    /// Rows in the whole file, for the "N of M" figure.
    pub total_records: usize,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(
        source: &'a str,
        timezone: &'a str,
        range: Option<RangeLabel>,
        summary: AggregateSummary,
        total_records: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            source,
            timezone,
            range,
            summary,
            total_records,
            theme,
        }
    }

    /// Number of lines [`Header::to_lines`] produces.
    pub const HEIGHT: u16 = 6;

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let theme = self.theme;
        vec![
            Line::from(Span::styled(TITLE, theme.header)),
            Line::from(Span::styled("=".repeat(SEPARATOR_WIDTH), theme.separator)),
            Line::from(vec![
                Span::styled("[ ", theme.label),
                Span::styled(self.source, theme.value),
                Span::styled(" | ", theme.label),
                Span::styled(self.timezone, theme.value),
                Span::styled(" ]", theme.label),
            ]),
            self.range_line(),
            self.summary_line(),
            Line::from(""),
        ]
    }

    /// The header as plain text, one line per row, for non-interactive output.
    pub fn to_plain_text(&self) -> String {
        self.to_lines()
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn range_line(&self) -> Line<'a> {
        let theme = self.theme;
        match &self.range {
            None => Line::from(vec![
                Span::styled("Range: ", theme.label),
                Span::styled("no parseable Created timestamps", theme.warning),
            ]),
            Some(label) => {
                let span_style = if label.days < 0 { theme.error } else { theme.dim };
                let span_text = if label.days < 0 {
                    " (start is after end)".to_string()
                } else {
                    format!(" ({})", format_days(label.days))
                };
                Line::from(vec![
                    Span::styled("Range: ", theme.label),
                    Span::styled(label.start.clone(), theme.value),
                    Span::styled(" → ", theme.label),
                    Span::styled(label.end.clone(), theme.value),
                    Span::styled(span_text, span_style),
                ])
            }
        }
    }

    fn summary_line(&self) -> Line<'a> {
        let theme = self.theme;
        let s = &self.summary;
        Line::from(vec![
            Span::styled("Rows: ", theme.label),
            Span::styled(
                format!(
                    "{} of {}",
                    format_count(s.rows as u64),
                    format_count(self.total_records as u64)
                ),
                theme.value,
            ),
            Span::styled(" | With pages: ", theme.label),
            Span::styled(format_count(s.rows_with_pages as u64), theme.value),
            Span::styled(" | URLs: ", theme.label),
            Span::styled(format_count(s.distinct_urls as u64), theme.value),
            Span::styled(" | Occurrences: ", theme.label),
            Span::styled(format_count(s.total_occurrences), theme.value),
        ])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn summary() -> AggregateSummary {
        AggregateSummary {
            rows: 1_200,
            rows_with_pages: 900,
            total_occurrences: 4_321,
            distinct_urls: 17,
        }
    }

    fn label(start_day: u32, end_day: u32) -> RangeLabel {
        let range = DateRange::new(
            Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, end_day, 0, 0, 0).unwrap(),
        );
        RangeLabel::new(&range, &TimestampParser::new("UTC"))
    }

    #[test]
    fn test_header_line_count() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", Some(label(1, 31)), summary(), 5_000, &theme);
        let lines = header.to_lines();
        assert_eq!(lines.len(), Header::HEIGHT as usize);
        assert_eq!(line_text(&lines[0]), TITLE);
        assert!(line_text(&lines[5]).is_empty());
    }

    #[test]
    fn test_header_separator_line() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", None, summary(), 0, &theme);
        let sep = line_text(&header.to_lines()[1]);
        assert_eq!(sep.chars().count(), 60);
        assert!(sep.chars().all(|c| c == '='));
    }

    #[test]
    fn test_header_source_line() {
        let theme = Theme::dark();
        let header = Header::new("Sessions.csv", "Europe/Berlin", None, summary(), 0, &theme);
        assert_eq!(
            line_text(&header.to_lines()[2]),
            "[ Sessions.csv | Europe/Berlin ]"
        );
    }

    #[test]
    fn test_header_range_line() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", Some(label(1, 31)), summary(), 5_000, &theme);
        assert_eq!(
            line_text(&header.to_lines()[3]),
            "Range: 2024-01-01 00:00:00 → 2024-01-31 00:00:00 (30 days)"
        );
    }

    #[test]
    fn test_header_inverted_range_is_flagged() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", Some(label(5, 2)), summary(), 5_000, &theme);
        let lines = header.to_lines();
        assert!(line_text(&lines[3]).ends_with("(start is after end)"));
        assert_eq!(lines[3].spans[4].style, theme.error);
    }

    #[test]
    fn test_header_missing_range_warns() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", None, AggregateSummary::default(), 3, &theme);
        let lines = header.to_lines();
        assert!(line_text(&lines[3]).contains("no parseable Created timestamps"));
        assert_eq!(lines[3].spans[1].style, theme.warning);
    }

    #[test]
    fn test_header_summary_line() {
        let theme = Theme::dark();
        let header = Header::new("s.csv", "UTC", None, summary(), 5_000, &theme);
        assert_eq!(
            line_text(&header.to_lines()[4]),
            "Rows: 1,200 of 5,000 | With pages: 900 | URLs: 17 | Occurrences: 4,321"
        );
    }

    #[test]
    fn test_header_plain_text() {
        let theme = Theme::classic();
        let header = Header::new("s.csv", "UTC", Some(label(1, 2)), summary(), 5_000, &theme);
        let text = header.to_plain_text();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], TITLE);
        assert!(lines[3].ends_with("(1 day)"));
    }
}

//! URL count table for the page-counts TUI and plain output.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per URL and a
//! highlighted cursor row, plus a width-aware plain-text rendering of the
//! same rows for non-interactive use.

use counts_core::formatting::format_count;
use counts_core::models::{AggregationEntry, REPORT_COLUMNS};
use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::themes::Theme;

/// Narrowest URL column before the count columns start to squeeze it.
pub const URL_MIN_WIDTH: u16 = 20;

const ELLIPSIS: char = '…';

/// Gap between plain-text columns.
const PLAIN_GAP: &str = "  ";

/// The five count columns of one entry, in display order.
fn counts_of(entry: &AggregationEntry) -> [u64; 5] {
    [
        entry.origin_count,
        entry.times_2,
        entry.times_3,
        entry.times_4,
        entry.last_origin_count,
    ]
}

/// Largest value of each count column.
fn column_maxima(entries: &[AggregationEntry]) -> [u64; 5] {
    entries.iter().fold([0; 5], |mut acc, entry| {
        for (slot, value) in acc.iter_mut().zip(counts_of(entry)) {
            *slot = (*slot).max(value);
        }
        acc
    })
}

/// Cut `text` to at most `max_width` terminal columns, ending in `…` when
/// anything was dropped.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push(ELLIPSIS);
    out
}

/// Render the report table into `area`, keeping the selection in `state`.
pub fn render_report_table(
    frame: &mut Frame,
    area: Rect,
    entries: &[AggregationEntry],
    state: &mut TableState,
    theme: &Theme,
) {
    let count_widths: Vec<u16> = REPORT_COLUMNS[1..]
        .iter()
        .map(|header| header.width() as u16 + 2)
        .collect();
    // Borders, highlight symbol and one space between each pair of columns.
    let reserved = 2 + 2 + count_widths.len() as u16 + count_widths.iter().sum::<u16>();
    let url_width = area.width.saturating_sub(reserved).max(URL_MIN_WIDTH);

    let header = Row::new(
        REPORT_COLUMNS
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let maxima = column_maxima(entries);
    let rows: Vec<Row> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut cells = vec![Cell::from(truncate_to_width(&entry.url, url_width as usize))];
            cells.extend(
                counts_of(entry)
                    .iter()
                    .zip(maxima)
                    .map(|(&value, max)| {
                        Cell::from(Line::from(format_count(value)).right_aligned())
                            .style(theme.count_style(value, max))
                    }),
            );
            Row::new(cells).style(theme.row_style(i))
        })
        .collect();

    let mut widths = vec![Constraint::Min(url_width)];
    widths.extend(count_widths.iter().map(|w| Constraint::Length(*w)));

    let title = format!(" URLs ({}) ", format_count(entries.len() as u64));
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(title),
        )
        .row_highlight_style(theme.table_selected)
        .highlight_symbol("▶ ")
        .style(theme.text);

    frame.render_stateful_widget(table, area, state);
}

/// Render a placeholder when the selected range has no URLs.
pub fn render_no_data(frame: &mut Frame, area: Rect, reason: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No first-visited pages in this range", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(reason.to_string(), theme.dim)),
        Line::from(Span::styled(
            "Use [ ] { } to move the range, r to reset, q to exit",
            theme.dim,
        )),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" URLs (0) "),
        ),
        area,
    );
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Pad `text` to `width` display columns.
fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

/// Render entries as an aligned text table: URL left-aligned, counts
/// right-aligned, header first. `limit` keeps only the first N rows.
pub fn format_plain_table(entries: &[AggregationEntry], limit: Option<usize>) -> String {
    let shown = &entries[..limit.map_or(entries.len(), |n| n.min(entries.len()))];

    let cells: Vec<[String; 6]> = shown
        .iter()
        .map(|entry| {
            let c = counts_of(entry);
            [
                entry.url.clone(),
                c[0].to_string(),
                c[1].to_string(),
                c[2].to_string(),
                c[3].to_string(),
                c[4].to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = REPORT_COLUMNS.iter().map(|h| h.width()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.width());
        }
    }

    let render_row = |row: &[&str]| -> String {
        row.iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, &w))| pad(cell, w, col > 0))
            .collect::<Vec<_>>()
            .join(PLAIN_GAP)
            .trim_end()
            .to_string()
    };

    let mut out = render_row(&REPORT_COLUMNS);
    out.push('\n');
    for row in &cells {
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&render_row(&refs));
        out.push('\n');
    }
    if shown.len() < entries.len() {
        out.push_str(&format!(
            "… {} more rows\n",
            format_count((entries.len() - shown.len()) as u64)
        ));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

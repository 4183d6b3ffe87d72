use counts_core::formatting::percentage;
use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
    Unknown,
}

/// Detect terminal background type from the `COLORFGBG` environment variable.
///
/// The variable has the format `"foreground;background"`. Background values
/// 0–6 are considered dark; 7–15 are considered light. If the variable is
/// absent or unparseable, `BackgroundType::Unknown` is returned.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|val| background_from_colorfgbg(&val))
        .unwrap_or(BackgroundType::Unknown)
}

fn background_from_colorfgbg(val: &str) -> Option<BackgroundType> {
    let bg = val.split(';').next_back()?.parse::<u8>().ok()?;
    Some(if bg <= 6 {
        BackgroundType::Dark
    } else {
        BackgroundType::Light
    })
}

// ── Style shorthands ──────────────────────────────────────────────────────────

const fn fg(color: Color) -> Style {
    Style::new().fg(color)
}

const fn bold(color: Color) -> Style {
    Style::new().fg(color).add_modifier(Modifier::BOLD)
}

const fn bold_bg(color: Color) -> Style {
    Style::new().bg(color).add_modifier(Modifier::BOLD)
}

/// Every style the report view draws with.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub value: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub success: Style,
    pub warning: Style,
    pub error: Style,

    // ── Counts ───────────────────────────────────────────────────────────────
    /// A count at or above half of the column's largest value.
    pub count_high: Style,
    /// A count at or above a fifth of the column's largest value.
    pub count_medium: Style,
    pub count_low: Style,
    pub count_zero: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    pub table_selected: Style,

    // ── Footer ───────────────────────────────────────────────────────────────
    pub key: Style,
    pub key_help: Style,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            header: bold(Color::Cyan),
            separator: fg(Color::DarkGray),

            text: fg(Color::White),
            dim: fg(Color::DarkGray),
            label: fg(Color::Gray),
            value: bold(Color::White),

            success: fg(Color::Green),
            warning: fg(Color::Yellow),
            error: fg(Color::Red),

            count_high: bold(Color::Green),
            count_medium: fg(Color::Yellow),
            count_low: fg(Color::White),
            count_zero: fg(Color::DarkGray),

            table_header: bold(Color::Cyan),
            table_border: fg(Color::DarkGray),
            table_row: fg(Color::White),
            table_row_alt: fg(Color::Gray),
            table_selected: bold_bg(Color::DarkGray),

            key: bold(Color::Yellow),
            key_help: fg(Color::Gray),
        }
    }

    /// Light-background terminal theme.
    ///
    /// Dark text with saturated accents so content stays legible on a
    /// white canvas.
    pub fn light() -> Self {
        Self {
            header: bold(Color::Blue),
            separator: fg(Color::Gray),

            text: fg(Color::Black),
            dim: fg(Color::Gray),
            label: fg(Color::DarkGray),
            value: bold(Color::Black),

            success: fg(Color::Green),
            warning: fg(Color::Magenta),
            error: fg(Color::Red),

            count_high: bold(Color::Green),
            count_medium: fg(Color::Magenta),
            count_low: fg(Color::Black),
            count_zero: fg(Color::Gray),

            table_header: bold(Color::Blue),
            table_border: fg(Color::Gray),
            table_row: fg(Color::Black),
            table_row_alt: fg(Color::DarkGray),
            table_selected: bold_bg(Color::Gray),

            key: bold(Color::Blue),
            key_help: fg(Color::DarkGray),
        }
    }

    /// Basic 8-colour ANSI palette, no bold modifiers.
    pub fn classic() -> Self {
        Self {
            header: fg(Color::Cyan),
            separator: fg(Color::DarkGray),

            text: fg(Color::White),
            dim: fg(Color::DarkGray),
            label: fg(Color::Gray),
            value: fg(Color::White),

            success: fg(Color::Green),
            warning: fg(Color::Yellow),
            error: fg(Color::Red),

            count_high: fg(Color::Green),
            count_medium: fg(Color::Yellow),
            count_low: fg(Color::White),
            count_zero: fg(Color::DarkGray),

            table_header: fg(Color::Cyan),
            table_border: fg(Color::DarkGray),
            table_row: fg(Color::White),
            table_row_alt: fg(Color::Gray),
            table_selected: Style::new().add_modifier(Modifier::REVERSED),

            key: fg(Color::Yellow),
            key_help: fg(Color::Gray),
        }
    }

    /// Choose a theme based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Construct a theme by name. Unknown names (including `"auto"`) fall
    /// back to [`Theme::auto_detect`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    /// Style for `count` relative to the largest value in its column.
    ///
    /// * `0`                → `count_zero`
    /// * `>= 50 %` of `max` → `count_high`
    /// * `>= 20 %` of `max` → `count_medium`
    /// * otherwise          → `count_low`
    pub fn count_style(&self, count: u64, max: u64) -> Style {
        if count == 0 {
            return self.count_zero;
        }
        let share = percentage(count as f64, max as f64, 1);
        if share >= 50.0 {
            self.count_high
        } else if share >= 20.0 {
            self.count_medium
        } else {
            self.count_low
        }
    }

    /// Zebra striping for table rows.
    pub fn row_style(&self, index: usize) -> Style {
        if index % 2 == 0 {
            self.table_row
        } else {
            self.table_row_alt
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

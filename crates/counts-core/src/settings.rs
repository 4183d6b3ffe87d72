use chrono::{DateTime, Utc};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::{CountsError, Result};
use crate::time_utils::TimestampParser;

/// Default export file name, as offered by the download action.
pub const DEFAULT_EXPORT_FILE: &str = "filtered_url_counts.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Count first-visited pages in a session export within a date range
#[derive(Parser, Debug, Clone)]
#[command(
    name = "page-counts",
    about = "Count first-visited pages in a session export within a date range",
    version
)]
pub struct Settings {
    /// CSV export with `Created`, `Origin` and `Last Origin` columns
    pub input: PathBuf,

    /// Inclusive start of the date range (defaults to the earliest `Created`)
    #[arg(long)]
    pub start: Option<String>,

    /// Inclusive end of the date range (defaults to the latest `Created`)
    #[arg(long)]
    pub end: Option<String>,

    /// Timezone for timestamps without an offset (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// View mode
    #[arg(long, default_value = "interactive", value_parser = ["interactive", "plain"])]
    pub view: String,

    /// Export file path
    #[arg(long, default_value = DEFAULT_EXPORT_FILE)]
    pub output: PathBuf,

    /// Do not write the export file in plain view (the interactive `s` key
    /// still saves to `--output`)
    #[arg(long)]
    pub no_export: bool,

    /// Print the table as JSON in plain view
    #[arg(long)]
    pub json: bool,

    /// Only print the first N rows in plain view
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub top: Option<u32>,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and resolve `"auto"` values.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list, so tests
    /// don't need to spawn subprocesses.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::resolve_auto_values(Settings::parse_from(args))
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// `true` unless the plain view was requested.
    pub fn is_interactive(&self) -> bool {
        self.view != "plain"
    }

    /// Parser for `Created` values and the CLI bounds.
    pub fn timestamp_parser(&self) -> TimestampParser {
        TimestampParser::new(&self.timezone)
    }

    /// Reject an unknown timezone, or an export path that would overwrite
    /// the input.
    pub fn validate(&self) -> Result<()> {
        if !TimestampParser::validate_timezone(&self.timezone) {
            return Err(CountsError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        // The interactive `s` key can still write the export.
        if self.no_export && !self.is_interactive() {
            return Ok(());
        }
        let same_file = match (self.input.canonicalize(), self.output.canonicalize()) {
            (Ok(input), Ok(output)) => input == output,
            _ => self.input == self.output,
        };
        if same_file {
            return Err(CountsError::Config(format!(
                "export path {} is the input file",
                self.output.display()
            )));
        }
        Ok(())
    }

    /// Parse `--start` / `--end`. Omitted bounds stay `None`; a bound that
    /// is given but unparseable is an error.
    pub fn date_bounds(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let parser = self.timestamp_parser();
        let parse_bound = |raw: &Option<String>| -> Result<Option<DateTime<Utc>>> {
            match raw {
                None => Ok(None),
                Some(text) => parser
                    .parse(text)
                    .map(Some)
                    .ok_or_else(|| CountsError::InvalidBound(text.clone())),
            }
        };
        Ok((parse_bound(&self.start)?, parse_bound(&self.end)?))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the page-counts crates.
#[derive(Error, Debug)]
pub enum CountsError {
    /// The input has no `Created` column; nothing downstream can run.
    #[error("The uploaded CSV must contain a 'Created' column.")]
    MissingCreatedColumn,

    /// The input lacks `Origin`, `Last Origin`, or both.
    #[error("The uploaded CSV must contain 'Origin' and 'Last Origin' columns.")]
    MissingTextColumns,

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited text could not be tokenised.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The report could not be rendered as JSON.
    #[error("Failed to serialize JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// A date-range bound given on the command line is not a timestamp.
    #[error("Invalid date bound: {0}")]
    InvalidBound(String),

    /// An error originating from the terminal / TUI layer.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CountsError {
    /// `true` for the structural errors that halt the whole pipeline.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            CountsError::MissingCreatedColumn | CountsError::MissingTextColumns
        )
    }
}

/// Convenience alias used throughout the page-counts crates.
pub type Result<T> = std::result::Result<T, CountsError>;

//! Core types for page-counts.
//!
//! Holds the error type, the row and aggregation models, the tolerant
//! literal parser behind `Origin` extraction, timestamp handling, number
//! formatting and the command-line settings shared by the other crates.

pub mod error;
pub mod formatting;
pub mod literal;
pub mod models;
pub mod origin;
pub mod settings;
pub mod time_utils;

pub use error::{CountsError, Result};

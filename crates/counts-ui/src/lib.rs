//! Terminal UI layer for page-counts.
//!
//! Provides themes, the report header, the URL table (interactive and plain
//! text) and the interactive event loop built on [`ratatui`].

pub mod app;
pub mod components;
pub mod table_view;
pub mod themes;

pub use counts_core as core;

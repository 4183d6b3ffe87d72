//! Data pipeline for page-counts.
//!
//! Loads the session export into typed records, narrows them to a date
//! range, aggregates first-visited pages and serializes the resulting table.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod filter;
pub mod loader;

pub use counts_core as core;

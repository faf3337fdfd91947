//! Message splitting and report extraction for the watchlist archiver.
//!
//! Consumes the raw text produced by the mail-extraction script, splits it
//! into messages, and turns each message into at most one
//! [`DailyReport`](watchlist_core::models::DailyReport).

pub mod dates;
pub mod extractor;
pub mod layouts;
pub mod splitter;

pub use extractor::{extract_reports, Extraction, Extractor};
pub use watchlist_core as core;

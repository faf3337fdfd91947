//! Shared building blocks for the watchlist archiver.
//!
//! Holds the report data model, the error taxonomy, date → archive
//! addressing, lenient quote-cell parsing and the command-line settings.

pub mod calendar;
pub mod data_processors;
pub mod error;
pub mod models;
pub mod settings;

pub use error::{Result, WatchlistError};

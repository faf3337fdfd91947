//! Run orchestration for the watchlist archiver.
//!
//! Ties extraction (`watchlist-data`) to the month archives
//! (`watchlist-archive`) and reports what happened.

pub mod pipeline;

pub use pipeline::{merge_extraction, run, RunOptions, RunSummary};
pub use watchlist_archive as archive;
pub use watchlist_core as core;
pub use watchlist_data as data;

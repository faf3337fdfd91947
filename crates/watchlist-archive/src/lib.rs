//! Persistent month/week spreadsheet archive for watchlist reports.
//!
//! One `.xlsx` workbook per month, one sheet per day-of-month week bucket,
//! one fixed-position block of columns per date. Merging is append-only and
//! idempotent.

pub mod layout;
pub mod lock;
pub mod merger;
pub mod sheet;
pub mod workbook;

pub use merger::{merge_into, month_file, ArchiveMerger, MergeOutcome, MonthOutcome};
pub use sheet::{ArchiveSheet, MemorySheet};
pub use watchlist_core as core;

//! Date → archive addressing.
//!
//! Every report date maps deterministically to a month workbook, a week
//! sheet inside it, and a block slot inside that sheet. Nothing here touches
//! the filesystem.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Days per week bucket. Buckets are day-of-month ranges, not ISO weeks.
pub const DAYS_PER_BUCKET: u32 = 7;

/// Highest bucket number (days 29–31).
pub const MAX_WEEK: u8 = 5;

/// File extension of month workbooks.
pub const WORKBOOK_EXTENSION: &str = "xlsx";

// ── Pure helpers ──────────────────────────────────────────────────────────────

/// Week bucket for a day of month: 1–7 → 1, 8–14 → 2, …, 29–31 → 5.
pub fn week_bucket(day: u32) -> u8 {
    (((day.max(1) - 1) / DAYS_PER_BUCKET) + 1) as u8
}

/// Zero-based position of a day inside its week bucket.
pub fn slot_in_week(day: u32) -> u8 {
    ((day.max(1) - 1) % DAYS_PER_BUCKET) as u8
}

/// Sheet name for a week bucket, e.g. `"Week2"`.
pub fn sheet_name(week: u8) -> String {
    format!("Week{}", week)
}

/// Week bucket named by a sheet, the inverse of [`sheet_name`].
pub fn week_of_sheet(name: &str) -> Option<u8> {
    name.strip_prefix("Week")?
        .parse::<u8>()
        .ok()
        .filter(|w| (1..=MAX_WEEK).contains(w))
}

/// Lower-case English month name used as the workbook stem.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%B").to_string().to_lowercase()
}

// ── ArchiveAddress ────────────────────────────────────────────────────────────

/// Where one report date lives inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ArchiveAddress {
    pub year: i32,
    pub month: u32,
    /// Workbook stem, e.g. `"february"`.
    pub month_key: String,
    /// Week bucket, 1 through 5.
    pub week: u8,
    /// Block slot inside the week sheet, 0 through 6.
    pub slot: u8,
}

impl ArchiveAddress {
    /// Address a report date.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            month_key: month_key(date),
            week: week_bucket(date.day()),
            slot: slot_in_week(date.day()),
        }
    }

    /// Sheet holding this date.
    pub fn sheet_name(&self) -> String {
        sheet_name(self.week)
    }

    /// Workbook path relative to the archive root.
    ///
    /// With `year_dirs` the file sits under a `<year>/` directory so that the
    /// same month of different years never shares a workbook.
    pub fn relative_path(&self, year_dirs: bool) -> PathBuf {
        let file = format!("{}.{}", self.month_key, WORKBOOK_EXTENSION);
        if year_dirs {
            PathBuf::from(self.year.to_string()).join(file)
        } else {
            PathBuf::from(file)
        }
    }
}

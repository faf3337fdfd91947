//! Merging daily reports into the month archives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};
use watchlist_core::calendar::ArchiveAddress;
use watchlist_core::models::DailyReport;
use watchlist_core::{Result, WatchlistError};

use crate::lock::ArchiveLock;
use crate::sheet::ArchiveSheet;
use crate::workbook::MonthWorkbook;

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Result of merging one report into one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new block was written.
    Written,
    /// A block for the date already existed; nothing changed.
    AlreadyPresent,
}

/// A report that could not be placed in its sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedReport {
    pub date: NaiveDate,
    pub reason: String,
}

/// What happened to one month workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthOutcome {
    pub path: PathBuf,
    /// Dates whose blocks were written, ascending.
    pub written: Vec<NaiveDate>,
    /// Dates already present (or repeated within the batch).
    pub skipped: Vec<NaiveDate>,
    /// Dates refused because their sheet or slot belongs to another date.
    pub rejected: Vec<RejectedReport>,
    /// Whether the file was saved.
    pub saved: bool,
}

// ── Sheet-level merge ─────────────────────────────────────────────────────────

/// Merge one report into `sheet`, leaving it untouched if the date is
/// already there.
pub fn merge_into<S: ArchiveSheet + ?Sized>(
    sheet: &mut S,
    report: &DailyReport,
) -> Result<MergeOutcome> {
    if sheet.has_block(report.date) {
        debug!("{}: {} already archived; skipping", sheet.name(), report.date);
        return Ok(MergeOutcome::AlreadyPresent);
    }
    sheet.append_block(report.date, &report.rows)?;
    Ok(MergeOutcome::Written)
}

/// Month workbook for `address` under the archive `root`.
pub fn month_file(root: &Path, address: &ArchiveAddress, year_dirs: bool) -> PathBuf {
    root.join(address.relative_path(year_dirs))
}

// ── ArchiveMerger ─────────────────────────────────────────────────────────────

/// Merges reports into `<root>/<year>/<month>.xlsx` workbooks (`<root>/<month>.xlsx`
/// when flat).
#[derive(Debug, Clone)]
pub struct ArchiveMerger {
    root: PathBuf,
    year_dirs: bool,
}

impl ArchiveMerger {
    /// `root` is the archive directory; with `year_dirs` workbooks live under
    /// `<root>/<year>/`.
    pub fn new(root: impl Into<PathBuf>, year_dirs: bool) -> Self {
        Self {
            root: root.into(),
            year_dirs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Workbook holding `date`.
    pub fn workbook_path(&self, date: NaiveDate) -> PathBuf {
        month_file(&self.root, &ArchiveAddress::for_date(date), self.year_dirs)
    }

    /// Group reports by workbook, each group sorted by date. Groups are
    /// ordered by their earliest date.
    pub fn group_by_workbook<'a>(
        &self,
        reports: &'a [DailyReport],
    ) -> Vec<(PathBuf, Vec<&'a DailyReport>)> {
        let mut groups: BTreeMap<PathBuf, Vec<&'a DailyReport>> = BTreeMap::new();
        for report in reports {
            groups
                .entry(self.workbook_path(report.date))
                .or_default()
                .push(report);
        }

        let mut ordered: Vec<(PathBuf, Vec<&DailyReport>)> = groups
            .into_iter()
            .map(|(path, mut group)| {
                group.sort_by_key(|r| r.date);
                (path, group)
            })
            .collect();
        ordered.sort_by_key(|(_, group)| group.first().map(|r| r.date));
        ordered
    }

    /// Merge a single report into its workbook, saving only if a block was
    /// written.
    pub fn merge(&self, report: &DailyReport) -> Result<MergeOutcome> {
        let path = self.workbook_path(report.date);
        let _lock = ArchiveLock::acquire(&path)?;
        let mut workbook = MonthWorkbook::open_or_create(&path)?;

        let sheet_name = ArchiveAddress::for_date(report.date).sheet_name();
        let outcome = merge_into(&mut workbook.sheet(&sheet_name)?, report)?;
        if outcome == MergeOutcome::Written {
            workbook.save_atomic()?;
        }
        Ok(outcome)
    }

    /// One read-merge-write cycle over the workbook at `path`.
    ///
    /// All `reports` must address `path`. The workbook is locked for the
    /// whole cycle and saved only when at least one block was written.
    pub fn merge_month(&self, path: &Path, reports: &[&DailyReport]) -> Result<MonthOutcome> {
        let mut outcome = MonthOutcome {
            path: path.to_path_buf(),
            ..MonthOutcome::default()
        };
        if reports.is_empty() {
            return Ok(outcome);
        }
        if let Some(stray) = reports.iter().find(|r| self.workbook_path(r.date) != path) {
            return Err(WatchlistError::Config(format!(
                "report for {} does not belong in {}",
                stray.date,
                path.display()
            )));
        }

        let _lock = ArchiveLock::acquire(path)?;
        let mut workbook = MonthWorkbook::open_or_create(path)?;

        let mut sorted: Vec<&DailyReport> = reports.to_vec();
        sorted.sort_by_key(|r| r.date);

        for report in sorted {
            let sheet_name = ArchiveAddress::for_date(report.date).sheet_name();
            let mut sheet = workbook.sheet(&sheet_name)?;
            match merge_into(&mut sheet, report) {
                Ok(MergeOutcome::Written) => outcome.written.push(report.date),
                Ok(MergeOutcome::AlreadyPresent) => outcome.skipped.push(report.date),
                Err(
                    e @ (WatchlistError::SlotConflict { .. } | WatchlistError::YearConflict { .. }),
                ) => {
                    warn!("{}: {}", path.display(), e);
                    outcome.rejected.push(RejectedReport {
                        date: report.date,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if outcome.written.is_empty() {
            info!(
                "{}: no new dates ({} already archived)",
                path.display(),
                outcome.skipped.len()
            );
            return Ok(outcome);
        }

        workbook.save_atomic()?;
        outcome.saved = true;
        info!(
            "{}: wrote {} new date block(s)",
            path.display(),
            outcome.written.len()
        );
        Ok(outcome)
    }
}

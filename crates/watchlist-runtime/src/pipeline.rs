//! One archiver run: extract the batch, then merge it month by month.
//!
//! Failures are contained at the smallest scope that makes sense. A bad
//! message is skipped with a diagnostic, a locked or unreadable month is
//! recorded and the remaining months still merge, and only a failed write
//! aborts the run.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};
use watchlist_archive::{ArchiveMerger, MonthOutcome};
use watchlist_core::calendar::ArchiveAddress;
use watchlist_core::models::Diagnostic;
use watchlist_core::settings::Settings;
use watchlist_core::Result;
use watchlist_data::{Extraction, Extractor};

// ── Options ───────────────────────────────────────────────────────────────────

/// What a run needs from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory holding the month workbooks.
    pub archive_root: PathBuf,
    /// Place workbooks under `<root>/<year>/`; `false` is the flat layout.
    pub year_dirs: bool,
    /// Extract and address only; nothing is written.
    pub dry_run: bool,
}

impl RunOptions {
    /// Year-scoped layout, writing enabled.
    pub fn new(archive_root: impl Into<PathBuf>) -> Self {
        Self {
            archive_root: archive_root.into(),
            year_dirs: true,
            dry_run: false,
        }
    }
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            archive_root: settings.archive_root(),
            year_dirs: settings.year_dirs(),
            dry_run: settings.dry_run,
        }
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// A month workbook that could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthFailure {
    pub path: PathBuf,
    pub error: String,
}

/// A block a dry run would have tried to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBlock {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub sheet: String,
}

/// Totals for one run, printed with `--json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Non-empty messages in the input.
    pub messages: usize,
    /// Reports extracted from them.
    pub reports: usize,
    /// Messages that produced no report.
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub blocks_written: usize,
    /// Dates already archived.
    pub blocks_skipped: usize,
    /// Workbooks saved during this run.
    pub files_written: Vec<PathBuf>,
    pub months: Vec<MonthOutcome>,
    pub failures: Vec<MonthFailure>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedBlock>,
}

impl RunSummary {
    /// `true` when every month merged and no report was refused.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.months.iter().all(|m| m.rejected.is_empty())
    }

    /// Dates refused because their sheet or slot was taken.
    pub fn rejected(&self) -> usize {
        self.months.iter().map(|m| m.rejected.len()).sum()
    }
}

// ── Run ───────────────────────────────────────────────────────────────────────

/// Extract every report from `input` and merge them into the archive.
///
/// Returns `Err` only for run-fatal errors; per-month failures are recorded
/// in the summary.
pub fn run(input: &str, options: &RunOptions) -> Result<RunSummary> {
    let extraction = Extractor::default().extract(input);
    merge_extraction(extraction, options)
}

/// Merge an already extracted batch.
pub fn merge_extraction(extraction: Extraction, options: &RunOptions) -> Result<RunSummary> {
    let mut summary = RunSummary {
        messages: extraction.messages,
        reports: extraction.reports.len(),
        skipped: extraction.diagnostics.len(),
        diagnostics: extraction.diagnostics,
        dry_run: options.dry_run,
        ..RunSummary::default()
    };

    if extraction.reports.is_empty() {
        info!("No reports to archive");
        return Ok(summary);
    }

    let merger = ArchiveMerger::new(&options.archive_root, options.year_dirs);
    let groups = merger.group_by_workbook(&extraction.reports);

    if options.dry_run {
        for (path, reports) in &groups {
            for report in reports {
                let sheet = ArchiveAddress::for_date(report.date).sheet_name();
                info!(
                    "Dry run: {} ({} rows) -> {} [{}]",
                    report.date,
                    report.rows.len(),
                    path.display(),
                    sheet
                );
                summary.planned.push(PlannedBlock {
                    date: report.date,
                    path: path.clone(),
                    sheet,
                });
            }
        }
        return Ok(summary);
    }

    for (path, reports) in &groups {
        match merger.merge_month(path, reports) {
            Ok(outcome) => {
                summary.blocks_written += outcome.written.len();
                summary.blocks_skipped += outcome.skipped.len();
                if outcome.saved {
                    summary.files_written.push(outcome.path.clone());
                }
                summary.months.push(outcome);
            }
            Err(e) if e.is_run_fatal() => {
                error!("Aborting run: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                summary.failures.push(MonthFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Run complete: {} new block(s), {} already archived, {} file(s) written, {} month failure(s)",
        summary.blocks_written,
        summary.blocks_skipped,
        summary.files_written.len(),
        summary.failures.len()
    );
    Ok(summary)
}

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// All archive- and environment-level errors produced by the watchlist crates.
///
/// Per-message extraction problems are not errors; they surface as
/// [`crate::models::Diagnostic`] values instead.
#[derive(Error, Debug)]
pub enum WatchlistError {
    /// An existing month workbook could not be opened or parsed.
    #[error("Failed to read archive {path}: {reason}")]
    ArchiveRead { path: PathBuf, reason: String },

    /// Writing the month workbook (temp file, rename, directory) failed.
    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook could not be serialised to xlsx.
    #[error("Failed to serialise archive {path}: {reason}")]
    ArchiveSerialize { path: PathBuf, reason: String },

    /// Another process holds the month's lock.
    #[error("Archive {path} is locked by another process")]
    Locked { path: PathBuf },

    /// A date's fixed block position is already labelled with another date.
    #[error("Sheet {sheet}: block for {date} is occupied by \"{existing}\"")]
    SlotConflict {
        sheet: String,
        date: NaiveDate,
        existing: String,
    },

    /// The week sheet already holds blocks from another year (flat layout).
    #[error("Sheet {sheet}: cannot add {date}, the sheet already holds {existing} from another year")]
    YearConflict {
        sheet: String,
        date: NaiveDate,
        existing: NaiveDate,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchlistError {
    /// Whether the error must abort the whole run rather than just the
    /// month being merged.
    ///
    /// Write-side failures (disk full, permissions, serialisation) abort the
    /// run; read-side failures, lock contention and layout conflicts only
    /// affect the month in question.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            WatchlistError::ArchiveWrite { .. }
                | WatchlistError::ArchiveSerialize { .. }
                | WatchlistError::Io(_)
        )
    }
}

/// Convenience alias used throughout the watchlist crates.
pub type Result<T> = std::result::Result<T, WatchlistError>;

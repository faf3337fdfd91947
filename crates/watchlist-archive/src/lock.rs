//! Per-workbook exclusive lock.
//!
//! The workbook itself is replaced by rename on save, so the lock lives in a
//! sidecar `.<name>.lock` file next to it. Acquisition never waits: a second
//! writer fails fast with [`WatchlistError::Locked`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};
use watchlist_core::{Result, WatchlistError};

/// Held for the duration of one read-merge-write cycle; released and removed
/// on drop.
#[derive(Debug)]
pub struct ArchiveLock {
    file: Option<File>,
    path: PathBuf,
}

impl ArchiveLock {
    /// Sidecar lock path for `workbook`.
    pub fn lock_path(workbook: &Path) -> PathBuf {
        let name = workbook
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());
        workbook.with_file_name(format!(".{}.lock", name))
    }

    /// Take the lock for `workbook`, creating its directory if needed.
    pub fn acquire(workbook: &Path) -> Result<Self> {
        let path = Self::lock_path(workbook);
        let write_err = |source: std::io::Error| WatchlistError::ArchiveWrite {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(write_err)?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.kind() == fs2::lock_contended_error().kind() {
                return Err(WatchlistError::Locked {
                    path: workbook.to_path_buf(),
                });
            }
            return Err(write_err(e));
        }

        debug!("Locked {}", workbook.display());
        Ok(Self {
            file: Some(file),
            path,
        })
    }
}

impl Drop for ArchiveLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not remove lock file {}: {}", self.path.display(), e);
        }
        // Closing the handle releases the lock.
        self.file.take();
    }
}

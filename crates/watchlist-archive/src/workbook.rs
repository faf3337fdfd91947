//! xlsx-backed month workbooks.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};
use watchlist_core::calendar::week_of_sheet;
use watchlist_core::{Result, WatchlistError};

use crate::layout::{CellValue, HEADER_ROW, LABEL_ROW};
use crate::sheet::ArchiveSheet;

// ── WorkbookSheet ─────────────────────────────────────────────────────────────

/// [`ArchiveSheet`] over a worksheet of an open [`MonthWorkbook`].
pub struct WorkbookSheet<'a> {
    sheet: &'a mut Worksheet,
}

impl ArchiveSheet for WorkbookSheet<'_> {
    fn name(&self) -> &str {
        self.sheet.get_name()
    }

    fn cell_text(&self, column: u32, row: u32) -> Option<String> {
        self.sheet
            .get_cell((column, row))
            .map(|cell| cell.get_value().to_string())
            .filter(|s| !s.is_empty())
    }

    fn write_cell(&mut self, column: u32, row: u32, value: &CellValue) {
        match value {
            CellValue::Text(text) => {
                self.sheet
                    .get_cell_mut((column, row))
                    .set_value_string(text.as_str());
                if row == LABEL_ROW || row == HEADER_ROW {
                    self.sheet
                        .get_style_mut((column, row))
                        .get_font_mut()
                        .set_bold(true);
                }
            }
            CellValue::Number { value, format } => {
                self.sheet
                    .get_cell_mut((column, row))
                    .set_value_number(*value);
                self.sheet
                    .get_style_mut((column, row))
                    .get_number_format_mut()
                    .set_format_code(*format);
            }
        }
    }

    fn highest_column(&self) -> u32 {
        self.sheet.get_highest_column()
    }

    fn highest_row(&self) -> u32 {
        self.sheet.get_highest_row()
    }
}

// ── MonthWorkbook ─────────────────────────────────────────────────────────────

/// One month's archive file, loaded into memory for a read-merge-write cycle.
pub struct MonthWorkbook {
    path: PathBuf,
    book: Spreadsheet,
    existed: bool,
}

impl MonthWorkbook {
    /// Load `path`, or start an empty workbook when it does not exist.
    ///
    /// An existing file that cannot be parsed yields
    /// [`WatchlistError::ArchiveRead`]; it is never replaced.
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| {
                WatchlistError::ArchiveRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
            debug!("Opened archive {}", path.display());
            Ok(Self {
                path: path.to_path_buf(),
                book,
                existed: true,
            })
        } else {
            debug!("Archive {} not found; starting a new workbook", path.display());
            Ok(Self {
                path: path.to_path_buf(),
                book: umya_spreadsheet::new_file_empty_worksheet(),
                existed: false,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file was present on disk when opened.
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// Names of all sheets, in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    /// Read-only view of a sheet, if present.
    pub fn worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.book.get_sheet_by_name(name)
    }

    /// Open the sheet called `name`, creating it when missing. New week
    /// sheets are placed in week order.
    pub fn sheet(&mut self, name: &str) -> Result<WorkbookSheet<'_>> {
        if self.book.get_sheet_by_name(name).is_none() {
            self.book.new_sheet(name).map_err(|e| WatchlistError::ArchiveRead {
                path: self.path.clone(),
                reason: format!("cannot add sheet {}: {}", name, e),
            })?;
            // Keep week sheets in bucket order; other sheets go after them.
            self.book
                .get_sheet_collection_mut()
                .sort_by_key(|ws| week_of_sheet(ws.get_name()).unwrap_or(u8::MAX));
            debug!("{}: created sheet {}", self.path.display(), name);
        }

        let path = self.path.clone();
        let sheet = self
            .book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| WatchlistError::ArchiveRead {
                path,
                reason: format!("sheet {} missing after creation", name),
            })?;
        Ok(WorkbookSheet { sheet })
    }

    /// Write the workbook to a temporary file beside the target and rename
    /// it into place, so readers only ever see a complete file.
    pub fn save_atomic(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| WatchlistError::ArchiveWrite {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(".watchlist-").suffix(".xlsx.tmp");
        // New workbooks get the usual umask-derived mode, not tempfile's 0600.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(&dir).map_err(write_err)?;

        // A replaced workbook keeps the mode it had.
        if let Ok(existing) = std::fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(existing.permissions())
                .map_err(write_err)?;
        }

        umya_spreadsheet::writer::xlsx::write_writer(&self.book, tmp.as_file_mut()).map_err(
            |e| WatchlistError::ArchiveSerialize {
                path: self.path.clone(),
                reason: e.to_string(),
            },
        )?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!("Saved archive {}", self.path.display());
        Ok(())
    }
}

//! The week-sheet interface the merger works against.
//!
//! [`ArchiveSheet`] needs only a handful of cell primitives; block lookup
//! and block writing are provided on top of them, so the xlsx-backed sheet
//! and the in-memory [`MemorySheet`] share one implementation of the
//! idempotence-critical logic.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use tracing::debug;
use watchlist_core::calendar::slot_in_week;
use watchlist_core::models::{Field, InstrumentRow};
use watchlist_core::{Result, WatchlistError};

use crate::layout::{
    block_start_column, date_label, parse_date_label, row_cells, CellValue, BLOCK_STRIDE,
    FIRST_BLOCK_COLUMN, FIRST_DATA_ROW, HEADER_ROW, KEY_COLUMN, LABEL_ROW,
};

// ── ArchiveSheet ──────────────────────────────────────────────────────────────

/// One week sheet of a month archive.
pub trait ArchiveSheet {
    /// Sheet name, e.g. `"Week2"`.
    fn name(&self) -> &str;

    /// Text of a cell, or `None` when the cell is absent or empty.
    fn cell_text(&self, column: u32, row: u32) -> Option<String>;

    /// Write a value (and its number format) into a cell.
    fn write_cell(&mut self, column: u32, row: u32, value: &CellValue);

    /// Highest used column (0 for an empty sheet).
    fn highest_column(&self) -> u32;

    /// Highest used row (0 for an empty sheet).
    fn highest_row(&self) -> u32;

    /// Dates of all blocks present, left to right.
    fn block_dates(&self) -> Vec<NaiveDate> {
        let last = self.highest_column();
        (FIRST_BLOCK_COLUMN..=last)
            .step_by(BLOCK_STRIDE as usize)
            .filter_map(|col| self.cell_text(col, LABEL_ROW))
            .filter_map(|label| parse_date_label(&label))
            .collect()
    }

    /// Whether a block labelled with `date` already exists.
    fn has_block(&self, date: NaiveDate) -> bool {
        let label = date_label(date);
        let last = self.highest_column();
        (FIRST_BLOCK_COLUMN..=last)
            .any(|col| self.cell_text(col, LABEL_ROW).as_deref() == Some(label.as_str()))
    }

    /// Write the block for `date`: label, field headers, then one row per
    /// instrument in `rows` order, aligned to the symbol key column.
    ///
    /// Existing blocks are never touched. Symbols not yet in the key column
    /// are appended below the last used row. Fails before writing anything
    /// with [`WatchlistError::YearConflict`] if the sheet holds another
    /// year's blocks, or [`WatchlistError::SlotConflict`] if the date's slot
    /// carries some other label.
    fn append_block(&mut self, date: NaiveDate, rows: &[InstrumentRow]) -> Result<()> {
        let start = block_start_column(slot_in_week(date.day()));
        let label = date_label(date);

        // A sheet only ever holds one year, so fixed slots stay ascending.
        if let Some(existing) = self
            .block_dates()
            .into_iter()
            .find(|d| d.year() != date.year())
        {
            return Err(WatchlistError::YearConflict {
                sheet: self.name().to_string(),
                date,
                existing,
            });
        }

        if let Some(existing) = self.cell_text(start, LABEL_ROW) {
            if existing != label {
                return Err(WatchlistError::SlotConflict {
                    sheet: self.name().to_string(),
                    date,
                    existing,
                });
            }
        }

        // Current key rows, one list per symbol to allow repeated symbols.
        let mut key_rows: HashMap<String, Vec<u32>> = HashMap::new();
        let highest_row = self.highest_row();
        for row in FIRST_DATA_ROW..=highest_row {
            if let Some(symbol) = self.cell_text(KEY_COLUMN, row) {
                key_rows.entry(symbol).or_default().push(row);
            }
        }
        let mut next_free = highest_row.max(FIRST_DATA_ROW - 1) + 1;

        if self.cell_text(KEY_COLUMN, HEADER_ROW).is_none() {
            let header = CellValue::Text(Field::Symbol.header().to_string());
            self.write_cell(KEY_COLUMN, HEADER_ROW, &header);
        }
        self.write_cell(start, LABEL_ROW, &CellValue::Text(label));
        for (offset, field) in Field::ALL.iter().enumerate() {
            self.write_cell(
                start + offset as u32,
                HEADER_ROW,
                &CellValue::Text(field.header().to_string()),
            );
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for instrument in rows {
            let occurrence = seen.entry(instrument.symbol.as_str()).or_insert(0);
            let slots = key_rows.entry(instrument.symbol.clone()).or_default();
            let target = match slots.get(*occurrence) {
                Some(row) => *row,
                None => {
                    let row = next_free;
                    next_free += 1;
                    slots.push(row);
                    let key = CellValue::Text(instrument.symbol.clone());
                    self.write_cell(KEY_COLUMN, row, &key);
                    row
                }
            };
            *occurrence += 1;

            for (offset, cell) in row_cells(instrument).iter().enumerate() {
                if let Some(value) = cell {
                    self.write_cell(start + offset as u32, target, value);
                }
            }
        }

        debug!("{}: wrote block {} with {} row(s)", self.name(), date, rows.len());
        Ok(())
    }
}

// ── MemorySheet ───────────────────────────────────────────────────────────────

/// In-memory [`ArchiveSheet`] used to exercise merge logic without a file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Raw typed value of a cell.
    pub fn value(&self, column: u32, row: u32) -> Option<&CellValue> {
        self.cells.get(&(column, row))
    }

    /// All cells inside the column range `[first, last]`.
    pub fn columns(&self, first: u32, last: u32) -> Vec<((u32, u32), CellValue)> {
        self.cells
            .iter()
            .filter(|((col, _), _)| (first..=last).contains(col))
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }
}

impl ArchiveSheet for MemorySheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn cell_text(&self, column: u32, row: u32) -> Option<String> {
        self.cells
            .get(&(column, row))
            .map(CellValue::display)
            .filter(|s| !s.is_empty())
    }

    fn write_cell(&mut self, column: u32, row: u32, value: &CellValue) {
        self.cells.insert((column, row), value.clone());
    }

    fn highest_column(&self) -> u32 {
        self.cells.keys().map(|(col, _)| *col).max().unwrap_or(0)
    }

    fn highest_row(&self) -> u32 {
        self.cells.keys().map(|(_, row)| *row).max().unwrap_or(0)
    }
}

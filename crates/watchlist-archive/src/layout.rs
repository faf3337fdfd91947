//! Fixed sheet geometry shared by every month workbook.
//!
//! ```text
//!        A        B        C       …  J      K (spacer)  L        …
//!   1             2024-02-08                             2024-02-09
//!   2    Symbol   Symbol   Latest  …  Time               Symbol   …
//!   3    AAA      AAA      1.00    …  9:30 AM            AAA      …
//! ```
//!
//! Column A is the symbol key. Each date owns a block of one column per
//! [`Field`] followed by a spacer; the block's position depends only on the
//! date's slot inside its week bucket.
//!
//! Blocks are not packed at the next free offset. A day with no report
//! (a weekend or a holiday) leaves its slot empty, so the sheet shows a
//! blank [`BLOCK_STRIDE`]-wide gap there. Later days still land in their own
//! slot, so labels read left to right in date order and adding a date never
//! moves an existing block.

use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use watchlist_core::models::{Field, InstrumentRow};

/// Column holding the symbol key for every data row.
pub const KEY_COLUMN: u32 = 1;
/// Row carrying date labels.
pub const LABEL_ROW: u32 = 1;
/// Row carrying field headers.
pub const HEADER_ROW: u32 = 2;
/// First instrument row.
pub const FIRST_DATA_ROW: u32 = 3;
/// Columns used by one date block.
pub const BLOCK_WIDTH: u32 = Field::COUNT as u32;
/// Distance between the first columns of adjacent blocks.
pub const BLOCK_STRIDE: u32 = BLOCK_WIDTH + 1;
/// First column of slot 0.
pub const FIRST_BLOCK_COLUMN: u32 = KEY_COLUMN + 1;

/// Excel number format codes.
pub mod formats {
    pub const PRICE: &str = "0.00";
    /// Prices quoted to more than two decimals (FX pairs).
    pub const PRICE_FINE: &str = "0.0000";
    pub const PERCENT: &str = "0.00%";
    pub const VOLUME: &str = "#,##0";
    pub const TIME: &str = "h:mm AM/PM";
}

const SECONDS_PER_DAY: f64 = 86_400.0;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// First column of the block in `slot` (1-based column index).
pub fn block_start_column(slot: u8) -> u32 {
    FIRST_BLOCK_COLUMN + u32::from(slot) * BLOCK_STRIDE
}

/// Label written above a date's block.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Inverse of [`date_label`].
pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), "%Y-%m-%d").ok()
}

// ── Cell values ───────────────────────────────────────────────────────────────

/// A typed value destined for one archive cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number { value: f64, format: &'static str },
}

impl CellValue {
    /// Text as read back from a sheet.
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number { value, .. } => value.to_string(),
        }
    }
}

fn price(value: Decimal) -> Option<CellValue> {
    let format = if value.normalize().scale() > 2 {
        formats::PRICE_FINE
    } else {
        formats::PRICE
    };
    Some(CellValue::Number {
        value: value.to_f64()?,
        format,
    })
}

fn percent(value: Decimal) -> Option<CellValue> {
    Some(CellValue::Number {
        value: value.checked_div(Decimal::ONE_HUNDRED)?.to_f64()?,
        format: formats::PERCENT,
    })
}

fn time_of_day(value: NaiveTime) -> CellValue {
    CellValue::Number {
        value: f64::from(value.num_seconds_from_midnight()) / SECONDS_PER_DAY,
        format: formats::TIME,
    }
}

/// Cells for one row of a date block, in [`Field::ALL`] order. `None`
/// means the cell stays empty.
pub fn row_cells(row: &InstrumentRow) -> Vec<Option<CellValue>> {
    Field::ALL
        .iter()
        .map(|field| match field {
            Field::Symbol => Some(CellValue::Text(row.symbol.clone())),
            Field::Latest => row.latest.and_then(price),
            Field::Change => row.change.and_then(price),
            Field::PctChange => row.pct_change.and_then(percent),
            Field::Open => row.open.and_then(price),
            Field::High => row.high.and_then(price),
            Field::Low => row.low.and_then(price),
            Field::Volume => row.volume.map(|v| CellValue::Number {
                value: v as f64,
                format: formats::VOLUME,
            }),
            Field::Time => row.time.map(time_of_day),
        })
        .collect()
}

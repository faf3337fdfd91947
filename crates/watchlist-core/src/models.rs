use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Field ─────────────────────────────────────────────────────────────────────

/// One column of the watchlist table, in the order the mail client emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Symbol,
    Latest,
    Change,
    PctChange,
    Open,
    High,
    Low,
    Volume,
    Time,
}

impl Field {
    /// Every field in positional order.
    pub const ALL: [Field; 9] = [
        Field::Symbol,
        Field::Latest,
        Field::Change,
        Field::PctChange,
        Field::Open,
        Field::High,
        Field::Low,
        Field::Volume,
        Field::Time,
    ];

    /// Number of columns in a watchlist table.
    pub const COUNT: usize = Self::ALL.len();

    /// Column header as it appears in the report and in the archive.
    pub fn header(self) -> &'static str {
        match self {
            Field::Symbol => "Symbol",
            Field::Latest => "Latest",
            Field::Change => "Change",
            Field::PctChange => "%Change",
            Field::Open => "Open",
            Field::High => "High",
            Field::Low => "Low",
            Field::Volume => "Volume",
            Field::Time => "Time",
        }
    }

    /// Resolve a header cell to a field, ignoring case, spacing and the
    /// common `% Chg` / `Last` spellings.
    pub fn from_header(cell: &str) -> Option<Field> {
        let key: String = cell
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "symbol" | "sym" | "ticker" => Some(Field::Symbol),
            "latest" | "last" | "price" => Some(Field::Latest),
            "change" | "chg" | "netchange" => Some(Field::Change),
            "%change" | "%chg" | "pctchange" | "change%" => Some(Field::PctChange),
            "open" => Some(Field::Open),
            "high" => Some(Field::High),
            "low" => Some(Field::Low),
            "volume" | "vol" => Some(Field::Volume),
            "time" => Some(Field::Time),
            _ => None,
        }
    }
}

// ── InstrumentRow ─────────────────────────────────────────────────────────────

/// One instrument's quote in a daily report.
///
/// Every numeric field is optional: a value that fails to parse is kept as
/// `None` rather than being replaced with zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRow {
    /// Instrument symbol with the `$` / `^` markers removed.
    pub symbol: String,
    pub latest: Option<Decimal>,
    pub change: Option<Decimal>,
    /// Percentage change in percent units (`1.5` means 1.5 %).
    pub pct_change: Option<Decimal>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub volume: Option<u64>,
    /// Time of the last quote.
    pub time: Option<NaiveTime>,
}

impl InstrumentRow {
    /// A row carrying only a symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Number of numeric/time fields that parsed successfully.
    pub fn populated_fields(&self) -> usize {
        [
            self.latest.is_some(),
            self.change.is_some(),
            self.pct_change.is_some(),
            self.open.is_some(),
            self.high.is_some(),
            self.low.is_some(),
            self.volume.is_some(),
            self.time.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

// ── DailyReport ───────────────────────────────────────────────────────────────

/// All rows of one day's watchlist mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReport {
    /// Calendar date the quotes refer to.
    pub date: NaiveDate,
    /// Rows in the order they appeared in the message.
    pub rows: Vec<InstrumentRow>,
}

impl DailyReport {
    pub fn new(date: NaiveDate, rows: Vec<InstrumentRow>) -> Self {
        Self { date, rows }
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why a message did not produce a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Neither the body nor the delivery metadata carried a usable date.
    MissingDate,
    /// No candidate layout matched a majority of the table lines.
    UnrecognizedLayout,
    /// The table layout was recognised but no instrument rows survived.
    EmptyTable,
}

/// A recoverable, per-message extraction problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Zero-based index of the message within the input batch.
    pub message_index: usize,
    pub kind: DiagnosticKind,
    /// Human-readable detail for the log stream.
    pub detail: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "message #{}: {}", self.message_index + 1, self.detail)
    }
}

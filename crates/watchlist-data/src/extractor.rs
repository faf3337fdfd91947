//! Message → [`DailyReport`] extraction.
//!
//! Splits the raw batch, sniffs each body's table layout, maps the cells
//! onto [`InstrumentRow`]s and resolves the report date. Every failure here
//! is per-message: it is logged, recorded as a [`Diagnostic`], and the rest
//! of the batch carries on.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use watchlist_core::data_processors::{clean_symbol, NumberParser, TimeParser};
use watchlist_core::models::{DailyReport, Diagnostic, DiagnosticKind, Field, InstrumentRow};

use crate::dates::{recap_date, resolve_date};
use crate::layouts::{default_parsers, sniff, CandidateParser, LayoutMatch};
use crate::splitter::{parse_messages, RawMessage};

// ── Extraction ────────────────────────────────────────────────────────────────

/// Everything produced from one input batch.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Reports in input order.
    pub reports: Vec<DailyReport>,
    /// One entry per message that produced no report.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of non-empty messages found in the batch.
    pub messages: usize,
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Turns raw message text into daily reports using an ordered set of
/// [`CandidateParser`]s.
pub struct Extractor {
    parsers: Vec<Box<dyn CandidateParser>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(default_parsers())
    }
}

impl Extractor {
    /// Build an extractor over a custom parser list (priority order).
    pub fn new(parsers: Vec<Box<dyn CandidateParser>>) -> Self {
        Self { parsers }
    }

    /// Extract all reports from a raw batch.
    pub fn extract(&self, raw: &str) -> Extraction {
        let messages = parse_messages(raw);
        let mut extraction = Extraction {
            messages: messages.len(),
            ..Extraction::default()
        };

        for msg in &messages {
            match self.extract_message(msg) {
                Ok(report) => {
                    debug!(
                        "message #{}: {} rows for {}",
                        msg.index + 1,
                        report.rows.len(),
                        report.date
                    );
                    extraction.reports.push(report);
                }
                Err(diagnostic) => {
                    warn!("Skipping {}", diagnostic);
                    extraction.diagnostics.push(diagnostic);
                }
            }
        }

        info!(
            "Extracted {} report(s) from {} message(s), {} skipped",
            extraction.reports.len(),
            extraction.messages,
            extraction.diagnostics.len()
        );
        extraction
    }

    /// Extract a single message.
    pub fn extract_message(&self, msg: &RawMessage) -> Result<DailyReport, Diagnostic> {
        let lines: Vec<&str> = msg.body.lines().collect();

        // Recap header lines are prose, never table rows.
        let prose: HashSet<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| recap_date(l).is_some())
            .map(|(i, _)| i)
            .collect();

        let layout = sniff(&self.parsers, &lines, &prose);
        let table_lines = layout
            .as_ref()
            .map(LayoutMatch::table_lines)
            .unwrap_or_default();

        let Some((date, _source)) = resolve_date(msg, &table_lines) else {
            return Err(diagnostic(
                msg,
                DiagnosticKind::MissingDate,
                "no report date in body or delivery metadata",
            ));
        };

        let Some(layout) = layout else {
            return Err(diagnostic(
                msg,
                DiagnosticKind::UnrecognizedLayout,
                &format!("no table layout recognised for {}", date),
            ));
        };
        debug!(
            "message #{}: {} layout, {}/{} lines matched",
            msg.index + 1,
            layout.layout,
            layout.rows.len(),
            layout.candidates
        );

        let rows: Vec<InstrumentRow> = layout
            .rows
            .iter()
            .filter_map(|r| build_row(&layout.columns, &r.cells))
            .collect();

        if rows.is_empty() {
            return Err(diagnostic(
                msg,
                DiagnosticKind::EmptyTable,
                &format!("table for {} has no instrument rows", date),
            ));
        }

        Ok(DailyReport::new(date, rows))
    }
}

/// Convenience wrapper: extract with the default parsers and return only the
/// reports.
pub fn extract_reports(raw: &str) -> Vec<DailyReport> {
    Extractor::default().extract(raw).reports
}

// ── Row mapping ───────────────────────────────────────────────────────────────

/// Map split cells onto an [`InstrumentRow`]. Returns `None` when the symbol
/// is empty after cleaning; other unparseable cells become `None` fields.
pub fn build_row(columns: &[Option<Field>], cells: &[String]) -> Option<InstrumentRow> {
    let mut row = InstrumentRow::default();

    for (column, cell) in columns.iter().zip(cells) {
        let Some(field) = column else {
            continue;
        };
        match field {
            Field::Symbol => row.symbol = clean_symbol(cell),
            Field::Latest => row.latest = NumberParser::decimal(cell),
            Field::Change => row.change = NumberParser::decimal(cell),
            Field::PctChange => row.pct_change = NumberParser::percent(cell),
            Field::Open => row.open = NumberParser::decimal(cell),
            Field::High => row.high = NumberParser::decimal(cell),
            Field::Low => row.low = NumberParser::decimal(cell),
            Field::Volume => row.volume = NumberParser::volume(cell),
            Field::Time => row.time = TimeParser::parse(cell),
        }
    }

    if row.symbol.is_empty() {
        None
    } else {
        Some(row)
    }
}

fn diagnostic(msg: &RawMessage, kind: DiagnosticKind, detail: &str) -> Diagnostic {
    Diagnostic {
        message_index: msg.index,
        kind,
        detail: detail.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const STACKED_MAIL: &str = "\
Subject: Watchlist
End-of-Day Recap - Price quotes for Tue, January 27, 2026

Symbol
Latest
Change
%Change
Open
High
Low
Volume
Time
$ES
6,950.25
+12.50s
+0.18%
6,940.00
6,961.75
6,931.50
1,234,567
4:59P
^USDCHF
0.7912
-0.0031
-0.39%
0.7943
0.7950
0.7901
N/A
4:59P
";

    // ── extract ───────────────────────────────────────────────────────────────

    #[test]
    fn test_extract_two_tagged_csv_messages() {
        let raw = "Date: 2024-02-08\nAAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30\n\
                   ---MSG---\n\
                   Date: 2024-02-09\nBBB,2.0,-0.2,-2.0%,2.1,2.2,1.9,2000,09:31";
        let ex = Extractor::default().extract(raw);
        assert_eq!(ex.messages, 2);
        assert!(ex.diagnostics.is_empty());
        assert_eq!(ex.reports.len(), 2);

        let first = &ex.reports[0];
        assert_eq!(first.date, date(2024, 2, 8));
        assert_eq!(first.rows.len(), 1);
        let row = &first.rows[0];
        assert_eq!(row.symbol, "AAA");
        assert_eq!(row.latest, Some(dec!(1.0)));
        assert_eq!(row.change, Some(dec!(0.1)));
        assert_eq!(row.pct_change, Some(dec!(1.0)));
        assert_eq!(row.open, Some(dec!(0.9)));
        assert_eq!(row.high, Some(dec!(1.1)));
        assert_eq!(row.low, Some(dec!(0.8)));
        assert_eq!(row.volume, Some(1000));
        assert_eq!(row.time, NaiveTime::from_hms_opt(9, 30, 0));

        assert_eq!(ex.reports[1].date, date(2024, 2, 9));
        assert_eq!(ex.reports[1].rows[0].symbol, "BBB");
        assert_eq!(ex.reports[1].rows[0].pct_change, Some(dec!(-2.0)));
    }

    #[test]
    fn test_extract_stacked_recap_mail() {
        let ex = Extractor::default().extract(STACKED_MAIL);
        assert_eq!(ex.reports.len(), 1);
        let report = &ex.reports[0];
        assert_eq!(report.date, date(2026, 1, 27));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].symbol, "ES");
        assert_eq!(report.rows[0].latest, Some(dec!(6950.25)));
        assert_eq!(report.rows[0].change, Some(dec!(12.50)));
        assert_eq!(report.rows[0].volume, Some(1_234_567));
        assert_eq!(report.rows[0].time, NaiveTime::from_hms_opt(16, 59, 0));
        assert_eq!(report.rows[1].symbol, "USDCHF");
        assert_eq!(report.rows[1].volume, None);
    }

    #[test]
    fn test_extract_unparseable_volume_is_null() {
        let raw = "Date: 2024-02-08\nAAA,1.0,0.1,1.0%,0.9,1.1,0.8,lots,09:30";
        let ex = Extractor::default().extract(raw);
        let row = &ex.reports[0].rows[0];
        assert_eq!(row.volume, None);
        assert_eq!(row.latest, Some(dec!(1.0)));
        assert_eq!(row.low, Some(dec!(0.8)));
        assert_eq!(row.time, NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn test_extract_missing_date_is_skipped() {
        let raw = "AAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30\n---MSG---\n\
                   Date: 2024-02-09\nBBB,2.0,-0.2,-2.0%,2.1,2.2,1.9,2000,09:31";
        let ex = Extractor::default().extract(raw);
        assert_eq!(ex.messages, 2);
        assert_eq!(ex.reports.len(), 1);
        assert_eq!(ex.reports[0].date, date(2024, 2, 9));
        assert_eq!(ex.diagnostics.len(), 1);
        assert_eq!(ex.diagnostics[0].kind, DiagnosticKind::MissingDate);
        assert_eq!(ex.diagnostics[0].message_index, 0);
    }

    #[test]
    fn test_extract_unrecognized_layout() {
        let raw = "Date: 2024-02-09\nNo quotes were published today.";
        let ex = Extractor::default().extract(raw);
        assert!(ex.reports.is_empty());
        assert_eq!(ex.diagnostics[0].kind, DiagnosticKind::UnrecognizedLayout);
    }

    #[test]
    fn test_extract_empty_and_blank_input() {
        let ex = Extractor::default().extract("");
        assert_eq!(ex.messages, 0);
        assert!(ex.reports.is_empty());
        assert!(ex.diagnostics.is_empty());

        let ex = Extractor::default().extract("\n---MSG---\n   \n");
        assert_eq!(ex.messages, 0);
    }

    #[test]
    fn test_extract_preserves_input_order_and_duplicates() {
        let raw = "Date: 2024-02-09\nBBB,2,0,0%,2,2,2,1,09:31\n---MSG---\n\
                   Date: 2024-02-08\nAAA,1,0,0%,1,1,1,1,09:30\n---MSG---\n\
                   Date: 2024-02-09\nBBB,2,0,0%,2,2,2,1,09:31";
        let dates: Vec<NaiveDate> = extract_reports(raw).iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 2, 9), date(2024, 2, 8), date(2024, 2, 9)]);
    }

    #[test]
    fn test_body_date_token_outside_table() {
        let raw = "Watchlist for 2024-03-01\n\
                   ES,5100,10,0.2%,5090,5110,5080,100,16:00\n\
                   NQ,18000,-5,-0.03%,18005,18050,17950,200,16:00";
        let reports = extract_reports(raw);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].date, date(2024, 3, 1));
        assert_eq!(reports[0].rows.len(), 2);
    }

    // ── build_row ─────────────────────────────────────────────────────────────

    #[test]
    fn test_build_row_with_header_columns() {
        let columns = vec![Some(Field::Symbol), None, Some(Field::Volume)];
        let cells = vec!["$SPX".to_string(), "ignored".to_string(), "12.5K".to_string()];
        let row = build_row(&columns, &cells).unwrap();
        assert_eq!(row.symbol, "SPX");
        assert_eq!(row.volume, Some(12_500));
        assert_eq!(row.latest, None);
    }

    #[test]
    fn test_build_row_requires_symbol() {
        let columns = vec![Some(Field::Symbol), Some(Field::Latest)];
        let cells = vec!["$^".to_string(), "1.0".to_string()];
        assert!(build_row(&columns, &cells).is_none());
    }
}

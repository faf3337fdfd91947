//! Table layout sniffing.
//!
//! Watchlist mails arrive comma-, tab- or space-aligned, or in the "stacked"
//! form the mail client produces where every cell sits on its own line
//! below a `Symbol` header. Each layout is a [`CandidateParser`]; all of them
//! are run over the body and the one matching the largest share of its
//! candidate lines wins.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use watchlist_core::data_processors::{clean_symbol, NumberParser, TimeParser};
use watchlist_core::models::Field;

/// Minimum share of candidate lines a layout must match to be trusted.
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Longest string still accepted as an instrument symbol.
const MAX_SYMBOL_LEN: usize = 15;

fn multi_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" {2,}").expect("regex is valid"))
}

// ── LayoutMatch ───────────────────────────────────────────────────────────────

/// One table row as split by a layout, with the body lines it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub lines: Vec<usize>,
}

/// The result of running one [`CandidateParser`] over a message body.
#[derive(Debug, Clone)]
pub struct LayoutMatch {
    /// Name of the layout that produced this match.
    pub layout: &'static str,
    /// Field carried by each column; `None` for unrecognised header columns.
    pub columns: Vec<Option<Field>>,
    /// Rows that split into exactly `columns.len()` cells.
    pub rows: Vec<TableRow>,
    /// Lines that looked like table rows for this layout, matched or not.
    pub candidates: usize,
    /// Lines consumed as column headers.
    pub header_lines: Vec<usize>,
}

impl LayoutMatch {
    fn empty(layout: &'static str) -> Self {
        Self {
            layout,
            columns: positional_columns(),
            rows: Vec::new(),
            candidates: 0,
            header_lines: Vec::new(),
        }
    }

    /// Share of candidate lines that matched the expected column count.
    pub fn score(&self) -> f64 {
        if self.candidates == 0 {
            0.0
        } else {
            self.rows.len() as f64 / self.candidates as f64
        }
    }

    /// Body line indices that belong to the table (headers and rows).
    pub fn table_lines(&self) -> HashSet<usize> {
        self.header_lines
            .iter()
            .copied()
            .chain(self.rows.iter().flat_map(|r| r.lines.iter().copied()))
            .collect()
    }
}

// ── CandidateParser ───────────────────────────────────────────────────────────

/// A table layout the extractor can try.
pub trait CandidateParser {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Split `lines` into rows, ignoring the line indices in `skip`.
    fn parse(&self, lines: &[&str], skip: &HashSet<usize>) -> LayoutMatch;
}

/// Column order used when a table carries no header row.
pub fn positional_columns() -> Vec<Option<Field>> {
    Field::ALL.iter().copied().map(Some).collect()
}

/// Whether `cell` can be an instrument symbol: starts with a letter after the
/// `$`/`^` markers, has no inner whitespace or `:`, and is not a number,
/// time or null token.
pub fn looks_like_symbol(cell: &str) -> bool {
    let cleaned = clean_symbol(cell);
    let Some(first) = cleaned.chars().next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && cleaned.len() <= MAX_SYMBOL_LEN
        && !cleaned.contains(char::is_whitespace)
        && !cleaned.contains(':')
        && !cleaned.contains('/')
        && !matches!(cleaned.to_lowercase().as_str(), "na" | "none" | "null" | "unch")
        && NumberParser::decimal(&cleaned).is_none()
        && TimeParser::parse(&cleaned).is_none()
}

/// Map a header row to columns. Requires a `Symbol` column.
fn header_columns(cells: &[String]) -> Option<Vec<Option<Field>>> {
    let columns: Vec<Option<Field>> = cells.iter().map(|c| Field::from_header(c)).collect();
    if columns.contains(&Some(Field::Symbol)) && columns.iter().flatten().count() >= 2 {
        Some(columns)
    } else {
        None
    }
}

fn symbol_position(columns: &[Option<Field>]) -> usize {
    columns
        .iter()
        .position(|c| *c == Some(Field::Symbol))
        .unwrap_or(0)
}

// ── Delimited layouts ─────────────────────────────────────────────────────────

/// Cell separator for single-line row layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    /// A run of two or more spaces.
    MultiSpace,
}

impl Delimiter {
    /// Split `line` into trimmed cells.
    pub fn split(self, line: &str) -> Vec<String> {
        match self {
            Delimiter::Comma => split_quoted(line, ','),
            Delimiter::Tab => line.split('\t').map(|c| c.trim().to_string()).collect(),
            Delimiter::MultiSpace => multi_space_re()
                .split(line.trim())
                .map(|c| c.trim().to_string())
                .collect(),
        }
    }
}

/// Split on `sep`, honouring double-quoted cells (`"1,234.50"`).
fn split_quoted(line: &str, sep: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// One row per line, cells separated by a [`Delimiter`].
pub struct DelimitedParser {
    delimiter: Delimiter,
}

impl DelimitedParser {
    pub fn new(delimiter: Delimiter) -> Self {
        Self { delimiter }
    }
}

impl CandidateParser for DelimitedParser {
    fn name(&self) -> &'static str {
        match self.delimiter {
            Delimiter::Comma => "comma",
            Delimiter::Tab => "tab",
            Delimiter::MultiSpace => "multi-space",
        }
    }

    fn parse(&self, lines: &[&str], skip: &HashSet<usize>) -> LayoutMatch {
        let mut result = LayoutMatch::empty(self.name());

        for (i, line) in lines.iter().enumerate() {
            if skip.contains(&i) || line.trim().is_empty() {
                continue;
            }
            let cells = self.delimiter.split(line);
            if cells.len() < 2 {
                continue;
            }

            if cells[0].eq_ignore_ascii_case(Field::Symbol.header()) {
                if let Some(columns) = header_columns(&cells) {
                    result.columns = columns;
                    result.header_lines.push(i);
                    continue;
                }
            }

            result.candidates += 1;
            let symbol_at = symbol_position(&result.columns);
            if cells.len() == result.columns.len() && looks_like_symbol(&cells[symbol_at]) {
                result.rows.push(TableRow {
                    cells,
                    lines: vec![i],
                });
            }
        }

        result
    }
}

// ── Stacked layout ────────────────────────────────────────────────────────────

/// One cell per line: a `Symbol` line, the remaining header names one per
/// line, then each row's cells in order.
pub struct StackedParser;

impl CandidateParser for StackedParser {
    fn name(&self) -> &'static str {
        "stacked"
    }

    fn parse(&self, lines: &[&str], skip: &HashSet<usize>) -> LayoutMatch {
        let mut result = LayoutMatch::empty(self.name());

        let usable: Vec<(usize, &str)> = lines
            .iter()
            .enumerate()
            .filter(|(i, l)| !skip.contains(i) && !l.trim().is_empty())
            .map(|(i, l)| (i, l.trim()))
            .collect();

        let Some(start) = usable
            .iter()
            .position(|(_, l)| l.eq_ignore_ascii_case(Field::Symbol.header()))
        else {
            return result;
        };

        let mut columns = vec![Some(Field::Symbol)];
        let mut header_lines = vec![usable[start].0];
        let mut pos = start + 1;
        while pos < usable.len() {
            match Field::from_header(usable[pos].1) {
                Some(field) if !columns.contains(&Some(field)) => {
                    columns.push(Some(field));
                    header_lines.push(usable[pos].0);
                    pos += 1;
                }
                _ => break,
            }
        }
        if columns.len() < 2 {
            return result;
        }

        let width = columns.len();
        let data = &usable[pos..];
        let mut i = 0;
        while i < data.len() {
            if !looks_like_symbol(data[i].1) {
                i += 1;
                continue;
            }
            result.candidates += 1;

            let end = i + width;
            let fits = end <= data.len() && data[i + 1..end].iter().all(|(_, c)| !looks_like_symbol(c));
            if fits {
                result.rows.push(TableRow {
                    cells: data[i..end].iter().map(|(_, c)| c.to_string()).collect(),
                    lines: data[i..end].iter().map(|(n, _)| *n).collect(),
                });
                i = end;
            } else {
                i += 1;
            }
        }

        result.columns = columns;
        result.header_lines = header_lines;
        result
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// The built-in layouts in priority order: comma, tab, multi-space, stacked.
pub fn default_parsers() -> Vec<Box<dyn CandidateParser>> {
    vec![
        Box::new(DelimitedParser::new(Delimiter::Comma)),
        Box::new(DelimitedParser::new(Delimiter::Tab)),
        Box::new(DelimitedParser::new(Delimiter::MultiSpace)),
        Box::new(StackedParser),
    ]
}

/// Run every parser and return the highest-scoring match.
///
/// Ties go to the earlier parser. Returns `None` when no layout matches at
/// least [`MIN_CONFIDENCE`] of its candidate lines.
pub fn sniff(
    parsers: &[Box<dyn CandidateParser>],
    lines: &[&str],
    skip: &HashSet<usize>,
) -> Option<LayoutMatch> {
    let mut best: Option<LayoutMatch> = None;

    for parser in parsers {
        let candidate = parser.parse(lines, skip);
        tracing::trace!(
            layout = candidate.layout,
            rows = candidate.rows.len(),
            candidates = candidate.candidates,
            "layout scored"
        );
        if candidate.rows.is_empty() {
            continue;
        }
        let better = best
            .as_ref()
            .map(|b| candidate.score() > b.score())
            .unwrap_or(true);
        if better {
            best = Some(candidate);
        }
    }

    best.filter(|b| b.score() >= MIN_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_skip() -> HashSet<usize> {
        HashSet::new()
    }

    // ── looks_like_symbol ─────────────────────────────────────────────────────

    #[test]
    fn test_looks_like_symbol() {
        assert!(looks_like_symbol("AAA"));
        assert!(looks_like_symbol("$SPX"));
        assert!(looks_like_symbol("^USDCHF"));
        assert!(looks_like_symbol("ESH26"));
        assert!(!looks_like_symbol("1.0"));
        assert!(!looks_like_symbol("4:59P"));
        assert!(!looks_like_symbol("N/A"));
        assert!(!looks_like_symbol("unch"));
        assert!(!looks_like_symbol("Quotes delayed 10 minutes"));
        assert!(!looks_like_symbol(""));
    }

    // ── Delimiter::split ──────────────────────────────────────────────────────

    #[test]
    fn test_comma_split_honours_quotes() {
        let cells = Delimiter::Comma.split(r#"ES,"5,012.25",+1.5"#);
        assert_eq!(cells, vec!["ES", "5,012.25", "+1.5"]);
    }

    #[test]
    fn test_multi_space_split_keeps_single_spaces() {
        let cells = Delimiter::MultiSpace.split("  ES   5012.25  4:59 PM ");
        assert_eq!(cells, vec!["ES", "5012.25", "4:59 PM"]);
    }

    // ── DelimitedParser ───────────────────────────────────────────────────────

    #[test]
    fn test_comma_rows_positional() {
        let lines = ["AAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30"];
        let m = DelimitedParser::new(Delimiter::Comma).parse(&lines, &no_skip());
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.candidates, 1);
        assert_eq!(m.score(), 1.0);
        assert_eq!(m.rows[0].cells[0], "AAA");
    }

    #[test]
    fn test_comma_header_defines_columns() {
        let lines = ["Symbol,Latest,Volume", "ES,5012.25,1200", "NQ,17500,900"];
        let m = DelimitedParser::new(Delimiter::Comma).parse(&lines, &no_skip());
        assert_eq!(m.header_lines, vec![0]);
        assert_eq!(
            m.columns,
            vec![Some(Field::Symbol), Some(Field::Latest), Some(Field::Volume)]
        );
        assert_eq!(m.rows.len(), 2);
    }

    #[test]
    fn test_inconsistent_rows_are_dropped() {
        let lines = [
            "AAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30",
            "BBB,2.0,0.2",
            "CCC,3.0,0.3,1.0%,2.9,3.1,2.8,3000,09:32",
        ];
        let m = DelimitedParser::new(Delimiter::Comma).parse(&lines, &no_skip());
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.candidates, 3);
    }

    #[test]
    fn test_skip_lines_are_ignored() {
        let lines = ["Price quotes for Tue, January 27, 2026", "AAA,1,1,1%,1,1,1,1,09:30"];
        let skip: HashSet<usize> = [0].into_iter().collect();
        let m = DelimitedParser::new(Delimiter::Comma).parse(&lines, &skip);
        assert_eq!(m.candidates, 1);
        assert_eq!(m.score(), 1.0);
    }

    // ── StackedParser ─────────────────────────────────────────────────────────

    #[test]
    fn test_stacked_layout() {
        let lines = [
            "Symbol", "Latest", "Change", "%Change", "Open", "High", "Low", "Volume", "Time",
            "$ES", "5,012.25", "+12.50", "+0.25%", "4,999.75", "5,020.00", "4,990.00", "1,234,567", "4:59P",
            "", "^USDCHF", "0.8812", "-0.0010", "-0.11%", "0.8822", "0.8830", "0.8801", "N/A", "4:59P",
        ];
        let m = StackedParser.parse(&lines, &no_skip());
        assert_eq!(m.columns.len(), 9);
        assert_eq!(m.rows.len(), 2);
        assert_eq!(m.rows[1].cells[0], "^USDCHF");
        assert_eq!(m.score(), 1.0);
        assert_eq!(m.header_lines.len(), 9);
    }

    #[test]
    fn test_stacked_resyncs_after_missing_cell() {
        let lines = [
            "Symbol", "Latest", "Change",
            "AAA", "1.0",
            "BBB", "2.0", "+0.1",
        ];
        let m = StackedParser.parse(&lines, &no_skip());
        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].cells, vec!["BBB", "2.0", "+0.1"]);
        assert_eq!(m.candidates, 2);
    }

    #[test]
    fn test_stacked_without_symbol_header() {
        let m = StackedParser.parse(&["AAA", "1.0"], &no_skip());
        assert!(m.rows.is_empty());
        assert_eq!(m.candidates, 0);
    }

    // ── sniff ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_sniff_prefers_tab_over_garbled_comma() {
        let lines = [
            "ES\t5,012.25\t+12.50\t+0.25%\t4,999.75\t5,020.00\t4,990.00\t1,234,567\t16:59",
            "NQ\t17,500.00\t-20.00\t-0.11%\t17,520.00\t17,560.00\t17,480.00\t654,321\t16:59",
        ];
        let m = sniff(&default_parsers(), &lines, &no_skip()).unwrap();
        assert_eq!(m.layout, "tab");
        assert_eq!(m.rows.len(), 2);
    }

    #[test]
    fn test_sniff_multi_space_table() {
        let lines = [
            "Symbol  Latest  Change  %Change  Open  High  Low  Volume  Time",
            "ES  5012.25  12.50  0.25%  4999.75  5020.00  4990.00  1234567  4:59 PM",
        ];
        let m = sniff(&default_parsers(), &lines, &no_skip()).unwrap();
        assert_eq!(m.layout, "multi-space");
        assert_eq!(m.rows.len(), 1);
    }

    #[test]
    fn test_sniff_rejects_minority_match() {
        let lines = [
            "AAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30",
            "junk,row",
            "more,junk,here",
            "and,more",
        ];
        assert!(sniff(&default_parsers(), &lines, &no_skip()).is_none());
    }

    #[test]
    fn test_sniff_no_table() {
        let lines = ["Hello", "no quotes today"];
        assert!(sniff(&default_parsers(), &lines, &no_skip()).is_none());
    }
}

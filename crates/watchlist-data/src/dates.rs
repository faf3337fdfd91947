//! Report date resolution.
//!
//! A date is taken from the message content first (the recap header, then
//! any explicit date token outside the quote table) and only then from the
//! delivery metadata. A message with neither is never assigned a guessed
//! date.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::splitter::RawMessage;

// ── Patterns ──────────────────────────────────────────────────────────────────

fn recap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)price quotes for\s+(.+?)\s*$").expect("regex is valid"))
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("regex is valid"))
}

fn long_form_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b",
        )
        .expect("regex is valid")
    })
}

fn us_slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("regex is valid"))
}

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

// ── DateSource ────────────────────────────────────────────────────────────────

/// Where a report's date was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// `Price quotes for <date>` in the subject or body.
    RecapHeader,
    /// A standalone date token in the body.
    BodyToken,
    /// The `Date:` / `Received:` delivery metadata.
    Delivery,
}

// ── Token parsing ─────────────────────────────────────────────────────────────

/// Find the first date token in `text`, trying ISO, long-form
/// (`Tue, January 27, 2026`) and US slash (`1/27/2026`) forms in that order.
pub fn find_date_token(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = iso_re().captures(text) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if date.is_some() {
            return date;
        }
    }

    if let Some(caps) = long_form_re().captures(text) {
        let prefix = caps[1].to_lowercase();
        let month = MONTH_PREFIXES.iter().position(|m| *m == prefix)? as u32 + 1;
        let date =
            NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, caps[2].parse().ok()?);
        if date.is_some() {
            return date;
        }
    }

    if let Some(caps) = us_slash_re().captures(text) {
        return NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        );
    }

    None
}

/// Parse a delivery timestamp (`Date:` header value).
///
/// RFC 2822 and RFC 3339 timestamps resolve to the calendar date in their
/// own offset; anything else falls back to [`find_date_token`].
pub fn parse_delivery_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    find_date_token(value)
}

/// Date carried by a `Price quotes for <date>` phrase on `line`, if any.
pub fn recap_date(line: &str) -> Option<NaiveDate> {
    let caps = recap_re().captures(line)?;
    find_date_token(&caps[1])
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Resolve the report date for `msg`.
///
/// `table_lines` holds the body line indices that belong to the quote table;
/// they are not searched for standalone date tokens so that a stale quote
/// dated in the time column cannot re-date the report.
pub fn resolve_date(
    msg: &RawMessage,
    table_lines: &HashSet<usize>,
) -> Option<(NaiveDate, DateSource)> {
    let subject_recap = msg.metadata_value("subject").and_then(recap_date);
    let body_recap = || msg.body.lines().find_map(recap_date);
    if let Some(date) = subject_recap.or_else(body_recap) {
        debug!("message #{}: date {} from recap header", msg.index + 1, date);
        return Some((date, DateSource::RecapHeader));
    }

    let body_token = msg
        .body
        .lines()
        .enumerate()
        .filter(|(i, _)| !table_lines.contains(i))
        .find_map(|(_, line)| find_date_token(line));
    if let Some(date) = body_token {
        debug!("message #{}: date {} from body token", msg.index + 1, date);
        return Some((date, DateSource::BodyToken));
    }

    let delivered = ["date", "received"]
        .iter()
        .filter_map(|key| msg.metadata_value(key))
        .find_map(parse_delivery_date);
    if let Some(date) = delivered {
        debug!("message #{}: date {} from delivery metadata", msg.index + 1, date);
        return Some((date, DateSource::Delivery));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── find_date_token ───────────────────────────────────────────────────────

    #[test]
    fn test_find_iso_token() {
        assert_eq!(find_date_token("as of 2024-02-08 close"), Some(date(2024, 2, 8)));
    }

    #[test]
    fn test_find_long_form_token() {
        assert_eq!(find_date_token("Tue, January 27, 2026"), Some(date(2026, 1, 27)));
        assert_eq!(find_date_token("Sept. 3 2025"), Some(date(2025, 9, 3)));
        assert_eq!(find_date_token("feb 29, 2024"), Some(date(2024, 2, 29)));
    }

    #[test]
    fn test_find_us_slash_token() {
        assert_eq!(find_date_token("1/27/2026"), Some(date(2026, 1, 27)));
    }

    #[test]
    fn test_find_rejects_impossible_dates() {
        assert_eq!(find_date_token("2024-02-30"), None);
        assert_eq!(find_date_token("February 30, 2024"), None);
        assert_eq!(find_date_token("09:30"), None);
    }

    // ── parse_delivery_date ───────────────────────────────────────────────────

    #[test]
    fn test_delivery_rfc2822_keeps_local_date() {
        // 23:30 in New York is already the next day in UTC.
        assert_eq!(
            parse_delivery_date("Tue, 27 Jan 2026 23:30:00 -0500"),
            Some(date(2026, 1, 27))
        );
    }

    #[test]
    fn test_delivery_rfc3339_and_iso() {
        assert_eq!(parse_delivery_date("2024-02-09T18:00:00Z"), Some(date(2024, 2, 9)));
        assert_eq!(parse_delivery_date("2024-02-08"), Some(date(2024, 2, 8)));
        assert_eq!(
            parse_delivery_date("Tuesday, January 27, 2026 at 6:05:00 PM"),
            Some(date(2026, 1, 27))
        );
        assert_eq!(parse_delivery_date(""), None);
    }

    // ── resolve_date ──────────────────────────────────────────────────────────

    #[test]
    fn test_recap_header_wins_over_delivery() {
        let msg = RawMessage::parse(
            0,
            "Date: Wed, 28 Jan 2026 07:00:00 +0000\n\
             End-of-Day Recap - Price quotes for Tue, January 27, 2026\nSymbol",
        );
        let (d, source) = resolve_date(&msg, &HashSet::new()).unwrap();
        assert_eq!(d, date(2026, 1, 27));
        assert_eq!(source, DateSource::RecapHeader);
    }

    #[test]
    fn test_recap_in_subject() {
        let msg = RawMessage::parse(
            0,
            "Subject: End-of-Day Recap - Price quotes for Fri, March 6, 2026\nbody",
        );
        let (d, source) = resolve_date(&msg, &HashSet::new()).unwrap();
        assert_eq!(d, date(2026, 3, 6));
        assert_eq!(source, DateSource::RecapHeader);
    }

    #[test]
    fn test_table_lines_are_not_searched() {
        let msg = RawMessage::parse(0, "Date: 2024-02-09\nZN,110.5,0,0%,110,111,110,5,2024-01-02");
        let table: HashSet<usize> = [0].into_iter().collect();
        let (d, source) = resolve_date(&msg, &table).unwrap();
        assert_eq!(d, date(2024, 2, 9));
        assert_eq!(source, DateSource::Delivery);
    }

    #[test]
    fn test_no_date_anywhere() {
        let msg = RawMessage::parse(0, "AAA,1.0,0.1,1.0%,0.9,1.1,0.8,1000,09:30");
        let table: HashSet<usize> = [0].into_iter().collect();
        assert!(resolve_date(&msg, &table).is_none());
    }
}

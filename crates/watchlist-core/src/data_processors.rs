use std::str::FromStr;

use chrono::NaiveTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::trace;

/// Cell contents that mean "no value" rather than a malformed number.
const NULL_TOKENS: &[&str] = &["", "-", "--", "n/a", "na", "none", "null", "unch"];

// ── NumberParser ──────────────────────────────────────────────────────────────

/// Lenient numeric coercion for the quote cells found in watchlist mails.
pub struct NumberParser;

impl NumberParser {
    /// Parse a price-like cell into a [`Decimal`].
    ///
    /// Handles:
    /// * leading `+` and unicode minus signs,
    /// * thousands separators (`1,234.50`),
    /// * parenthesised negatives (`(1.25)` → `-1.25`),
    /// * a trailing `%` (the value is kept in percent units),
    /// * a trailing settlement marker `s` (`5012.25s`).
    ///
    /// Returns `None` for null tokens and anything that is not a number.
    pub fn decimal(raw: &str) -> Option<Decimal> {
        let mut s = raw.trim().replace('\u{2212}', "-");
        if NULL_TOKENS.contains(&s.to_lowercase().as_str()) {
            return None;
        }

        let mut negative = false;
        if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
            negative = true;
            s = s[1..s.len() - 1].trim().to_string();
        }

        let cleaned: String = s
            .trim_end_matches(['%', 's', 'S'])
            .trim_start_matches('+')
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        let value = match Decimal::from_str(&cleaned) {
            Ok(v) => v,
            Err(_) => {
                trace!("NumberParser: not a number \"{}\"", raw);
                return None;
            }
        };

        Some(if negative { -value.abs() } else { value })
    }

    /// Parse a percentage cell (`-2.0%`, `+0.35%`, `(1.1%)`) in percent units.
    pub fn percent(raw: &str) -> Option<Decimal> {
        Self::decimal(raw)
    }

    /// Parse a volume cell into a whole number of contracts.
    ///
    /// Accepts thousands separators and `K` / `M` / `B` magnitude suffixes
    /// (`12.5K` → 12 500). Negative volumes are rejected.
    pub fn volume(raw: &str) -> Option<u64> {
        let trimmed = raw.trim();
        let (body, multiplier) = match trimmed.chars().last() {
            Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000u32)),
            Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000_000u32)),
            Some('b' | 'B') => (&trimmed[..trimmed.len() - 1], Decimal::from(1_000_000_000u64)),
            _ => (trimmed, Decimal::ONE),
        };

        let value = Self::decimal(body)?.checked_mul(multiplier)?;
        if value.is_sign_negative() {
            return None;
        }
        value.round().to_u64()
    }
}

// ── TimeParser ────────────────────────────────────────────────────────────────

/// Parses the quote time-of-day column.
pub struct TimeParser;

impl TimeParser {
    /// Parse `09:30`, `09:30:15`, `4:59 PM`, `4:59PM` or the compact
    /// `4:59P` form. A trailing timezone abbreviation (`ET`, `CST`) is
    /// ignored.
    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }

        // Drop trailing zone abbreviations, keep AM/PM markers.
        let mut tokens: Vec<&str> = upper.split_whitespace().collect();
        while tokens.len() > 1 {
            let last = tokens[tokens.len() - 1];
            let is_zone = (2..=4).contains(&last.len())
                && last.chars().all(|c| c.is_ascii_alphabetic())
                && last != "AM"
                && last != "PM";
            if is_zone {
                tokens.pop();
            } else {
                break;
            }
        }
        let mut s = tokens.join(" ");
        if s.ends_with('A') || s.ends_with('P') {
            s.push('M');
        }

        const FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%I:%M%p", "%I:%M:%S%p"];
        for fmt in FORMATS {
            if let Ok(t) = NaiveTime::parse_from_str(&s, fmt) {
                return Some(t);
            }
        }

        trace!("TimeParser: not a time \"{}\"", raw);
        None
    }
}

// ── Symbols ───────────────────────────────────────────────────────────────────

/// Strip the `$` (index) and `^` (currency) markers the mail client adds to
/// symbols, along with surrounding whitespace.
pub fn clean_symbol(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '$' && *c != '^')
        .collect::<String>()
        .trim()
        .to_string()
}

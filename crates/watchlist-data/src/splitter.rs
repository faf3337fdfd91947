//! Splitting the raw input batch into individual messages.

use std::sync::OnceLock;

use regex::Regex;

/// Literal token the mail-extraction script places between message bodies.
pub const SEPARATOR: &str = "---MSG---";

/// Header keys recognised as delivery metadata at the top of a message.
const METADATA_KEYS: &[&str] = &["date", "received", "subject", "from"];

fn metadata_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z][A-Za-z-]*)\s*:\s*(.*?)\s*$").expect("regex is valid"))
}

// ── RawMessage ────────────────────────────────────────────────────────────────

/// One message body with its leading metadata lines separated out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Zero-based position in the input batch (after empty segments are
    /// dropped).
    pub index: usize,
    /// `(key, value)` pairs with lower-cased keys, in input order.
    pub metadata: Vec<(String, String)>,
    /// Everything after the metadata lines.
    pub body: String,
}

impl RawMessage {
    /// Split leading `Date:` / `Received:` / `Subject:` / `From:` lines off
    /// a message.
    pub fn parse(index: usize, text: &str) -> Self {
        let mut metadata = Vec::new();
        let mut lines = text.lines().peekable();

        while let Some(line) = lines.peek() {
            let Some(caps) = metadata_re().captures(line) else {
                break;
            };
            let key = caps[1].to_lowercase();
            if !METADATA_KEYS.contains(&key.as_str()) {
                break;
            }
            metadata.push((key, caps[2].to_string()));
            lines.next();
        }

        let body = lines
            .map(|l| l.trim_end_matches('\r'))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            index,
            metadata,
            body,
        }
    }

    /// First metadata value stored under `key` (lower-case).
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Split `raw` on [`SEPARATOR`], dropping empty and whitespace-only
/// segments. Kept segments are trimmed.
pub fn split_messages(raw: &str) -> Vec<&str> {
    raw.split(SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// [`split_messages`] followed by [`RawMessage::parse`] on each segment.
pub fn parse_messages(raw: &str) -> Vec<RawMessage> {
    split_messages(raw)
        .into_iter()
        .enumerate()
        .map(|(i, text)| RawMessage::parse(i, text))
        .collect()
}

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name onto an [`EnvFilter`] directive.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber on stderr.
///
/// stdout is reserved for the `--json` summary. Falls back to `"info"` if
/// the level string is not recognised.
pub fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(layer).init();
}

// ── Input ──────────────────────────────────────────────────────────────────────

/// Decode raw input, replacing invalid UTF-8 rather than failing.
pub fn decode_input(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                "Input is not valid UTF-8 (at byte {}); decoding lossily",
                e.utf8_error().valid_up_to()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Read the message batch from `path`, or from stdin when `None`.
pub fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    let bytes = match path {
        Some(p) => std::fs::read(p).with_context(|| format!("reading {}", p.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    Ok(decode_input(bytes))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── filter_directive ──────────────────────────────────────────────────────

    #[test]
    fn test_filter_directive_maps_level_names() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("info"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("ERROR"), "error");
    }

    // ── input ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_input_lossy() {
        let text = decode_input(vec![b'A', 0xFF, b'B']);
        assert_eq!(text, "A\u{FFFD}B");
    }

    #[test]
    fn test_read_input_from_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("batch.txt");
        std::fs::write(&path, "Date: 2024-02-08\n").expect("write batch");
        assert_eq!(read_input(Some(path.as_path())).unwrap(), "Date: 2024-02-08\n");
    }

    #[test]
    fn test_read_input_missing_file_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(read_input(Some(tmp.path().join("absent.txt").as_path())).is_err());
    }
}

use clap::Parser;
use std::path::{Path, PathBuf};

use crate::calendar::WORKBOOK_EXTENSION;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Archive daily futures watchlist mails into monthly spreadsheets
#[derive(Parser, Debug, Clone)]
#[command(
    name = "watchlist",
    about = "Archive daily futures watchlist mails into monthly spreadsheets",
    version
)]
pub struct Settings {
    /// Archive root directory (an .xlsx path selects its parent directory)
    #[arg(long, short = 'o', env = "WATCHLIST_OUT")]
    pub out: PathBuf,

    /// Read messages from this file instead of standard input
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Keep every year's month workbooks directly in the archive root
    /// (the same month of different years then shares one file)
    #[arg(long)]
    pub flat: bool,

    /// Extract and report without touching the archive
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON run summary on stdout
    #[arg(long)]
    pub json: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Directory holding the month workbooks.
    ///
    /// `--out ~/Documents/watchlist_summary.xlsx` (a workbook path, as older
    /// wrappers pass it) resolves to `~/Documents`; any other path is used
    /// as the directory itself.
    pub fn archive_root(&self) -> PathBuf {
        resolve_archive_root(&self.out)
    }

    /// Whether workbooks are placed under `<root>/<year>/`. On unless
    /// `--flat` is given.
    pub fn year_dirs(&self) -> bool {
        !self.flat
    }

    /// Log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

/// See [`Settings::archive_root`].
pub fn resolve_archive_root(out: &Path) -> PathBuf {
    let is_workbook = out
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(WORKBOOK_EXTENSION))
        .unwrap_or(false);

    if is_workbook {
        match out.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    } else {
        out.to_path_buf()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Settings {
        let mut argv = vec!["watchlist"];
        argv.extend_from_slice(args);
        Settings::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let s = parse(&["--out", "/data/archive"]);
        assert_eq!(s.out, PathBuf::from("/data/archive"));
        assert!(s.input.is_none());
        assert!(!s.flat);
        assert!(s.year_dirs());
        assert!(!s.dry_run);
        assert!(!s.json);
        assert_eq!(s.log_level, "INFO");
    }

    #[test]
    fn test_flat_disables_year_dirs() {
        let s = parse(&["--out", "/data/archive", "--flat"]);
        assert!(!s.year_dirs());
    }

    #[test]
    fn test_out_is_required() {
        let result = Settings::try_parse_from(["watchlist"]);
        // WATCHLIST_OUT may be set in the environment running the tests.
        if std::env::var_os("WATCHLIST_OUT").is_none() {
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let result = Settings::try_parse_from(["watchlist", "--out", "x", "--log-level", "TRACE"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let s = parse(&["--out", "x", "--log-level", "ERROR", "--debug"]);
        assert_eq!(s.effective_log_level(), "DEBUG");
        let s = parse(&["--out", "x", "--log-level", "ERROR"]);
        assert_eq!(s.effective_log_level(), "ERROR");
    }

    // ── archive_root ──────────────────────────────────────────────────────────

    #[test]
    fn test_archive_root_directory_path() {
        let s = parse(&["--out", "/data/archive"]);
        assert_eq!(s.archive_root(), PathBuf::from("/data/archive"));
    }

    #[test]
    fn test_archive_root_workbook_path_uses_parent() {
        let s = parse(&["--out", "/home/u/Documents/watchlist_summary.xlsx"]);
        assert_eq!(s.archive_root(), PathBuf::from("/home/u/Documents"));
    }

    #[test]
    fn test_archive_root_bare_workbook_name() {
        assert_eq!(
            resolve_archive_root(Path::new("summary.XLSX")),
            PathBuf::from(".")
        );
    }
}

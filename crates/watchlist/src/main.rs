mod bootstrap;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use watchlist_core::settings::Settings;
use watchlist_runtime::{run, RunOptions};

fn main() -> Result<ExitCode> {
    let settings = Settings::parse();
    bootstrap::setup_logging(settings.effective_log_level());

    tracing::info!("watchlist v{} starting", env!("CARGO_PKG_VERSION"));

    let input = bootstrap::read_input(settings.input.as_deref())?;
    if input.trim().is_empty() {
        tracing::info!("No messages found");
        return Ok(ExitCode::SUCCESS);
    }

    let options = RunOptions::from(&settings);
    tracing::info!("Archive root: {}", options.archive_root.display());

    let summary = match run(&input, &options) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if settings.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    for diagnostic in &summary.diagnostics {
        tracing::debug!("Skipped {}", diagnostic);
    }
    if summary.blocks_written == 0 && summary.is_success() && !options.dry_run {
        tracing::info!("No new dates to archive");
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(
            "{} month(s) failed, {} date(s) refused",
            summary.failures.len(),
            summary.rejected()
        );
        Ok(ExitCode::FAILURE)
    }
}

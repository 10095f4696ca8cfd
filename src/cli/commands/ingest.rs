//! Ingest command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(paths: &[String], settings: Settings) -> Result<()> {
    if paths.is_empty() {
        Output::error("No files given. Usage: fortell ingest <paths...>");
        anyhow::bail!("no input files");
    }
    preflight::check(preflight::Operation::Ingest)?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore().await?;

    let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();

    let spinner = Output::spinner("Ingesting documents...");
    let result = orchestrator.ingest_paths(&paths).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            Output::success(&format!(
                "Indexed {} document(s), {} chunks",
                result.indexed_filenames.len(),
                result.chunks_indexed
            ));
            for name in &result.indexed_filenames {
                Output::list_item(name);
            }
            if !result.skipped.is_empty() {
                Output::warning(&format!("Skipped: {}", result.skipped.join(", ")));
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingest failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}

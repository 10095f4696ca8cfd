//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore().await?;

    let documents = orchestrator.index().list_documents().await?;

    if documents.is_empty() {
        Output::warning("No documents indexed. Use 'fortell ingest <paths...>' first.");
        return Ok(());
    }

    Output::success(&format!("{} document(s) indexed", documents.len()));
    for doc in &documents {
        Output::list_item(&format!(
            "{} ({} pages, {} chunks)",
            doc.filename, doc.page_count, doc.chunk_count
        ));
    }
    Ok(())
}

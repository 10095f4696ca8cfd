//! Search command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, SearchRequest};
use anyhow::Result;

/// Run the search command.
#[allow(clippy::too_many_arguments)]
pub async fn run_search(
    text: Option<String>,
    file: Option<String>,
    page: Option<u32>,
    k: usize,
    fetch_k: Option<usize>,
    min_score: Option<f32>,
    include_self: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Search)?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore().await?;

    let request = SearchRequest {
        text,
        filename: file,
        page_number: page,
        k,
        fetch_k,
        min_score,
        exclude_self: !include_self,
    };

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(&request).await;
    spinner.finish_and_clear();

    match results {
        Ok(hits) => {
            if hits.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", hits.len()));
                for hit in &hits {
                    Output::search_result(
                        &hit.chunk.filename,
                        hit.chunk.page_number,
                        hit.score,
                        &hit.chunk.text,
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}

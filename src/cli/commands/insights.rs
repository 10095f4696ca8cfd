//! Insights command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, SearchRequest};
use anyhow::Result;

/// Run the insights command.
pub async fn run_insights(
    text: Option<String>,
    file: Option<String>,
    page: Option<u32>,
    k: usize,
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Insights)?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore().await?;

    let request = SearchRequest {
        text,
        filename: file,
        page_number: page,
        k,
        fetch_k: None,
        min_score: None,
        exclude_self: false,
    };

    let spinner = Output::spinner("Generating insights...");
    let result = orchestrator.insights(&request).await;
    spinner.finish_and_clear();

    match result {
        Ok(insights) => {
            Output::header("Summary");
            println!("  {}", insights.summary);

            if !insights.insights.is_empty() {
                Output::header("Key takeaways");
                for item in &insights.insights {
                    Output::list_item(item);
                }
            }
            if !insights.facts.is_empty() {
                Output::header("Facts");
                for fact in &insights.facts {
                    Output::list_item(fact);
                }
            }
            if !insights.contradictions.is_empty() {
                Output::header("Potential contradictions");
                for item in &insights.contradictions {
                    Output::list_item(item);
                }
            }
            if !insights.citations.is_empty() {
                Output::header("Citations");
                for citation in &insights.citations {
                    Output::list_item(&format!(
                        "{} p.{}: {}",
                        citation.filename, citation.page_number, citation.snippet
                    ));
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Insights failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}

//! Cross-document insights command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the cross-document comparison command.
pub async fn run_cross(
    files: &[String],
    max_per_doc: usize,
    deep: bool,
    focus: Option<String>,
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::Insights)?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore().await?;

    let filenames = if files.is_empty() { None } else { Some(files) };

    let spinner = Output::spinner("Comparing documents...");
    let result = orchestrator
        .cross_insights(filenames, max_per_doc, deep, focus.as_deref())
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(cross) => {
            if cross.agreements.is_empty() && cross.contradictions.is_empty() {
                Output::warning("No cross-document claims found.");
                return Ok(());
            }

            if !cross.agreements.is_empty() {
                Output::header("Agreements");
                for claim in &cross.agreements {
                    Output::list_item(&claim.claim);
                    for source in &claim.sources {
                        Output::kv("source", &format!("{} p.{}", source.filename, source.page_number));
                    }
                }
            }
            if !cross.contradictions.is_empty() {
                Output::header("Contradictions");
                for claim in &cross.contradictions {
                    Output::list_item(&claim.claim);
                    for source in &claim.sources {
                        let stance = source.stance.as_deref().unwrap_or("-");
                        Output::kv(
                            "source",
                            &format!("{} p.{} ({})", source.filename, source.page_number, stance),
                        );
                    }
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Cross-document comparison failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}

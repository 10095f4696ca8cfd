//! LLM-grounded insights over the indexed corpus.
//!
//! Two workflows: structured insights for one passage with retrieved
//! citations, and cross-document comparison surfacing agreements and
//! contradictions with per-claim sources.

use crate::config::Prompts;
use crate::error::{FortellError, Result};
use crate::index::SearchHit;
use crate::llm::{GenerateOptions, LanguageModel, ResponseFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Snippets are clamped before they enter prompts or responses.
const SNIPPET_CHARS: usize = 500;

/// One retrieved reference backing an insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub filename: String,
    pub page_number: u32,
    pub snippet: String,
}

impl Citation {
    /// Build a citation from a search hit, clamping the snippet.
    pub fn from_hit(hit: &SearchHit) -> Self {
        Self {
            filename: hit.chunk.filename.clone(),
            page_number: hit.chunk.page_number,
            snippet: clamp(&hit.chunk.text, SNIPPET_CHARS),
        }
    }
}

/// Structured insights for one passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedInsights {
    pub summary: String,
    pub insights: Vec<String>,
    pub facts: Vec<String>,
    pub contradictions: Vec<String>,
    pub citations: Vec<Citation>,
}

/// A document position cited by a cross-document claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub filename: String,
    pub page_number: u32,
    #[serde(default)]
    pub stance: Option<String>,
}

/// One cross-document claim with its citing sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossClaim {
    pub claim: String,
    #[serde(alias = "positions")]
    pub sources: Vec<SourceRef>,
}

/// Agreements and contradictions across documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossInsights {
    #[serde(default)]
    pub agreements: Vec<CrossClaim>,
    #[serde(default)]
    pub contradictions: Vec<CrossClaim>,
}

/// Insights engine.
pub struct InsightsEngine {
    llm: Arc<dyn LanguageModel>,
    model: String,
    prompts: Prompts,
}

impl InsightsEngine {
    pub fn new(llm: Arc<dyn LanguageModel>, model: &str, prompts: Prompts) -> Self {
        Self {
            llm,
            model: model.to_string(),
            prompts,
        }
    }

    /// Extract structured insights from a passage, grounded by citations.
    #[instrument(skip_all, fields(text_len = text.len(), citations = citations.len()))]
    pub async fn grounded(&self, text: &str, citations: Vec<Citation>) -> Result<GroundedInsights> {
        let cites_str = citations
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "[CITATION {}] file={} page={}: {}",
                    i + 1,
                    c.filename,
                    c.page_number,
                    c.snippet
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("content".to_string(), text.to_string());
        vars.insert(
            "citations".to_string(),
            if cites_str.is_empty() {
                "None".to_string()
            } else {
                cites_str
            },
        );
        let prompt = Prompts::render(&self.prompts.insights.grounded, &vars);

        let response = self.generate_json(&prompt).await?;
        let raw: GroundedRaw = parse_json_response(&response)?;

        debug!("Parsed {} insights", raw.insights.len());
        Ok(GroundedInsights {
            summary: raw.summary,
            insights: raw.insights,
            facts: raw.facts,
            contradictions: raw.contradictions,
            citations,
        })
    }

    /// Compare excerpts across documents.
    ///
    /// `excerpts` carry (filename, page_number, text) triples sampled from
    /// each document under comparison.
    #[instrument(skip_all, fields(excerpts = excerpts.len()))]
    pub async fn cross(
        &self,
        excerpts: &[(String, u32, String)],
        focus: Option<&str>,
    ) -> Result<CrossInsights> {
        if excerpts.is_empty() {
            return Err(FortellError::InvalidInput(
                "No indexed excerpts to compare".to_string(),
            ));
        }

        let excerpts_str = excerpts
            .iter()
            .map(|(filename, page, text)| {
                format!("[{} p.{}] {}", filename, page, clamp(text, SNIPPET_CHARS))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("excerpts".to_string(), excerpts_str);
        vars.insert(
            "focus_clause".to_string(),
            focus
                .map(|f| format!("Focus the comparison on: {}", f))
                .unwrap_or_default(),
        );
        let prompt = Prompts::render(&self.prompts.insights.cross, &vars);

        let response = self.generate_json(&prompt).await?;
        parse_json_response(&response)
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        let opts = GenerateOptions {
            temperature: Some(0.2),
            max_tokens: None,
            response_format: ResponseFormat::Json,
        };
        self.llm
            .generate(prompt, &self.model, &opts)
            .await
            .map_err(|e| FortellError::Insights(e.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct GroundedRaw {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    facts: Vec<String>,
    #[serde(default)]
    contradictions: Vec<String>,
}

/// Parse a JSON response, tolerating markdown code fences.
fn parse_json_response<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T> {
    let trimmed = strip_code_fence(response);
    serde_json::from_str(trimmed)
        .map_err(|e| FortellError::Insights(format!("Unparseable LLM response: {}", e)))
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

fn clamp(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubLlm {
        response: String,
    }

    #[async_trait]
    impl LanguageModel for StubLlm {
        async fn generate(
            &self,
            _prompt: &str,
            _model: &str,
            _opts: &GenerateOptions,
        ) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    fn engine(response: &str) -> InsightsEngine {
        InsightsEngine::new(
            Arc::new(StubLlm {
                response: response.to_string(),
            }),
            "test-model",
            Prompts::default(),
        )
    }

    #[tokio::test]
    async fn test_grounded_parses_structured_response() {
        let engine = engine(
            r#"{"summary": "A summary.", "insights": ["One", "Two"], "facts": ["Fact"], "contradictions": []}"#,
        );
        let result = engine.grounded("Some passage.", Vec::new()).await.unwrap();
        assert_eq!(result.summary, "A summary.");
        assert_eq!(result.insights.len(), 2);
        assert!(result.contradictions.is_empty());
    }

    #[tokio::test]
    async fn test_grounded_tolerates_code_fences() {
        let engine = engine("```json\n{\"summary\": \"Fenced.\"}\n```");
        let result = engine.grounded("Passage.", Vec::new()).await.unwrap();
        assert_eq!(result.summary, "Fenced.");
        assert!(result.insights.is_empty());
    }

    #[tokio::test]
    async fn test_grounded_carries_citations_through() {
        let engine = engine(r#"{"summary": "S"}"#);
        let citations = vec![Citation {
            filename: "a.pdf".to_string(),
            page_number: 3,
            snippet: "snippet".to_string(),
        }];
        let result = engine.grounded("Passage.", citations).await.unwrap();
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].page_number, 3);
    }

    #[tokio::test]
    async fn test_cross_parses_claims() {
        let engine = engine(
            r#"{"agreements": [{"claim": "Both agree.", "sources": [{"filename": "a.pdf", "page_number": 1}, {"filename": "b.pdf", "page_number": 2}]}], "contradictions": []}"#,
        );
        let excerpts = vec![
            ("a.pdf".to_string(), 1, "text a".to_string()),
            ("b.pdf".to_string(), 2, "text b".to_string()),
        ];
        let result = engine.cross(&excerpts, None).await.unwrap();
        assert_eq!(result.agreements.len(), 1);
        assert_eq!(result.agreements[0].sources.len(), 2);
    }

    #[tokio::test]
    async fn test_cross_rejects_empty_excerpts() {
        let engine = engine("{}");
        let err = engine.cross(&[], None).await.unwrap_err();
        assert!(matches!(err, FortellError::InvalidInput(_)));
    }

    #[test]
    fn test_unparseable_response_is_an_insights_error() {
        let err = parse_json_response::<GroundedRaw>("not json").unwrap_err();
        assert!(matches!(err, FortellError::Insights(_)));
    }

    #[test]
    fn test_citation_snippet_clamped() {
        let hit = SearchHit {
            chunk: crate::ingest::Chunk {
                text: "x".repeat(1000),
                filename: "a.pdf".to_string(),
                page_number: 1,
                section_index: 0,
                section_title: None,
            },
            score: 0.9,
            distance: 0.1,
        };
        let citation = Citation::from_hit(&hit);
        assert_eq!(citation.snippet.chars().count(), 500);
    }
}

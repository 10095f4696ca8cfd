//! Prompt templates for Fortell.
//!
//! Prompts can be customized by placing TOML files in a custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub narration: NarrationPrompts,
    pub dialogue: DialoguePrompts,
    pub insights: InsightsPrompts,
}

/// Prompts for single-narrator script generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationPrompts {
    pub user: String,
}

impl Default for NarrationPrompts {
    fn default() -> Self {
        Self {
            user: r#"Transform the following content into a natural, spoken narration suitable for text-to-speech.

Guidelines:
- Conversational tone, clear and concise
- Stay grounded in the content; do not invent facts
- Target spoken length: {{length_hint}}
- Accent/register: {{accent}}; delivery style: {{style}}
- Avoid lists, bullets, URLs, and markup of any kind

Content:
{{content}}"#
                .to_string(),
        }
    }
}

/// Prompts for two-speaker podcast script generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    pub user: String,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            user: r#"Write a podcast-style conversation between exactly two hosts discussing the content below.

Format every line as either "Speaker 1: ..." or "Speaker 2: ..." with nothing else.

Guidelines:
- Alternate naturally between the two speakers with short interruptions and reactions
- Stay grounded in the content; do not invent facts
- Speaker 1 opens and frames the topic; Speaker 2 adds depth, questions, and color
- Target spoken length: {{length_hint}}
- Accent/register: {{accent}}; delivery style: {{style}}
- No stage directions, no markup, no URLs

Content:
{{content}}"#
                .to_string(),
        }
    }
}

/// Prompts for grounded insights and cross-document analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsPrompts {
    pub grounded: String,
    pub cross: String,
}

impl Default for InsightsPrompts {
    fn default() -> Self {
        Self {
            grounded: r#"You are an assistant extracting structured insights from a document passage and optional retrieved references.
Return JSON with exactly these keys:
- "summary": short paragraph summarizing the context (60-120 words).
- "insights": array of 3-7 concise key takeaways.
- "facts": array of factual statements supported by the text.
- "contradictions": array of potential inconsistencies or conflicts (empty if none).

Primary Context:
{{content}}

Retrieved References (optional):
{{citations}}"#
                .to_string(),

            cross: r#"You are comparing excerpts drawn from multiple documents. Identify where the documents agree and where they conflict.

Return JSON with exactly these keys:
- "agreements": array of objects {"claim": str, "sources": [{"filename": str, "page_number": int}]}
- "contradictions": array of objects {"claim": str, "positions": [{"filename": str, "page_number": int, "stance": str}]}

Every claim must cite at least two sources. Only use the excerpts below; do not invent sources.
{{focus_clause}}

Excerpts:
{{excerpts}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from defaults, with optional per-file overrides in a custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let narration_path = custom_path.join("narration.toml");
            if narration_path.exists() {
                let content = std::fs::read_to_string(&narration_path)?;
                prompts.narration = toml::from_str(&content)?;
            }

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let insights_path = custom_path.join("insights.toml");
            if insights_path.exists() {
                let content = std::fs::read_to_string(&insights_path)?;
                prompts.insights = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.dialogue.user.contains("Speaker 1"));
        assert!(prompts.insights.grounded.contains("\"summary\""));
    }

    #[test]
    fn test_render_template() {
        let template = "Discuss {{topic}} for {{length_hint}}.";
        let mut vars = std::collections::HashMap::new();
        vars.insert("topic".to_string(), "photosynthesis".to_string());
        vars.insert("length_hint".to_string(), "2 minutes".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Discuss photosynthesis for 2 minutes.");
    }
}

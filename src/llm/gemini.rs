//! Gemini REST client for text generation.

use super::{GenerateOptions, LanguageModel, ResponseFormat};
use crate::error::{FortellError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Base URL shared by all generative language endpoints.
pub const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Read the Gemini API key from the environment.
pub fn api_key_from_env() -> Result<String> {
    std::env::var("GOOGLE_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| FortellError::Config("GOOGLE_API_KEY not set".to_string()))
}

/// Client for the Gemini generative language API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    /// Create a client from the GOOGLE_API_KEY environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env()?))
    }

    /// Create a client with an explicit key.
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, api_key }
    }

    async fn post(&self, model: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}:generateContent?key={}", API_BASE, model, self.api_key);
        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FortellError::Llm(format!(
                "Gemini returned {}: {}",
                status,
                truncate(&detail, 300)
            )));
        }

        Ok(response.json().await?)
    }

    /// Text of the first candidate part, if present.
    pub fn first_text(response: &Value) -> Option<&str> {
        response
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .get(0)?
            .get("text")?
            .as_str()
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, model: &str, opts: &GenerateOptions) -> Result<String> {
        let mut generation_config = json!({});
        if let Some(t) = opts.temperature {
            generation_config["temperature"] = json!(t);
        }
        if let Some(m) = opts.max_tokens {
            generation_config["maxOutputTokens"] = json!(m);
        }
        generation_config["responseMimeType"] = match opts.response_format {
            ResponseFormat::Text => json!("text/plain"),
            ResponseFormat::Json => json!("application/json"),
        };

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let response = self.post(model, body).await?;
        let text = Self::first_text(&response)
            .ok_or_else(|| FortellError::Llm("Empty response from Gemini".to_string()))?;

        debug!("Generated {} characters", text.len());
        Ok(text.trim().to_string())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_extraction() {
        let response = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello" }] }
            }]
        });
        assert_eq!(GeminiClient::first_text(&response), Some("hello"));
    }

    #[test]
    fn test_first_text_missing() {
        let response = serde_json::json!({ "candidates": [] });
        assert_eq!(GeminiClient::first_text(&response), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}

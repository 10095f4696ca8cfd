//! LLM backend abstraction.
//!
//! The script synthesizer and insights engine talk to a language model
//! through this trait; the default implementation calls the Gemini REST
//! API. Speech synthesis is not here: each TTS provider adapter owns its
//! own API surface, including Gemini's.

mod gemini;

pub use gemini::{api_key_from_env, GeminiClient, API_BASE};

use crate::error::Result;
use async_trait::async_trait;

/// How the model should format its text response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Options for a text generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

/// Trait for language model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate text from a prompt.
    async fn generate(&self, prompt: &str, model: &str, opts: &GenerateOptions) -> Result<String>;
}

//! Error types for Fortell.

use thiserror::Error;

/// Library-level error type for Fortell operations.
#[derive(Error, Debug)]
pub enum FortellError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unreadable document: {0}")]
    InvalidDocument(String),

    #[error("No extractable text: {0}")]
    EmptyExtraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector dimension mismatch: index={expected}, incoming={got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("Script synthesis failed: {0}")]
    ScriptSynth(String),

    #[error("Malformed script: {0}")]
    MalformedScript(String),

    #[error("All TTS providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("Insights generation failed: {0}")]
    Insights(String),

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type alias for Fortell operations.
pub type Result<T> = std::result::Result<T, FortellError>;

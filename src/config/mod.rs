//! Configuration module for Fortell.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DialoguePrompts, InsightsPrompts, NarrationPrompts, Prompts};
pub use settings::{
    AudioSettings, EmbeddingSettings, GeneralSettings, IngestSettings, InsightsSettings,
    ScriptSettings, Settings, TimeoutSettings, TtsSettings,
};

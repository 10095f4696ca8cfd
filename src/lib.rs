//! Fortell - PDF to narrated audio
//!
//! Turn PDF documents into natural-sounding, chapter-annotated audio:
//! a single-narrator reading or a two-speaker podcast-style dialogue.
//! The same indexed library serves semantic search and LLM-grounded
//! insights with citations.
//!
//! The name comes from the Norwegian "fortelle," to tell.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `ingest` - PDF extraction and chunk splitting
//! - `embedding` - Embedding generation
//! - `index` - In-memory vector index with page-level dedup
//! - `llm` - Language model backend
//! - `script` - Narration/dialogue script synthesis with caching
//! - `tts` - Text-to-speech providers with ordered fallback
//! - `audio` - Clip probing, normalization, muxing, chapters
//! - `insights` - Grounded and cross-document insights
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use fortell::config::Settings;
//! use fortell::orchestrator::{AudioSource, GenerateAudioRequest, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.restore().await?;
//!
//!     let request = GenerateAudioRequest {
//!         source: AudioSource::Page {
//!             filename: "paper.pdf".to_string(),
//!             page_number: 3,
//!         },
//!         podcast: true,
//!         two_speakers: true,
//!         accent: String::new(),
//!         style: String::new(),
//!         expressiveness: "balanced".to_string(),
//!         speakers_override: Default::default(),
//!     };
//!     let artifact = orchestrator.generate_audio(&request).await?;
//!     println!("Audio at {} ({} chapters)", artifact.url, artifact.chapters.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod insights;
pub mod llm;
pub mod orchestrator;
pub mod script;
pub mod tts;

pub use error::{FortellError, Result};

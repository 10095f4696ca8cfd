//! Audio assembly for Fortell.
//!
//! Per-line clips come out of the TTS dispatcher; this module measures
//! them, concatenates them into one artifact, and annotates chapter
//! boundaries from measured durations.

mod format;
mod mux;
mod probe;

pub use format::{normalize_to_mp3, wrap_pcm_to_wav};
pub use mux::{chapters_from, mux, MuxRequest};
pub use probe::probe_duration_ms;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A synthesized clip on disk with its public handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRef {
    pub path: PathBuf,
    pub url: String,
}

/// A time-annotated segment of an artifact, one per spoken line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// 0-based, strictly increasing.
    pub index: usize,
    pub speaker: String,
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub part_url: Option<String>,
}

/// The final audio deliverable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    /// Public handle to the merged audio file (or, degraded, the first clip).
    pub url: String,
    /// Ordered per-line clip URLs; empty for single-call synthesis.
    pub parts: Vec<String>,
    /// Ordered chapters covering the artifact.
    pub chapters: Vec<Chapter>,
    /// Set when merging failed and `parts` carry the playable audio.
    pub degraded: bool,
}

impl AudioArtifact {
    /// Total duration implied by the last chapter, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.chapters.last().map(|c| c.end_ms).unwrap_or(0)
    }
}

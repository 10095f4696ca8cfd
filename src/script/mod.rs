//! Script synthesis for Fortell.
//!
//! Converts source text into either a narration script or a two-speaker
//! dialogue, via the LLM backend, with a signature-keyed cache so repeat
//! requests never pay the model latency twice.

mod parse;
mod synth;

pub use parse::parse_dialogue;
pub use synth::ScriptSynth;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical speaker slots of a dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerLabel {
    One,
    Two,
}

impl SpeakerLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerLabel::One => "Speaker 1",
            SpeakerLabel::Two => "Speaker 2",
        }
    }
}

impl std::fmt::Display for SpeakerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a dialogue script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: SpeakerLabel,
    pub text: String,
}

/// A generated script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Script {
    /// Single-narrator prose.
    Narration(String),
    /// Ordered speaker-labeled lines; both labels always appear.
    Dialogue(Vec<DialogueLine>),
}

impl Script {
    /// The spoken content, concatenated in order.
    pub fn spoken_text(&self) -> String {
        match self {
            Script::Narration(text) => text.clone(),
            Script::Dialogue(lines) => lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Render a dialogue back to "Speaker N: ..." lines for one-call
    /// multi-speaker synthesis. Narration renders as-is.
    pub fn to_labeled_text(&self) -> String {
        match self {
            Script::Narration(text) => text.clone(),
            Script::Dialogue(lines) => lines
                .iter()
                .map(|l| format!("{}: {}", l.speaker, l.text))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Requested script shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    Narration,
    Dialogue,
}

/// Style knobs carried from the request into the prompt and cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleHints {
    pub accent: String,
    pub style: String,
    pub expressiveness: String,
    pub podcast: bool,
}

/// Everything that determines a script's content.
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub source_text: String,
    pub mode: ScriptMode,
    pub hints: StyleHints,
    /// Whether the source covers the whole document rather than one page.
    pub entire_pdf: bool,
}

/// Deterministic cache key for a script.
///
/// Derived from the head of the normalized source text plus every flag and
/// tag that changes the generated script, so each meaningful configuration
/// change invalidates naturally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptKey(String);

impl ScriptKey {
    /// Compute the key for a script request. `signature_chars` bounds how
    /// much of the source participates in the hash.
    pub fn for_request(request: &ScriptRequest, signature_chars: usize) -> Self {
        let normalized: String = request
            .source_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let head: String = normalized.chars().take(signature_chars).collect();

        let mut hasher = Sha256::new();
        hasher.update(head.as_bytes());
        hasher.update([
            request.hints.podcast as u8,
            (request.mode == ScriptMode::Dialogue) as u8,
            request.entire_pdf as u8,
        ]);
        hasher.update(request.hints.accent.as_bytes());
        hasher.update([0]);
        hasher.update(request.hints.style.as_bytes());
        hasher.update([0]);
        hasher.update(request.hints.expressiveness.as_bytes());

        let digest = hasher.finalize();
        ScriptKey(hex::encode(&digest[..16]))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, mode: ScriptMode) -> ScriptRequest {
        ScriptRequest {
            source_text: text.to_string(),
            mode,
            hints: StyleHints::default(),
            entire_pdf: false,
        }
    }

    #[test]
    fn test_key_stable_for_identical_input() {
        let a = ScriptKey::for_request(&request("Photosynthesis converts light.", ScriptMode::Narration), 1000);
        let b = ScriptKey::for_request(&request("Photosynthesis converts light.", ScriptMode::Narration), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_whitespace_differences() {
        let a = ScriptKey::for_request(&request("hello   world", ScriptMode::Narration), 1000);
        let b = ScriptKey::for_request(&request("hello\nworld", ScriptMode::Narration), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_changes_with_mode_and_tags() {
        let narration = ScriptKey::for_request(&request("text", ScriptMode::Narration), 1000);
        let dialogue = ScriptKey::for_request(&request("text", ScriptMode::Dialogue), 1000);
        assert_ne!(narration, dialogue);

        let mut accented = request("text", ScriptMode::Narration);
        accented.hints.accent = "british".to_string();
        assert_ne!(narration, ScriptKey::for_request(&accented, 1000));
    }

    #[test]
    fn test_key_only_reads_signature_head() {
        let long_a = format!("{}{}", "a".repeat(1000), "tail one");
        let long_b = format!("{}{}", "a".repeat(1000), "different tail");
        let a = ScriptKey::for_request(&request(&long_a, ScriptMode::Narration), 1000);
        let b = ScriptKey::for_request(&request(&long_b, ScriptMode::Narration), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_tag_boundaries_are_unambiguous() {
        let mut ab = request("text", ScriptMode::Narration);
        ab.hints.accent = "ab".to_string();
        ab.hints.style = "c".to_string();

        let mut a_bc = request("text", ScriptMode::Narration);
        a_bc.hints.accent = "a".to_string();
        a_bc.hints.style = "bc".to_string();

        assert_ne!(ScriptKey::for_request(&ab, 1000), ScriptKey::for_request(&a_bc, 1000));
    }

    #[test]
    fn test_spoken_text_reproduces_lines_in_order() {
        let script = Script::Dialogue(vec![
            DialogueLine {
                speaker: SpeakerLabel::One,
                text: "First.".to_string(),
            },
            DialogueLine {
                speaker: SpeakerLabel::Two,
                text: "Second.".to_string(),
            },
        ]);
        assert_eq!(script.spoken_text(), "First. Second.");
        assert_eq!(
            script.to_labeled_text(),
            "Speaker 1: First.\nSpeaker 2: Second."
        );
    }
}

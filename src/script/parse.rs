//! Dialogue script parsing.
//!
//! LLM output is scanned line by line for speaker-labeled lines; label
//! spellings vary across prompts and models, so a normalization table maps
//! them all onto the two canonical slots.

use super::{DialogueLine, SpeakerLabel};
use crate::error::{FortellError, Result};
use regex::Regex;
use std::sync::OnceLock;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(speaker\s*[12ab]|alex|jordan|a|b)\s*:\s*(.+)$")
            .expect("invalid dialogue line pattern")
    })
}

/// Map a raw label spelling onto a canonical speaker slot.
fn normalize_label(raw: &str) -> Option<SpeakerLabel> {
    let compact: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match compact.as_str() {
        "speaker1" | "speakera" | "alex" | "a" => Some(SpeakerLabel::One),
        "speaker2" | "speakerb" | "jordan" | "b" => Some(SpeakerLabel::Two),
        _ => None,
    }
}

/// Parse an LLM response into dialogue lines.
///
/// Unlabeled non-empty lines continue the previous line's text; anything
/// before the first label is discarded. Fails with `MalformedScript` when
/// fewer than two distinct speakers appear.
pub fn parse_dialogue(response: &str) -> Result<Vec<DialogueLine>> {
    let mut lines: Vec<DialogueLine> = Vec::new();

    for raw_line in response.lines() {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(captures) = line_pattern().captures(trimmed) {
            let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let text = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if let (Some(speaker), false) = (normalize_label(label), text.is_empty()) {
                lines.push(DialogueLine {
                    speaker,
                    text: text.to_string(),
                });
                continue;
            }
        }

        // Continuation of the previous speaker's line.
        if let Some(last) = lines.last_mut() {
            last.text.push(' ');
            last.text.push_str(trimmed);
        }
    }

    let has_one = lines.iter().any(|l| l.speaker == SpeakerLabel::One);
    let has_two = lines.iter().any(|l| l.speaker == SpeakerLabel::Two);
    if !(has_one && has_two) {
        return Err(FortellError::MalformedScript(format!(
            "Dialogue needs two distinct speakers, found {}",
            lines.len().min(1)
        )));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_labels() {
        let response = "Speaker 1: Hello there.\nSpeaker 2: Hi! Great to be here.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].speaker, SpeakerLabel::One);
        assert_eq!(lines[0].text, "Hello there.");
        assert_eq!(lines[1].speaker, SpeakerLabel::Two);
    }

    #[test]
    fn test_parse_alias_labels() {
        let response = "Alex: So what did the paper find?\nJordan: Three things, actually.\nA: Walk me through them.\nB: Gladly.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].speaker, SpeakerLabel::One);
        assert_eq!(lines[1].speaker, SpeakerLabel::Two);
        assert_eq!(lines[2].speaker, SpeakerLabel::One);
        assert_eq!(lines[3].speaker, SpeakerLabel::Two);
    }

    #[test]
    fn test_parse_speaker_letter_variants() {
        let response = "Speaker A: First voice.\nSpeaker B: Second voice.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines[0].speaker, SpeakerLabel::One);
        assert_eq!(lines[1].speaker, SpeakerLabel::Two);
    }

    #[test]
    fn test_case_insensitive_labels() {
        let response = "SPEAKER 1: Loud greeting.\nspeaker 2: quiet reply.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_continuation_lines_attach_to_previous() {
        let response = "Speaker 1: This thought continues\nacross two lines.\nSpeaker 2: Understood.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "This thought continues across two lines.");
    }

    #[test]
    fn test_preamble_before_first_label_discarded() {
        let response = "Here is your podcast script:\n\nSpeaker 1: Welcome.\nSpeaker 2: Thanks.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Welcome.");
    }

    #[test]
    fn test_single_speaker_is_malformed() {
        let response = "Speaker 1: A monologue.\nSpeaker 1: Still just me.";
        let err = parse_dialogue(response).unwrap_err();
        assert!(matches!(err, FortellError::MalformedScript(_)));
    }

    #[test]
    fn test_empty_response_is_malformed() {
        assert!(matches!(
            parse_dialogue("").unwrap_err(),
            FortellError::MalformedScript(_)
        ));
    }

    #[test]
    fn test_order_preserved() {
        let response = "Speaker 2: I go first this time.\nSpeaker 1: And I reply.";
        let lines = parse_dialogue(response).unwrap();
        assert_eq!(lines[0].speaker, SpeakerLabel::Two);
        assert_eq!(lines[1].speaker, SpeakerLabel::One);
    }
}

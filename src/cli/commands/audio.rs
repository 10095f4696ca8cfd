//! Audio generation command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::orchestrator::{AudioSource, GenerateAudioRequest, Orchestrator};
use anyhow::Result;
use std::collections::HashMap;

/// Arguments of the audio command, mirroring the CLI flags.
#[allow(clippy::too_many_arguments)]
pub async fn run_audio(
    text: Option<String>,
    file: Option<String>,
    page: Option<u32>,
    entire: bool,
    podcast: bool,
    two_speakers: bool,
    accent: String,
    style: String,
    expressiveness: String,
    voices: &[String],
    settings: Settings,
) -> Result<()> {
    preflight::check(preflight::Operation::GenerateAudio)?;

    let source = match (text, file) {
        (Some(text), None) => AudioSource::Text(text),
        (None, Some(filename)) if entire => AudioSource::Entire { filename },
        (None, Some(filename)) => match page {
            Some(page_number) => AudioSource::Page {
                filename,
                page_number,
            },
            None => {
                Output::error("Provide --page N or --entire with --file");
                anyhow::bail!("missing page selection");
            }
        },
        _ => {
            Output::error("Provide exactly one of --text or --file");
            anyhow::bail!("missing source");
        }
    };

    let request = GenerateAudioRequest {
        source,
        podcast,
        two_speakers,
        accent,
        style,
        expressiveness,
        speakers_override: parse_voice_overrides(voices)?,
    };

    // No restore here: audio sources read straight from the document
    // library, and the clip and artifact caches are disk-first.
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Generating audio...");
    let result = orchestrator.generate_audio(&request).await;
    spinner.finish_and_clear();

    match result {
        Ok(artifact) => {
            if artifact.degraded {
                Output::warning("Merging failed; returning per-part audio");
            }
            Output::success(&format!("Audio ready: {}", artifact.url));
            if !artifact.parts.is_empty() {
                Output::kv("parts", &artifact.parts.len().to_string());
            }
            Output::header("Chapters");
            for chapter in &artifact.chapters {
                Output::chapter(
                    chapter.index,
                    &chapter.speaker,
                    chapter.start_ms,
                    chapter.end_ms,
                    &chapter.text,
                );
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Audio generation failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}

/// Parse repeated `--voice "Speaker 1=Kore"` flags.
fn parse_voice_overrides(voices: &[String]) -> Result<HashMap<String, String>> {
    let mut overrides = HashMap::new();
    for entry in voices {
        match entry.split_once('=') {
            Some((label, voice)) if !voice.trim().is_empty() => {
                overrides.insert(label.trim().to_string(), voice.trim().to_string());
            }
            _ => anyhow::bail!("Invalid --voice value (expected \"Speaker 1=Name\"): {entry}"),
        }
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice_overrides() {
        let parsed =
            parse_voice_overrides(&["Speaker 1=Kore".to_string(), "Speaker 2=Puck".to_string()])
                .unwrap();
        assert_eq!(parsed.get("Speaker 1").map(String::as_str), Some("Kore"));
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_parse_voice_overrides_rejects_malformed() {
        assert!(parse_voice_overrides(&["nonsense".to_string()]).is_err());
        assert!(parse_voice_overrides(&["Speaker 1=".to_string()]).is_err());
    }
}

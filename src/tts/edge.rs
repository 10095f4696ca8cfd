//! Edge TTS provider.
//!
//! Shells out to the `edge-tts` command line tool, which fronts the
//! Microsoft Edge read-aloud service. Free tier, no credentials, but rate
//! limits bite under load.

use super::{OutputFormat, ProviderError, ProviderErrorKind, SynthesizedAudio, TtsProvider};
use crate::script::SpeakerLabel;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// Edge TTS adapter, MP3 out.
pub struct EdgeProvider;

impl EdgeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EdgeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for EdgeProvider {
    fn tag(&self) -> &'static str {
        "edge"
    }

    fn output_format(&self) -> OutputFormat {
        OutputFormat::Mp3
    }

    fn default_voice(&self, label: SpeakerLabel) -> &'static str {
        match label {
            SpeakerLabel::One => "en-US-AriaNeural",
            SpeakerLabel::Two => "en-US-GuyNeural",
        }
    }

    #[instrument(skip(self, text), fields(provider = "edge", text_len = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let out_dir = std::env::temp_dir();
        let out_path = out_dir.join(format!("fortell_edge_{}.mp3", uuid::Uuid::new_v4().simple()));

        let result = Command::new("edge-tts")
            .arg("--text").arg(text)
            .arg("--voice").arg(voice)
            .arg("--write-media").arg(&out_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::new(
                    ProviderErrorKind::Permanent,
                    "edge-tts not installed",
                ));
            }
            Err(e) => {
                return Err(ProviderError::new(ProviderErrorKind::Transient, e.to_string()));
            }
        };

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&out_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            let kind = if stderr.contains("429") {
                ProviderErrorKind::RateLimited
            } else if stderr.contains("voice") {
                ProviderErrorKind::InvalidVoice
            } else {
                ProviderErrorKind::Transient
            };
            return Err(ProviderError::new(kind, stderr.trim().to_string()));
        }

        let bytes = tokio::fs::read(&out_path)
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transient, e.to_string()))?;
        let _ = tokio::fs::remove_file(&out_path).await;

        if bytes.is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::Transient,
                "edge-tts produced no audio",
            ));
        }

        Ok(SynthesizedAudio {
            bytes,
            format: OutputFormat::Mp3,
            sample_rate: 0,
            bits_per_sample: 0,
        })
    }
}

//! Offline TTS provider.
//!
//! Last resort in the chain: shells out to `espeak-ng`, which needs no
//! network or credentials. Robotic, but the pipeline stays alive when
//! every hosted provider is down.

use super::{OutputFormat, ProviderError, ProviderErrorKind, SynthesizedAudio, TtsProvider};
use crate::script::SpeakerLabel;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// espeak-ng adapter, WAV out.
pub struct OfflineProvider;

impl OfflineProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for OfflineProvider {
    fn tag(&self) -> &'static str {
        "offline"
    }

    fn output_format(&self) -> OutputFormat {
        OutputFormat::Wav
    }

    fn default_voice(&self, label: SpeakerLabel) -> &'static str {
        match label {
            SpeakerLabel::One => "en+m3",
            SpeakerLabel::Two => "en+f4",
        }
    }

    #[instrument(skip(self, text), fields(provider = "offline", text_len = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let out_path = std::env::temp_dir().join(format!(
            "fortell_offline_{}.wav",
            uuid::Uuid::new_v4().simple()
        ));

        let result = Command::new("espeak-ng")
            .arg("-v").arg(voice)
            .arg("-w").arg(&out_path)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::new(
                    ProviderErrorKind::Permanent,
                    "espeak-ng not installed",
                ));
            }
            Err(e) => {
                return Err(ProviderError::new(ProviderErrorKind::Transient, e.to_string()));
            }
        };

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&out_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            let kind = if stderr.contains("voice") {
                ProviderErrorKind::InvalidVoice
            } else {
                ProviderErrorKind::Permanent
            };
            return Err(ProviderError::new(kind, stderr.trim().to_string()));
        }

        let bytes = tokio::fs::read(&out_path)
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transient, e.to_string()))?;
        let _ = tokio::fs::remove_file(&out_path).await;

        if bytes.is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::Permanent,
                "espeak-ng produced no audio",
            ));
        }

        Ok(SynthesizedAudio {
            bytes,
            format: OutputFormat::Wav,
            sample_rate: 22_050,
            bits_per_sample: 16,
        })
    }
}

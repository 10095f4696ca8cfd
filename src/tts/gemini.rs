//! Gemini speech synthesis provider.
//!
//! The only chain member with native multi-speaker support: a whole
//! labeled dialogue renders in one call. Audio comes back as raw PCM
//! described by the response mime type.

use super::{OutputFormat, ProviderError, ProviderErrorKind, SynthesizedAudio, TtsProvider};
use crate::llm;
use crate::script::SpeakerLabel;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

/// Speech-capable Gemini model.
const SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Gemini TTS adapter.
pub struct GeminiTtsProvider {
    http: reqwest::Client,
}

impl GeminiTtsProvider {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        llm::api_key_from_env().map_err(|e| {
            ProviderError::new(ProviderErrorKind::AuthFailure, e.to_string())
        })
    }

    async fn request_speech(&self, text: &str, speech_config: Value) -> Result<SynthesizedAudio, ProviderError> {
        let key = self.api_key()?;
        let url = format!(
            "{}/{}:generateContent?key={}",
            llm::API_BASE,
            SPEECH_MODEL,
            key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": speech_config,
            },
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &detail));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transient, e.to_string()))?;

        let inline = payload
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("inlineData"))
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::Transient, "no audio in response")
            })?;

        let mime = inline
            .get("mimeType")
            .and_then(|m| m.as_str())
            .unwrap_or("audio/L16;codec=pcm;rate=24000");
        let data = inline.get("data").and_then(|d| d.as_str()).ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Transient, "no audio payload in response")
        })?;

        let bytes = BASE64.decode(data).map_err(|e| {
            ProviderError::new(ProviderErrorKind::Transient, format!("bad audio encoding: {e}"))
        })?;

        Ok(SynthesizedAudio {
            bytes,
            format: OutputFormat::Pcm,
            sample_rate: parse_rate(mime).unwrap_or(24_000),
            bits_per_sample: 16,
        })
    }
}

impl Default for GeminiTtsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for GeminiTtsProvider {
    fn tag(&self) -> &'static str {
        "gemini"
    }

    fn supports_multispeaker(&self) -> bool {
        true
    }

    fn output_format(&self) -> OutputFormat {
        OutputFormat::Pcm
    }

    fn default_voice(&self, label: SpeakerLabel) -> &'static str {
        match label {
            SpeakerLabel::One => "Kore",
            SpeakerLabel::Two => "Puck",
        }
    }

    #[instrument(skip(self, text), fields(provider = "gemini", text_len = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let speech_config = json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
        });
        self.request_speech(text, speech_config).await
    }

    #[instrument(skip(self, labeled_text), fields(provider = "gemini"))]
    async fn synthesize_multispeaker(
        &self,
        labeled_text: &str,
        voice_a: &str,
        voice_b: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let speech_config = json!({
            "multiSpeakerVoiceConfig": {
                "speakerVoiceConfigs": [
                    {
                        "speaker": SpeakerLabel::One.as_str(),
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice_a } }
                    },
                    {
                        "speaker": SpeakerLabel::Two.as_str(),
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice_b } }
                    }
                ]
            }
        });
        self.request_speech(labeled_text, speech_config).await
    }
}

/// Pull the `rate=` parameter out of an audio mime type.
fn parse_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|part| part.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

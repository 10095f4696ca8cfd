//! Google Cloud Text-to-Speech provider.

use super::{OutputFormat, ProviderError, ProviderErrorKind, SynthesizedAudio, TtsProvider};
use crate::script::SpeakerLabel;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

const API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Google Cloud TTS adapter, one voice per call, MP3 out.
pub struct GoogleTtsProvider {
    http: reqwest::Client,
}

impl GoogleTtsProvider {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        std::env::var("GOOGLE_TTS_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    ProviderErrorKind::AuthFailure,
                    "GOOGLE_TTS_API_KEY not set",
                )
            })
    }

    /// The language code is the leading segments of the voice name
    /// ("en-US-Neural2-C" speaks en-US).
    fn language_of(voice: &str) -> String {
        voice
            .split('-')
            .take(2)
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Default for GoogleTtsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for GoogleTtsProvider {
    fn tag(&self) -> &'static str {
        "google"
    }

    fn output_format(&self) -> OutputFormat {
        OutputFormat::Mp3
    }

    fn default_voice(&self, label: SpeakerLabel) -> &'static str {
        match label {
            SpeakerLabel::One => "en-US-Neural2-C",
            SpeakerLabel::Two => "en-US-Neural2-D",
        }
    }

    #[instrument(skip(self, text), fields(provider = "google", text_len = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let key = self.api_key()?;

        let body = json!({
            "input": { "text": text },
            "voice": {
                "languageCode": Self::language_of(voice),
                "name": voice,
            },
            "audioConfig": { "audioEncoding": "MP3" },
        });

        let response = self
            .http
            .post(format!("{}?key={}", API_URL, key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            // A 400 naming the voice means the voice id is bad, not the text.
            if status.as_u16() == 400 && detail.contains("voice") {
                return Err(ProviderError::new(ProviderErrorKind::InvalidVoice, detail));
            }
            return Err(ProviderError::from_status(status.as_u16(), &detail));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transient, e.to_string()))?;

        let data = payload
            .get("audioContent")
            .and_then(|d| d.as_str())
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::Transient, "no audioContent in response")
            })?;

        let bytes = BASE64.decode(data).map_err(|e| {
            ProviderError::new(ProviderErrorKind::Transient, format!("bad audio encoding: {e}"))
        })?;

        Ok(SynthesizedAudio {
            bytes,
            format: OutputFormat::Mp3,
            sample_rate: 0,
            bits_per_sample: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of_voice() {
        assert_eq!(GoogleTtsProvider::language_of("en-US-Neural2-C"), "en-US");
        assert_eq!(GoogleTtsProvider::language_of("de-DE-Wavenet-B"), "de-DE");
        assert_eq!(GoogleTtsProvider::language_of("en"), "en");
    }
}

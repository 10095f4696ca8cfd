//! Hugging Face inference API provider.
//!
//! Single fixed voice per model; a 503 means the model is still loading
//! on the inference backend and is worth retrying elsewhere in the chain.

use super::{OutputFormat, ProviderError, ProviderErrorKind, SynthesizedAudio, TtsProvider};
use crate::script::SpeakerLabel;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

const API_BASE: &str = "https://api-inference.huggingface.co/models";

/// Hugging Face TTS adapter, MP3 out.
pub struct HfProvider {
    http: reqwest::Client,
    model: String,
}

impl HfProvider {
    pub fn new(model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            model: model.to_string(),
        }
    }

    fn token(&self) -> Result<String, ProviderError> {
        std::env::var("HUGGINGFACE_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::new(
                    ProviderErrorKind::AuthFailure,
                    "HUGGINGFACE_API_TOKEN not set",
                )
            })
    }
}

#[async_trait]
impl TtsProvider for HfProvider {
    fn tag(&self) -> &'static str {
        "hf"
    }

    fn output_format(&self) -> OutputFormat {
        OutputFormat::Mp3
    }

    fn default_voice(&self, _label: SpeakerLabel) -> &'static str {
        // The hosted model bakes in its own voice.
        "default"
    }

    #[instrument(skip(self, text), fields(provider = "hf", model = %self.model, text_len = text.len()))]
    async fn synthesize(
        &self,
        text: &str,
        _voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let token = self.token()?;

        let response = self
            .http
            .post(format!("{}/{}", API_BASE, self.model))
            .bearer_auth(token)
            .header("Accept", "audio/mpeg")
            .json(&json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if status.as_u16() == 503 {
            // Model loading on the inference backend.
            return Err(ProviderError::new(
                ProviderErrorKind::Transient,
                "model loading, retry shortly",
            ));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &detail));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::new(ProviderErrorKind::Transient, e.to_string()))?
            .to_vec();

        if bytes.is_empty() {
            return Err(ProviderError::new(
                ProviderErrorKind::Transient,
                "empty audio response",
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

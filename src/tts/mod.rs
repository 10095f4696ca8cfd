//! Text-to-speech providers and dispatch.
//!
//! Providers form an ordered fallback chain behind a uniform interface;
//! the dispatcher walks the chain per synthesis unit and caches finished
//! clips on disk under deterministic names.

mod dispatcher;
mod edge;
mod gemini;
mod google;
mod hf;
mod offline;

pub use dispatcher::{DialogueAudio, FanOutLine, TtsDispatcher};
pub use edge::EdgeProvider;
pub use gemini::GeminiTtsProvider;
pub use google::GoogleTtsProvider;
pub use hf::HfProvider;
pub use offline::OfflineProvider;

use crate::script::SpeakerLabel;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Common failure taxonomy every provider maps its errors onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimited,
    AuthFailure,
    Timeout,
    InvalidVoice,
    Transient,
    Permanent,
}

/// A classified provider failure. Never surfaces to callers of the
/// dispatcher; the chain either recovers or collapses into
/// `AllProvidersFailed`.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify an HTTP status into the common taxonomy.
    pub fn from_status(status: u16, detail: &str) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimited,
            401 | 403 => ProviderErrorKind::AuthFailure,
            408 => ProviderErrorKind::Timeout,
            400 | 404 | 422 => ProviderErrorKind::Permanent,
            _ => ProviderErrorKind::Transient,
        };
        Self::new(kind, format!("status {}: {}", status, detail))
    }

    /// Classify a reqwest transport error.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ProviderErrorKind::Timeout, err.to_string())
        } else {
            Self::new(ProviderErrorKind::Transient, err.to_string())
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Encoding of the bytes a provider hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Wav,
    /// Raw PCM; sample rate and bit depth travel alongside the bytes.
    Pcm,
}

/// Audio returned by one provider call, before normalization.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Meaningful for PCM payloads.
    pub sample_rate: u32,
    /// Meaningful for PCM payloads.
    pub bits_per_sample: u16,
}

impl std::fmt::Debug for dyn TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsProvider").field("tag", &self.tag()).finish()
    }
}

/// Trait for text-to-speech provider adapters.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Short stable tag embedded in clip basenames.
    fn tag(&self) -> &'static str;

    /// Whether a whole labeled dialogue can be rendered in one call.
    fn supports_multispeaker(&self) -> bool {
        false
    }

    fn output_format(&self) -> OutputFormat;

    /// Built-in voice for a speaker slot, used when neither the request
    /// nor the environment names one.
    fn default_voice(&self, label: SpeakerLabel) -> &'static str;

    /// Synthesize one unit of text with one voice.
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> std::result::Result<SynthesizedAudio, ProviderError>;

    /// Render a labeled two-speaker script in one call. Only providers
    /// reporting `supports_multispeaker` implement this.
    async fn synthesize_multispeaker(
        &self,
        _labeled_text: &str,
        _voice_a: &str,
        _voice_b: &str,
    ) -> std::result::Result<SynthesizedAudio, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorKind::Permanent,
            "multi-speaker synthesis not supported",
        ))
    }
}

/// Voice selection for a request.
///
/// Resolution order per provider: request override, then the provider's
/// `<TAG>_VOICE_A`/`<TAG>_VOICE_B` environment variables, then the
/// adapter's built-in default. Consistent within a single request.
#[derive(Debug, Clone, Default)]
pub struct VoiceConfig {
    overrides: HashMap<SpeakerLabel, String>,
}

impl VoiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, label: SpeakerLabel, voice: impl Into<String>) -> Self {
        self.overrides.insert(label, voice.into());
        self
    }

    /// Resolve the voice id for a speaker slot on a given provider.
    pub fn resolve(&self, label: SpeakerLabel, provider: &dyn TtsProvider) -> String {
        if let Some(voice) = self.overrides.get(&label) {
            return voice.clone();
        }
        let slot = match label {
            SpeakerLabel::One => "A",
            SpeakerLabel::Two => "B",
        };
        let var = format!("{}_VOICE_{}", provider.tag().to_uppercase(), slot);
        if let Ok(voice) = std::env::var(&var) {
            if !voice.is_empty() {
                return voice;
            }
        }
        provider.default_voice(label).to_string()
    }
}

/// Deterministic clip basename, without extension.
///
/// The name embeds the content hash and the provider tag so a disk scan
/// alone identifies cache hits across restarts.
pub fn clip_basename(text: &str, voice: &str, provider_tag: &str, style: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0]);
    hasher.update(voice.as_bytes());
    hasher.update([0]);
    hasher.update(provider_tag.as_bytes());
    hasher.update([0]);
    hasher.update(style.as_bytes());
    let digest = hasher.finalize();
    format!("tts_{}_{}", hex::encode(&digest[..12]), provider_tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyProvider;

    #[async_trait]
    impl TtsProvider for DummyProvider {
        fn tag(&self) -> &'static str {
            "dummy"
        }

        fn output_format(&self) -> OutputFormat {
            OutputFormat::Mp3
        }

        fn default_voice(&self, label: SpeakerLabel) -> &'static str {
            match label {
                SpeakerLabel::One => "builtin-a",
                SpeakerLabel::Two => "builtin-b",
            }
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
        ) -> std::result::Result<SynthesizedAudio, ProviderError> {
            unreachable!()
        }
    }

    #[test]
    fn test_clip_basename_deterministic() {
        let a = clip_basename("Hello.", "voice-1", "gemini", "calm");
        let b = clip_basename("Hello.", "voice-1", "gemini", "calm");
        assert_eq!(a, b);
        assert!(a.starts_with("tts_"));
        assert!(a.ends_with("_gemini"));
    }

    #[test]
    fn test_clip_basename_varies_with_inputs() {
        let base = clip_basename("Hello.", "voice-1", "gemini", "calm");
        assert_ne!(base, clip_basename("Hello!", "voice-1", "gemini", "calm"));
        assert_ne!(base, clip_basename("Hello.", "voice-2", "gemini", "calm"));
        assert_ne!(base, clip_basename("Hello.", "voice-1", "google", "calm"));
        assert_ne!(base, clip_basename("Hello.", "voice-1", "gemini", "bright"));
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            ProviderError::from_status(429, "").kind,
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            ProviderError::from_status(401, "").kind,
            ProviderErrorKind::AuthFailure
        );
        assert_eq!(
            ProviderError::from_status(503, "").kind,
            ProviderErrorKind::Transient
        );
        assert_eq!(
            ProviderError::from_status(400, "").kind,
            ProviderErrorKind::Permanent
        );
    }

    #[test]
    fn test_voice_resolution_precedence() {
        let provider = DummyProvider;

        let config = VoiceConfig::new();
        assert_eq!(config.resolve(SpeakerLabel::One, &provider), "builtin-a");

        let config = VoiceConfig::new().with_override(SpeakerLabel::One, "custom");
        assert_eq!(config.resolve(SpeakerLabel::One, &provider), "custom");
        assert_eq!(config.resolve(SpeakerLabel::Two, &provider), "builtin-b");
    }
}

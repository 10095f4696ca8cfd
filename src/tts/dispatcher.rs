//! Multi-provider TTS dispatch with ordered fallback and clip caching.

use super::{
    clip_basename, EdgeProvider, GeminiTtsProvider, GoogleTtsProvider, HfProvider,
    OfflineProvider, OutputFormat, ProviderErrorKind, SynthesizedAudio, TtsProvider, VoiceConfig,
};
use crate::audio::{normalize_to_mp3, wrap_pcm_to_wav, ClipRef};
use crate::config::Settings;
use crate::error::{FortellError, Result};
use crate::script::{DialogueLine, SpeakerLabel};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// One line's fan-out outcome; `clip` is None when every provider failed
/// for that line.
#[derive(Debug, Clone)]
pub struct FanOutLine {
    pub index: usize,
    pub clip: Option<ClipRef>,
}

/// Result of rendering a whole dialogue.
#[derive(Debug)]
pub enum DialogueAudio {
    /// One multi-speaker clip covering the whole script.
    OneCall(ClipRef),
    /// Per-line clips in input order.
    PerLine(Vec<FanOutLine>),
}

/// TTS dispatcher over an ordered provider chain.
///
/// Clip identity is the deterministic basename; the in-memory map is a
/// read-through veneer over the files in the audio directory, which is
/// what actually survives restarts.
pub struct TtsDispatcher {
    providers: Vec<Arc<dyn TtsProvider>>,
    audio_dir: PathBuf,
    workers: usize,
    sample_rate: u32,
    bitrate_kbps: u32,
    provider_timeout: Duration,
    clip_cache: RwLock<HashMap<String, ClipRef>>,
}

impl TtsDispatcher {
    /// Create a dispatcher over an explicit provider chain.
    pub fn new(providers: Vec<Arc<dyn TtsProvider>>, audio_dir: PathBuf, settings: &Settings) -> Self {
        Self {
            providers,
            audio_dir,
            workers: settings.tts.workers.max(1),
            sample_rate: settings.audio.sample_rate,
            bitrate_kbps: settings.audio.bitrate_kbps,
            provider_timeout: Duration::from_secs(settings.timeouts.provider_s),
            clip_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build the provider chain from settings.
    ///
    /// Default order is gemini, google, edge, hf, offline. TTS_PROVIDER in
    /// the environment (or `tts.provider` in config) forces a single
    /// provider and disables fallback.
    pub fn build_chain(settings: &Settings) -> Result<Vec<Arc<dyn TtsProvider>>> {
        let chain: Vec<Arc<dyn TtsProvider>> = vec![
            Arc::new(GeminiTtsProvider::new()),
            Arc::new(GoogleTtsProvider::new()),
            Arc::new(EdgeProvider::new()),
            Arc::new(HfProvider::new(&settings.tts.hf_model)),
            Arc::new(OfflineProvider::new()),
        ];

        let forced = std::env::var("TTS_PROVIDER")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| settings.tts.provider.clone());

        match forced {
            None => Ok(chain),
            Some(tag) => {
                let tag = tag.to_lowercase();
                let provider = chain
                    .into_iter()
                    .find(|p| p.tag() == tag)
                    .ok_or_else(|| {
                        FortellError::Config(format!("Unknown TTS provider: {}", tag))
                    })?;
                info!("TTS provider forced to {}, fallback disabled", tag);
                Ok(vec![provider])
            }
        }
    }

    /// Rebuild the in-memory clip map by scanning the audio directory.
    pub fn warm_cache_from_disk(&self) -> Result<usize> {
        let mut restored = 0;
        if !self.audio_dir.exists() {
            return Ok(0);
        }
        for entry in std::fs::read_dir(&self.audio_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(basename) = name.strip_suffix(".mp3") {
                if basename.starts_with("tts_") {
                    let clip = ClipRef {
                        path: entry.path(),
                        url: format!("/audio/{}", name),
                    };
                    self.clip_cache
                        .write()
                        .unwrap()
                        .insert(basename.to_string(), clip);
                    restored += 1;
                }
            }
        }
        debug!("Restored {} cached clips from disk", restored);
        Ok(restored)
    }

    /// Look up a clip by basename, consulting the map then the disk.
    fn cached_clip(&self, basename: &str) -> Option<ClipRef> {
        if let Some(clip) = self.clip_cache.read().unwrap().get(basename) {
            return Some(clip.clone());
        }
        let path = self.audio_dir.join(format!("{}.mp3", basename));
        if path.exists() {
            let clip = ClipRef {
                path,
                url: format!("/audio/{}.mp3", basename),
            };
            self.clip_cache
                .write()
                .unwrap()
                .insert(basename.to_string(), clip.clone());
            return Some(clip);
        }
        None
    }

    /// Synthesize one line, walking the provider chain in order.
    #[instrument(skip(self, text, voices), fields(label = %label, text_len = text.len()))]
    pub async fn synthesize_line(
        &self,
        text: &str,
        label: SpeakerLabel,
        voices: &VoiceConfig,
        style: &str,
    ) -> Result<ClipRef> {
        for provider in &self.providers {
            let voice = voices.resolve(label, provider.as_ref());
            let basename = clip_basename(text, &voice, provider.tag(), style);

            if let Some(clip) = self.cached_clip(&basename) {
                debug!("Clip cache hit: {}", basename);
                return Ok(clip);
            }

            match self.attempt(provider, &basename, || provider.synthesize(text, &voice)).await {
                Some(clip) => return Ok(clip),
                None => continue,
            }
        }

        Err(FortellError::AllProvidersFailed(format!(
            "{} providers exhausted for line",
            self.providers.len()
        )))
    }

    /// Try a whole dialogue as one multi-speaker call on the preferred
    /// provider, if it supports that; otherwise (or on failure) fan out
    /// per line.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub async fn synthesize_dialogue(
        &self,
        lines: &[DialogueLine],
        labeled_text: &str,
        voices: &VoiceConfig,
        style: &str,
    ) -> Result<DialogueAudio> {
        if let Some(preferred) = self.providers.first() {
            if preferred.supports_multispeaker() {
                let voice_a = voices.resolve(SpeakerLabel::One, preferred.as_ref());
                let voice_b = voices.resolve(SpeakerLabel::Two, preferred.as_ref());
                let duet = format!("{}+{}", voice_a, voice_b);
                let basename = clip_basename(labeled_text, &duet, preferred.tag(), style);

                if let Some(clip) = self.cached_clip(&basename) {
                    debug!("Multi-speaker clip cache hit: {}", basename);
                    return Ok(DialogueAudio::OneCall(clip));
                }

                let attempt = self
                    .attempt(preferred, &basename, || {
                        preferred.synthesize_multispeaker(labeled_text, &voice_a, &voice_b)
                    })
                    .await;
                if let Some(clip) = attempt {
                    return Ok(DialogueAudio::OneCall(clip));
                }
                warn!("Multi-speaker call failed, falling back to per-line fan-out");
            }
        }

        let fan_out = self.fan_out(lines, voices, style).await;
        if fan_out.iter().all(|l| l.clip.is_none()) {
            return Err(FortellError::AllProvidersFailed(format!(
                "all {} lines failed",
                lines.len()
            )));
        }
        Ok(DialogueAudio::PerLine(fan_out))
    }

    /// Per-line fan-out on the bounded worker pool. Output order matches
    /// input order regardless of completion order.
    async fn fan_out(
        &self,
        lines: &[DialogueLine],
        voices: &VoiceConfig,
        style: &str,
    ) -> Vec<FanOutLine> {
        let mut results: Vec<FanOutLine> = stream::iter(lines.iter().enumerate())
            .map(|(index, line)| async move {
                let clip = self
                    .synthesize_line(&line.text, line.speaker, voices, style)
                    .await;
                match clip {
                    Ok(clip) => FanOutLine {
                        index,
                        clip: Some(clip),
                    },
                    Err(e) => {
                        error!("Line {} failed on every provider: {}", index, e);
                        FanOutLine { index, clip: None }
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        results.sort_by_key(|l| l.index);
        results
    }

    /// One provider attempt: deadline, classify, normalize, commit.
    /// Returns None when the chain should move on.
    async fn attempt<F, Fut>(
        &self,
        provider: &Arc<dyn TtsProvider>,
        basename: &str,
        call: F,
    ) -> Option<ClipRef>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<SynthesizedAudio, super::ProviderError>>,
    {
        let outcome = match timeout(self.provider_timeout, call()).await {
            Err(_) => {
                warn!("{} timed out after {:?}", provider.tag(), self.provider_timeout);
                return None;
            }
            Ok(outcome) => outcome,
        };

        let audio = match outcome {
            Ok(audio) => audio,
            Err(e) => {
                // Retryable kinds are routine; hard failures get a louder log.
                match e.kind {
                    ProviderErrorKind::RateLimited
                    | ProviderErrorKind::Timeout
                    | ProviderErrorKind::Transient => {
                        warn!("{} unavailable ({}), trying next provider", provider.tag(), e)
                    }
                    ProviderErrorKind::AuthFailure
                    | ProviderErrorKind::InvalidVoice
                    | ProviderErrorKind::Permanent => {
                        error!("{} failed ({}), trying next provider", provider.tag(), e)
                    }
                }
                return None;
            }
        };

        match self.commit_clip(basename, audio).await {
            Ok(clip) => {
                info!("{} synthesized {}", provider.tag(), basename);
                Some(clip)
            }
            Err(e) => {
                error!("Failed to commit clip from {}: {}", provider.tag(), e);
                None
            }
        }
    }

    /// Normalize provider bytes to the MP3 target and move them into place.
    /// The final name only ever appears via rename, so a half-written clip
    /// is never observable.
    async fn commit_clip(&self, basename: &str, audio: SynthesizedAudio) -> Result<ClipRef> {
        tokio::fs::create_dir_all(&self.audio_dir).await?;

        let token = uuid::Uuid::new_v4().simple().to_string();
        let (source_bytes, source_ext) = match audio.format {
            OutputFormat::Pcm => (
                wrap_pcm_to_wav(&audio.bytes, audio.sample_rate, audio.bits_per_sample)?,
                "wav",
            ),
            OutputFormat::Wav => (audio.bytes, "wav"),
            OutputFormat::Mp3 => (audio.bytes, "mp3"),
        };

        let staging_src = self
            .audio_dir
            .join(format!(".{}.{}.src.{}", basename, token, source_ext));
        let staging_out = self.audio_dir.join(format!(".{}.{}.out.mp3", basename, token));
        let final_path = self.audio_dir.join(format!("{}.mp3", basename));

        tokio::fs::write(&staging_src, &source_bytes).await?;

        let normalized =
            normalize_to_mp3(&staging_src, &staging_out, self.sample_rate, self.bitrate_kbps).await;
        let _ = tokio::fs::remove_file(&staging_src).await;
        if let Err(e) = normalized {
            let _ = tokio::fs::remove_file(&staging_out).await;
            return Err(e);
        }

        tokio::fs::rename(&staging_out, &final_path).await?;

        let clip = ClipRef {
            path: final_path,
            url: format!("/audio/{}.mp3", basename),
        };
        self.clip_cache
            .write()
            .unwrap()
            .insert(basename.to_string(), clip.clone());
        Ok(clip)
    }

    /// Number of clips the in-memory map currently resolves.
    pub fn cached_clip_count(&self) -> usize {
        self.clip_cache.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::{ProviderError, ProviderErrorKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that always fails with a fixed kind, counting attempts.
    struct FailingProvider {
        tag: &'static str,
        kind: ProviderErrorKind,
        multispeaker: bool,
        calls: AtomicUsize,
    }

    impl FailingProvider {
        fn new(tag: &'static str, kind: ProviderErrorKind) -> Self {
            Self {
                tag,
                kind,
                multispeaker: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn multispeaker(tag: &'static str, kind: ProviderErrorKind) -> Self {
            Self {
                tag,
                kind,
                multispeaker: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TtsProvider for FailingProvider {
        fn tag(&self) -> &'static str {
            self.tag
        }

        fn supports_multispeaker(&self) -> bool {
            self.multispeaker
        }

        fn output_format(&self) -> OutputFormat {
            OutputFormat::Mp3
        }

        fn default_voice(&self, label: SpeakerLabel) -> &'static str {
            match label {
                SpeakerLabel::One => "va",
                SpeakerLabel::Two => "vb",
            }
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
        ) -> std::result::Result<SynthesizedAudio, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(self.kind, "stubbed failure"))
        }

        async fn synthesize_multispeaker(
            &self,
            _labeled_text: &str,
            _voice_a: &str,
            _voice_b: &str,
        ) -> std::result::Result<SynthesizedAudio, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::new(self.kind, "stubbed multispeaker failure"))
        }
    }

    /// Provider whose synthesize must never run.
    struct PanicProvider {
        tag: &'static str,
    }

    #[async_trait]
    impl TtsProvider for PanicProvider {
        fn tag(&self) -> &'static str {
            self.tag
        }

        fn output_format(&self) -> OutputFormat {
            OutputFormat::Mp3
        }

        fn default_voice(&self, _label: SpeakerLabel) -> &'static str {
            "pv"
        }

        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
        ) -> std::result::Result<SynthesizedAudio, ProviderError> {
            panic!("provider must not be called on a cache hit");
        }
    }

    fn dispatcher_with(
        providers: Vec<Arc<dyn TtsProvider>>,
        audio_dir: &std::path::Path,
    ) -> TtsDispatcher {
        TtsDispatcher::new(providers, audio_dir.to_path_buf(), &Settings::default())
    }

    /// Drop a fake cached clip for (text, voice, tag, style) on disk.
    fn seed_clip(audio_dir: &std::path::Path, text: &str, voice: &str, tag: &str, style: &str) {
        let basename = clip_basename(text, voice, tag, style);
        std::fs::write(audio_dir.join(format!("{}.mp3", basename)), b"mp3bytes").unwrap();
    }

    #[tokio::test]
    async fn test_disk_cache_hit_skips_providers() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Arc<dyn TtsProvider>> = vec![Arc::new(PanicProvider { tag: "p1" })];
        seed_clip(dir.path(), "Hello.", "pv", "p1", "");

        let dispatcher = dispatcher_with(providers, dir.path());
        let clip = dispatcher
            .synthesize_line("Hello.", SpeakerLabel::One, &VoiceConfig::new(), "")
            .await
            .unwrap();
        assert!(clip.path.exists());
        assert!(clip.url.starts_with("/audio/tts_"));
    }

    #[tokio::test]
    async fn test_fallback_reaches_later_provider_cache() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(FailingProvider::new("p1", ProviderErrorKind::RateLimited));
        let second: Arc<dyn TtsProvider> = Arc::new(PanicProvider { tag: "p2" });
        // Second provider's clip is already on disk, so the chain resolves
        // there without a live call.
        seed_clip(dir.path(), "Hello.", "pv", "p2", "");

        let dispatcher = dispatcher_with(vec![first.clone(), second], dir.path());
        let clip = dispatcher
            .synthesize_line("Hello.", SpeakerLabel::One, &VoiceConfig::new(), "")
            .await
            .unwrap();

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert!(clip.url.contains("_p2"));
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Arc<dyn TtsProvider>> = vec![
            Arc::new(FailingProvider::new("p1", ProviderErrorKind::Transient)),
            Arc::new(FailingProvider::new("p2", ProviderErrorKind::Timeout)),
            Arc::new(FailingProvider::new("p3", ProviderErrorKind::Permanent)),
        ];
        let dispatcher = dispatcher_with(providers, dir.path());

        let err = dispatcher
            .synthesize_line("Hello.", SpeakerLabel::One, &VoiceConfig::new(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, FortellError::AllProvidersFailed(_)));

        // No files appeared under deterministic names.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Arc<dyn TtsProvider>> = vec![Arc::new(PanicProvider { tag: "p1" })];

        let lines = vec![
            DialogueLine {
                speaker: SpeakerLabel::One,
                text: "First line.".to_string(),
            },
            DialogueLine {
                speaker: SpeakerLabel::Two,
                text: "Second line.".to_string(),
            },
            DialogueLine {
                speaker: SpeakerLabel::One,
                text: "Third line.".to_string(),
            },
        ];
        for line in &lines {
            seed_clip(dir.path(), &line.text, "pv", "p1", "");
        }

        let dispatcher = dispatcher_with(providers, dir.path());
        let labeled = "Speaker 1: First line.\nSpeaker 2: Second line.\nSpeaker 1: Third line.";
        let audio = dispatcher
            .synthesize_dialogue(&lines, labeled, &VoiceConfig::new(), "")
            .await
            .unwrap();

        match audio {
            DialogueAudio::PerLine(fan_out) => {
                assert_eq!(fan_out.len(), 3);
                for (i, line) in fan_out.iter().enumerate() {
                    assert_eq!(line.index, i);
                    let expected = clip_basename(&lines[i].text, "pv", "p1", "");
                    assert!(line.clip.as_ref().unwrap().url.contains(&expected));
                }
            }
            DialogueAudio::OneCall(_) => panic!("expected per-line fan-out"),
        }
    }

    #[tokio::test]
    async fn test_multispeaker_failure_falls_back_to_fan_out() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(FailingProvider::multispeaker(
            "p1",
            ProviderErrorKind::Transient,
        ));
        let second: Arc<dyn TtsProvider> = Arc::new(PanicProvider { tag: "p2" });

        let lines = vec![
            DialogueLine {
                speaker: SpeakerLabel::One,
                text: "Hi.".to_string(),
            },
            DialogueLine {
                speaker: SpeakerLabel::Two,
                text: "Hello.".to_string(),
            },
        ];
        for line in &lines {
            seed_clip(dir.path(), &line.text, "pv", "p2", "");
        }

        let dispatcher = dispatcher_with(vec![first.clone(), second], dir.path());
        let audio = dispatcher
            .synthesize_dialogue(&lines, "Speaker 1: Hi.\nSpeaker 2: Hello.", &VoiceConfig::new(), "")
            .await
            .unwrap();

        // One multispeaker attempt, then per-line attempts that also fail
        // on p1 before resolving from p2's cache.
        assert!(first.calls.load(Ordering::SeqCst) >= 1);
        assert!(matches!(audio, DialogueAudio::PerLine(_)));
    }

    #[tokio::test]
    async fn test_dialogue_all_lines_failing_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let providers: Vec<Arc<dyn TtsProvider>> =
            vec![Arc::new(FailingProvider::new("p1", ProviderErrorKind::Transient))];
        let dispatcher = dispatcher_with(providers, dir.path());

        let lines = vec![
            DialogueLine {
                speaker: SpeakerLabel::One,
                text: "Hi.".to_string(),
            },
            DialogueLine {
                speaker: SpeakerLabel::Two,
                text: "Hello.".to_string(),
            },
        ];
        let err = dispatcher
            .synthesize_dialogue(&lines, "labeled", &VoiceConfig::new(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, FortellError::AllProvidersFailed(_)));
    }

    #[test]
    fn test_forced_provider_disables_fallback() {
        let mut settings = Settings::default();
        settings.tts.provider = Some("offline".to_string());
        let chain = TtsDispatcher::build_chain(&settings).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].tag(), "offline");
    }

    #[test]
    fn test_forced_unknown_provider_rejected() {
        let mut settings = Settings::default();
        settings.tts.provider = Some("nonesuch".to_string());
        assert!(matches!(
            TtsDispatcher::build_chain(&settings).unwrap_err(),
            FortellError::Config(_)
        ));
    }

    #[test]
    fn test_warm_cache_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        seed_clip(dir.path(), "a", "v", "p1", "");
        seed_clip(dir.path(), "b", "v", "p1", "");
        std::fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();

        let providers: Vec<Arc<dyn TtsProvider>> = vec![Arc::new(PanicProvider { tag: "p1" })];
        let dispatcher = dispatcher_with(providers, dir.path());
        assert_eq!(dispatcher.warm_cache_from_disk().unwrap(), 2);
        assert_eq!(dispatcher.cached_clip_count(), 2);
    }
}

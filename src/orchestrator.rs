//! Pipeline orchestrator for Fortell.
//!
//! Wires ingestion, retrieval, script synthesis, TTS dispatch, and muxing
//! together, and owns the process-lifetime caches that make repeat
//! requests cheap.

use crate::audio::{chapters_from, mux, probe_duration_ms, AudioArtifact, Chapter, MuxRequest};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{FortellError, Result};
use crate::index::{MemoryVectorIndex, PageKey, SearchHit, SearchParams, VectorIndex};
use crate::ingest::{extract_pages, sanitize_filename, Chunk, Ingestor};
use crate::insights::{Citation, CrossInsights, GroundedInsights, InsightsEngine};
use crate::llm::{GeminiClient, LanguageModel};
use crate::script::{
    DialogueLine, Script, ScriptKey, ScriptMode, ScriptRequest, ScriptSynth, SpeakerLabel, StyleHints,
};
use crate::tts::{DialogueAudio, TtsDispatcher, VoiceConfig};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Where the audio for a generate request comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Free text supplied directly.
    Text(String),
    /// One page of an uploaded document.
    Page { filename: String, page_number: u32 },
    /// The whole document.
    Entire { filename: String },
}

/// A generate-audio request.
#[derive(Debug, Clone)]
pub struct GenerateAudioRequest {
    pub source: AudioSource,
    pub podcast: bool,
    pub two_speakers: bool,
    pub accent: String,
    pub style: String,
    pub expressiveness: String,
    /// Per-label voice overrides from the request.
    pub speakers_override: HashMap<String, String>,
}

/// A search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub text: Option<String>,
    pub filename: Option<String>,
    pub page_number: Option<u32>,
    pub k: usize,
    pub fetch_k: Option<usize>,
    pub min_score: Option<f32>,
    pub exclude_self: bool,
}

/// Result of an ingest run.
#[derive(Debug)]
pub struct IngestResult {
    pub indexed_filenames: Vec<String>,
    pub skipped: Vec<String>,
    pub chunks_indexed: usize,
}

/// The main orchestrator.
pub struct Orchestrator {
    settings: Settings,
    ingestor: Ingestor,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    script_synth: ScriptSynth,
    dispatcher: TtsDispatcher,
    insights: InsightsEngine,
    artifact_flights: Mutex<HashMap<String, Arc<OnceCell<AudioArtifact>>>>,
}

impl Orchestrator {
    /// Create an orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_env()?);
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        Self::with_components(settings, llm, embedder)
    }

    /// Create an orchestrator with injected LLM and embedder backends.
    pub fn with_components(
        settings: Settings,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let prompts = Prompts::load(None)?;

        std::fs::create_dir_all(settings.document_library_dir())?;
        std::fs::create_dir_all(settings.audio_dir())?;

        let ingestor = Ingestor::new(&settings.ingest);
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(
            settings.embedding.dimensions as usize,
        ));

        let script_synth = ScriptSynth::new(
            llm.clone(),
            &settings.script.model,
            prompts.clone(),
            settings.script.signature_chars,
        );

        let chain = TtsDispatcher::build_chain(&settings)?;
        let dispatcher = TtsDispatcher::new(chain, settings.audio_dir(), &settings);

        let insights = InsightsEngine::new(llm, &settings.insights.model, prompts);

        Ok(Self {
            settings,
            ingestor,
            embedder,
            index,
            script_synth,
            dispatcher,
            insights,
            artifact_flights: Mutex::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        self.index.clone()
    }

    /// Rebuild in-memory state from disk: re-ingest the document library
    /// and warm the clip cache from the audio directory.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<()> {
        let restored = self.dispatcher.warm_cache_from_disk()?;
        if restored > 0 {
            info!("Restored {} cached clips", restored);
        }

        let library = self.settings.document_library_dir();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&library)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("pdf") {
                paths.push(entry.path());
            }
        }
        paths.sort();

        if !paths.is_empty() {
            let result = self.ingest_paths(&paths).await?;
            info!(
                "Re-ingested {} documents ({} chunks)",
                result.indexed_filenames.len(),
                result.chunks_indexed
            );
        }
        Ok(())
    }

    /// Ingest PDFs: copy into the library, extract, embed, index.
    ///
    /// Documents already indexed are skipped, so re-ingesting a file never
    /// grows the index.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestResult> {
        let library = self.settings.document_library_dir();
        let mut indexed = Vec::new();
        let mut skipped = Vec::new();
        let mut total_chunks = 0;

        for path in paths {
            let filename = sanitize_filename(&path.to_string_lossy());

            if self.index.contains_file(&filename).await? {
                info!("{} already indexed, skipping", filename);
                skipped.push(filename);
                continue;
            }

            let library_path = library.join(&filename);
            if !library_path.exists() {
                std::fs::copy(path, &library_path)?;
            }

            let chunks = match self.ingestor.ingest(&library_path).await {
                Ok(chunks) => chunks,
                // A single bad file fails the request; in a batch it is
                // reported and the rest proceed.
                Err(e) if paths.len() == 1 => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", filename, e);
                    skipped.push(filename);
                    continue;
                }
            };

            total_chunks += self.index_chunks(&chunks).await?;
            indexed.push(filename);
        }

        Ok(IngestResult {
            indexed_filenames: indexed,
            skipped,
            chunks_indexed: total_chunks,
        })
    }

    async fn index_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).await?;
        self.index.add(chunks, &vectors).await
    }

    /// Semantic search over the indexed corpus.
    ///
    /// Queries address either free text or an indexed page, whose chunk
    /// texts are aggregated (clamped to 2000 chars) as the query. When
    /// exclude-self filtering removes everything, the best same-page hit
    /// comes back alone rather than an empty list.
    #[instrument(skip(self, request))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let (query_text, self_page) = self.resolve_query(request).await?;
        let query_text = match query_text {
            Some(text) => text,
            None => return Ok(Vec::new()),
        };

        let query_vec = self.embedder.embed_query(&query_text).await?;

        let exclude = if request.exclude_self { self_page.clone() } else { None };
        let params = SearchParams {
            k: request.k,
            fetch_k: request.fetch_k,
            min_score: request.min_score,
            exclude,
        };
        let hits = self.index.search(&query_vec, &params).await?;

        if hits.is_empty() && request.exclude_self {
            if let Some(page) = self_page {
                // Exclude-self filtered everything out; surface the best
                // hit from the query's own page instead of nothing.
                let n = self.index.entry_count().await?;
                let self_params = SearchParams {
                    k: n,
                    fetch_k: Some(n),
                    min_score: None,
                    exclude: None,
                };
                let mut self_hits = self.index.search(&query_vec, &self_params).await?;
                self_hits.retain(|h| {
                    h.chunk.filename == page.filename && h.chunk.page_number == page.page_number
                });
                self_hits.truncate(1);
                return Ok(self_hits);
            }
        }

        Ok(hits)
    }

    /// Resolve a search-style request to query text and its own page.
    async fn resolve_query(
        &self,
        request: &SearchRequest,
    ) -> Result<(Option<String>, Option<PageKey>)> {
        if let Some(text) = request.text.as_ref().filter(|t| !t.trim().is_empty()) {
            return Ok((Some(text.trim().to_string()), None));
        }

        let filename = request.filename.as_ref().ok_or_else(|| {
            FortellError::InvalidInput("Provide text, or filename + page_number".to_string())
        })?;
        let page_number = request.page_number.ok_or_else(|| {
            FortellError::InvalidInput("Provide text, or filename + page_number".to_string())
        })?;

        let page = PageKey {
            filename: filename.clone(),
            page_number,
        };
        let text = self.index.page_text(&page).await?.map(|t| clamp(&t, 2000));
        Ok((text, Some(page)))
    }

    /// Grounded insights for a passage or an indexed page.
    #[instrument(skip(self, request))]
    pub async fn insights(&self, request: &SearchRequest) -> Result<GroundedInsights> {
        let (query_text, _) = self.resolve_query(request).await?;
        let text = query_text.ok_or_else(|| {
            FortellError::EmptyExtraction("No indexed text for the given page".to_string())
        })?;

        let k = request.k.max(1);
        let citations = match self.embedder.embed_query(&text).await {
            Ok(query_vec) => {
                let params = SearchParams {
                    k,
                    fetch_k: Some((k * 2).max(10)),
                    min_score: None,
                    exclude: None,
                };
                match self.index.search(&query_vec, &params).await {
                    Ok(hits) => hits.iter().map(Citation::from_hit).collect(),
                    Err(_) => Vec::new(),
                }
            }
            // Insights still work without retrieval; they are just less grounded.
            Err(e) => {
                warn!("Citation retrieval failed: {}", e);
                Vec::new()
            }
        };

        self.insights.grounded(&text, citations).await
    }

    /// Cross-document agreements and contradictions.
    ///
    /// `deep` widens the excerpt sample per document for a more thorough
    /// (and more expensive) comparison.
    #[instrument(skip(self))]
    pub async fn cross_insights(
        &self,
        filenames: Option<&[String]>,
        max_per_doc: usize,
        deep: bool,
        focus: Option<&str>,
    ) -> Result<CrossInsights> {
        let max_per_doc = if deep { max_per_doc * 2 } else { max_per_doc };
        let documents = match filenames {
            Some(names) if !names.is_empty() => names.to_vec(),
            _ => self
                .index
                .list_documents()
                .await?
                .into_iter()
                .map(|d| d.filename)
                .collect(),
        };

        let mut excerpts = Vec::new();
        for filename in &documents {
            for chunk in self.index.sample_chunks(filename, max_per_doc).await? {
                excerpts.push((chunk.filename, chunk.page_number, chunk.text));
            }
        }

        self.insights.cross(&excerpts, focus).await
    }

    /// Generate an audio artifact, honoring the request deadline.
    ///
    /// Concurrent requests resolving to the same cache identity coalesce
    /// into one in-flight computation.
    #[instrument(skip(self, request))]
    pub async fn generate_audio(&self, request: &GenerateAudioRequest) -> Result<AudioArtifact> {
        let deadline = Duration::from_secs(self.settings.timeouts.request_s);
        match timeout(deadline, self.generate_audio_inner(request)).await {
            Ok(result) => result,
            Err(_) => Err(FortellError::Timeout(format!(
                "generate-audio exceeded {}s deadline",
                self.settings.timeouts.request_s
            ))),
        }
    }

    async fn generate_audio_inner(&self, request: &GenerateAudioRequest) -> Result<AudioArtifact> {
        let (source_text, entire_pdf) = self.resolve_audio_source(&request.source).await?;

        let mode = if request.two_speakers {
            ScriptMode::Dialogue
        } else {
            ScriptMode::Narration
        };
        let script_request = ScriptRequest {
            source_text,
            mode,
            hints: StyleHints {
                accent: request.accent.clone(),
                style: request.style.clone(),
                expressiveness: request.expressiveness.clone(),
                podcast: request.podcast,
            },
            entire_pdf,
        };

        let voices = voice_config_from(&request.speakers_override)?;
        let script_key = ScriptKey::for_request(&script_request, self.settings.script.signature_chars);
        let flight_key = format!(
            "{}:{}",
            script_key.as_hex(),
            voices_signature(&request.speakers_override, &request.style)
        );

        let cell = {
            let mut flights = self.artifact_flights.lock().unwrap();
            flights
                .entry(flight_key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let artifact = cell
            .get_or_try_init(|| async {
                // A persisted artifact record makes restarts free: the
                // chapters carry the script, the clips carry the audio.
                if let Some(artifact) = self.load_artifact_record(&flight_key) {
                    return Ok::<AudioArtifact, FortellError>(artifact);
                }

                let script = self.script_synth.synthesize(&script_request).await?;
                let artifact = self.render_script(&script, &voices, &script_request.hints.style).await?;
                if !artifact.degraded {
                    self.store_artifact_record(&flight_key, &artifact).await?;
                }
                Ok::<AudioArtifact, FortellError>(artifact)
            })
            .await?;

        Ok(artifact.clone())
    }

    fn artifact_record_path(&self, flight_key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(flight_key.as_bytes());
        let digest = hasher.finalize();
        self.settings
            .audio_dir()
            .join(format!("art_{}.json", hex::encode(&digest[..12])))
    }

    /// Load a persisted artifact for this request identity, if its audio
    /// files still exist on disk.
    fn load_artifact_record(&self, flight_key: &str) -> Option<AudioArtifact> {
        let path = self.artifact_record_path(flight_key);
        let content = std::fs::read_to_string(&path).ok()?;
        let artifact: AudioArtifact = serde_json::from_str(&content).ok()?;

        let audio_dir = self.settings.audio_dir();
        let exists = |url: &str| {
            url.strip_prefix("/audio/")
                .map(|name| audio_dir.join(name).exists())
                .unwrap_or(false)
        };
        if !exists(&artifact.url) || !artifact.parts.iter().all(|p| exists(p)) {
            return None;
        }

        info!("Artifact record hit for {}", path.display());
        Some(artifact)
    }

    async fn store_artifact_record(&self, flight_key: &str, artifact: &AudioArtifact) -> Result<()> {
        let path = self.artifact_record_path(flight_key);
        let staging = path.with_extension(format!("json.{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&staging, serde_json::to_vec_pretty(artifact)?).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    /// Resolve the request source to text; returns (text, entire_pdf).
    async fn resolve_audio_source(&self, source: &AudioSource) -> Result<(String, bool)> {
        match source {
            AudioSource::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(FortellError::InvalidInput(
                        "Provide non-empty text, or filename + page_number".to_string(),
                    ));
                }
                Ok((trimmed.to_string(), false))
            }
            AudioSource::Page {
                filename,
                page_number,
            } => {
                let pages = self.extract_library_pages(filename).await?;
                let page = pages
                    .iter()
                    .find(|p| p.number == *page_number)
                    .ok_or_else(|| {
                        FortellError::InvalidInput(format!(
                            "page_number {} out of range for {}",
                            page_number, filename
                        ))
                    })?;
                let text = page.text.trim().to_string();
                if text.is_empty() {
                    return Err(FortellError::EmptyExtraction(format!(
                        "No extractable text on page {} of {}",
                        page_number, filename
                    )));
                }
                Ok((text, false))
            }
            AudioSource::Entire { filename } => {
                let pages = self.extract_library_pages(filename).await?;
                let text = pages
                    .iter()
                    .map(|p| p.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                if text.is_empty() {
                    return Err(FortellError::EmptyExtraction(format!(
                        "No extractable text in {}",
                        filename
                    )));
                }
                Ok((text, true))
            }
        }
    }

    async fn extract_library_pages(&self, filename: &str) -> Result<Vec<crate::ingest::PageText>> {
        let safe = sanitize_filename(filename);
        let path = self.settings.document_library_dir().join(&safe);
        if !path.is_file() {
            return Err(FortellError::InvalidDocument(format!(
                "File not found in document library: {}",
                safe
            )));
        }
        extract_pages(&path).await
    }

    /// Render a synthesized script to a finished artifact.
    async fn render_script(
        &self,
        script: &Script,
        voices: &VoiceConfig,
        style: &str,
    ) -> Result<AudioArtifact> {
        match script {
            Script::Narration(text) => {
                let clip = self
                    .dispatcher
                    .synthesize_line(text, SpeakerLabel::One, voices, style)
                    .await?;
                let duration_ms = probe_duration_ms(&clip.path).await?;
                Ok(AudioArtifact {
                    url: clip.url,
                    parts: Vec::new(),
                    chapters: vec![Chapter {
                        index: 0,
                        speaker: "Narrator".to_string(),
                        text: text.clone(),
                        start_ms: 0,
                        end_ms: duration_ms,
                        part_url: None,
                    }],
                    degraded: false,
                })
            }
            Script::Dialogue(lines) => {
                let labeled = script.to_labeled_text();
                let audio = self
                    .dispatcher
                    .synthesize_dialogue(lines, &labeled, voices, style)
                    .await?;
                self.assemble_dialogue_artifact(lines, &labeled, audio, style)
                    .await
            }
        }
    }

    async fn assemble_dialogue_artifact(
        &self,
        lines: &[DialogueLine],
        labeled: &str,
        audio: DialogueAudio,
        style: &str,
    ) -> Result<AudioArtifact> {
        match audio {
            DialogueAudio::OneCall(clip) => {
                let total_ms = probe_duration_ms(&clip.path).await?;
                Ok(AudioArtifact {
                    url: clip.url,
                    parts: Vec::new(),
                    chapters: allocate_chapters(lines, total_ms),
                    degraded: false,
                })
            }
            DialogueAudio::PerLine(fan_out) => {
                let complete = fan_out.iter().all(|l| l.clip.is_some());

                if complete {
                    let clips: Vec<_> = fan_out.iter().filter_map(|l| l.clip.clone()).collect();
                    let basename = artifact_basename(labeled, style);
                    let audio_dir = self.settings.audio_dir();
                    let request = MuxRequest {
                        clips: &clips,
                        lines,
                        audio_dir: &audio_dir,
                        basename: &basename,
                        sample_rate: self.settings.audio.sample_rate,
                        bitrate_kbps: self.settings.audio.bitrate_kbps,
                        probe_workers: self.settings.tts.bg_workers,
                    };

                    // A previous run already produced this artifact; rebuild
                    // chapters from the cached clips instead of re-encoding.
                    let final_path = audio_dir.join(format!("{}.mp3", basename));
                    if final_path.exists() {
                        let mut durations = Vec::with_capacity(clips.len());
                        for clip in &clips {
                            durations.push(probe_duration_ms(&clip.path).await?);
                        }
                        let part_urls: Vec<Option<String>> =
                            clips.iter().map(|c| Some(c.url.clone())).collect();
                        return Ok(AudioArtifact {
                            url: format!("/audio/{}.mp3", basename),
                            parts: clips.iter().map(|c| c.url.clone()).collect(),
                            chapters: chapters_from(lines, &durations, &part_urls),
                            degraded: false,
                        });
                    }

                    mux(&request).await
                } else {
                    // Partial fan-out: deliver what succeeded, flagged.
                    let mut chapters = Vec::new();
                    let mut parts = Vec::new();
                    let mut index = 0;
                    for line_result in &fan_out {
                        if let Some(clip) = &line_result.clip {
                            let duration = probe_duration_ms(&clip.path).await?;
                            chapters.push(Chapter {
                                index,
                                speaker: lines[line_result.index].speaker.as_str().to_string(),
                                text: lines[line_result.index].text.clone(),
                                start_ms: 0,
                                end_ms: duration,
                                part_url: Some(clip.url.clone()),
                            });
                            parts.push(clip.url.clone());
                            index += 1;
                        }
                    }
                    let url = parts.first().cloned().ok_or_else(|| {
                        FortellError::AllProvidersFailed("no line synthesized".to_string())
                    })?;
                    Ok(AudioArtifact {
                        url,
                        parts,
                        chapters,
                        degraded: true,
                    })
                }
            }
        }
    }
}

/// Deterministic merged-artifact basename for a labeled script.
fn artifact_basename(labeled_text: &str, style: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(labeled_text.as_bytes());
    hasher.update([0]);
    hasher.update(style.as_bytes());
    let digest = hasher.finalize();
    format!("mix_{}", hex::encode(&digest[..12]))
}

/// Allocate per-line chapters across a single blob proportionally to line
/// length; the last chapter absorbs rounding so the total matches exactly.
fn allocate_chapters(lines: &[DialogueLine], total_ms: u64) -> Vec<Chapter> {
    let total_chars: u64 = lines.iter().map(|l| l.text.chars().count().max(1) as u64).sum();
    let mut chapters = Vec::with_capacity(lines.len());
    let mut cursor = 0u64;

    for (index, line) in lines.iter().enumerate() {
        let end_ms = if index == lines.len() - 1 {
            total_ms
        } else {
            let weight = line.text.chars().count().max(1) as u64;
            (cursor + (total_ms * weight) / total_chars).min(total_ms)
        };
        chapters.push(Chapter {
            index,
            speaker: line.speaker.as_str().to_string(),
            text: line.text.clone(),
            start_ms: cursor,
            end_ms,
            part_url: None,
        });
        cursor = end_ms;
    }
    chapters
}

/// Translate request voice overrides into a `VoiceConfig`.
fn voice_config_from(overrides: &HashMap<String, String>) -> Result<VoiceConfig> {
    let mut config = VoiceConfig::new();
    for (label, voice) in overrides {
        let speaker = match label.trim().to_lowercase().as_str() {
            "speaker 1" | "speaker1" | "1" | "a" => SpeakerLabel::One,
            "speaker 2" | "speaker2" | "2" | "b" => SpeakerLabel::Two,
            other => {
                return Err(FortellError::InvalidInput(format!(
                    "Unknown speaker label in voice override: {}",
                    other
                )))
            }
        };
        config = config.with_override(speaker, voice.clone());
    }
    Ok(config)
}

/// Stable signature of the voice overrides for flight coalescing.
fn voices_signature(overrides: &HashMap<String, String>, style: &str) -> String {
    let mut pairs: Vec<_> = overrides.iter().collect();
    pairs.sort();
    let joined = pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}|{}", joined, style)
}

fn clamp(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(speaker: SpeakerLabel, text: &str) -> DialogueLine {
        DialogueLine {
            speaker,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_allocate_chapters_contiguous_and_exact() {
        let lines = vec![
            line(SpeakerLabel::One, "Short."),
            line(SpeakerLabel::Two, "A noticeably longer line of dialogue."),
            line(SpeakerLabel::One, "Mid length line."),
        ];
        let chapters = allocate_chapters(&lines, 10_000);

        assert_eq!(chapters[0].start_ms, 0);
        for window in chapters.windows(2) {
            assert_eq!(window[0].end_ms, window[1].start_ms);
        }
        assert_eq!(chapters.last().unwrap().end_ms, 10_000);
        // Longer lines get proportionally more time.
        assert!(
            chapters[1].end_ms - chapters[1].start_ms
                > chapters[0].end_ms - chapters[0].start_ms
        );
    }

    #[test]
    fn test_allocate_chapters_single_line() {
        let lines = vec![line(SpeakerLabel::One, "Only line.")];
        let chapters = allocate_chapters(&lines, 1234);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].start_ms, 0);
        assert_eq!(chapters[0].end_ms, 1234);
    }

    #[test]
    fn test_artifact_basename_deterministic() {
        let a = artifact_basename("Speaker 1: Hi.\nSpeaker 2: Hello.", "calm");
        let b = artifact_basename("Speaker 1: Hi.\nSpeaker 2: Hello.", "calm");
        assert_eq!(a, b);
        assert!(a.starts_with("mix_"));
        assert_ne!(a, artifact_basename("Speaker 1: Hi.\nSpeaker 2: Hello.", "bright"));
    }

    #[test]
    fn test_voice_config_from_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("Speaker 1".to_string(), "Alpha".to_string());
        overrides.insert("b".to_string(), "Beta".to_string());
        assert!(voice_config_from(&overrides).is_ok());

        let mut bad = HashMap::new();
        bad.insert("Speaker 9".to_string(), "X".to_string());
        assert!(matches!(
            voice_config_from(&bad).unwrap_err(),
            FortellError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_voices_signature_order_independent() {
        let mut a = HashMap::new();
        a.insert("Speaker 1".to_string(), "Alpha".to_string());
        a.insert("Speaker 2".to_string(), "Beta".to_string());
        let mut b = HashMap::new();
        b.insert("Speaker 2".to_string(), "Beta".to_string());
        b.insert("Speaker 1".to_string(), "Alpha".to_string());
        assert_eq!(voices_signature(&a, "s"), voices_signature(&b, "s"));
    }
}

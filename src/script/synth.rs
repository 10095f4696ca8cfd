//! Script synthesis with a signature-keyed cache.

use super::{parse_dialogue, Script, ScriptKey, ScriptMode, ScriptRequest};
use crate::config::Prompts;
use crate::error::{FortellError, Result};
use crate::llm::{GenerateOptions, LanguageModel, ResponseFormat};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// Script synthesizer.
///
/// The cache maps each `ScriptKey` to a single-flight cell: concurrent
/// requests for the same key share one LLM call, and a failed call leaves
/// no entry behind.
pub struct ScriptSynth {
    llm: Arc<dyn LanguageModel>,
    model: String,
    prompts: Prompts,
    signature_chars: usize,
    cache: Mutex<HashMap<ScriptKey, Arc<OnceCell<Script>>>>,
}

impl ScriptSynth {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        model: &str,
        prompts: Prompts,
        signature_chars: usize,
    ) -> Self {
        Self {
            llm,
            model: model.to_string(),
            prompts,
            signature_chars,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Produce a script for the request, consulting the cache first.
    #[instrument(skip(self, request), fields(mode = ?request.mode))]
    pub async fn synthesize(&self, request: &ScriptRequest) -> Result<Script> {
        if request.source_text.trim().is_empty() {
            return Err(FortellError::InvalidInput(
                "Cannot synthesize a script from empty text".to_string(),
            ));
        }

        let key = ScriptKey::for_request(request, self.signature_chars);
        let cell = {
            let mut cache = self.cache.lock().unwrap();
            cache
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(script) = cell.get() {
            debug!("Script cache hit for {}", key.as_hex());
            return Ok(script.clone());
        }

        let script = cell
            .get_or_try_init(|| async {
                info!("Script cache miss for {}, calling LLM", key.as_hex());
                self.generate(request).await
            })
            .await?;

        Ok(script.clone())
    }

    /// Number of cached scripts.
    pub fn cache_len(&self) -> usize {
        let cache = self.cache.lock().unwrap();
        cache.values().filter(|cell| cell.get().is_some()).count()
    }

    async fn generate(&self, request: &ScriptRequest) -> Result<Script> {
        let mut vars = HashMap::new();
        vars.insert("content".to_string(), request.source_text.clone());
        vars.insert(
            "length_hint".to_string(),
            length_hint(&request.hints.expressiveness).to_string(),
        );
        vars.insert("accent".to_string(), default_if_empty(&request.hints.accent, "neutral"));
        vars.insert(
            "style".to_string(),
            default_if_empty(&request.hints.style, "conversational"),
        );

        let template = match request.mode {
            ScriptMode::Narration => &self.prompts.narration.user,
            ScriptMode::Dialogue => &self.prompts.dialogue.user,
        };
        let prompt = Prompts::render(template, &vars);

        let opts = GenerateOptions {
            temperature: Some(0.7),
            max_tokens: None,
            response_format: ResponseFormat::Text,
        };

        let response = self
            .llm
            .generate(&prompt, &self.model, &opts)
            .await
            .map_err(|e| FortellError::ScriptSynth(e.to_string()))?;

        match request.mode {
            ScriptMode::Narration => {
                let text = response.trim().to_string();
                if text.is_empty() {
                    return Err(FortellError::ScriptSynth(
                        "LLM returned an empty narration".to_string(),
                    ));
                }
                Ok(Script::Narration(text))
            }
            ScriptMode::Dialogue => Ok(Script::Dialogue(parse_dialogue(&response)?)),
        }
    }
}

/// Spoken-length target for the expressiveness setting.
fn length_hint(expressiveness: &str) -> &'static str {
    match expressiveness.to_lowercase().as_str() {
        "brief" | "low" => "15-45 seconds",
        "high" | "expressive" => "3-5 minutes",
        _ => "1-2 minutes",
    }
}

fn default_if_empty(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::StyleHints;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub LLM that counts calls and replays a canned response.
    struct StubLlm {
        response: String,
        calls: AtomicUsize,
    }

    impl StubLlm {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for StubLlm {
        async fn generate(
            &self,
            _prompt: &str,
            _model: &str,
            _opts: &GenerateOptions,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn request(text: &str, mode: ScriptMode) -> ScriptRequest {
        ScriptRequest {
            source_text: text.to_string(),
            mode,
            hints: StyleHints::default(),
            entire_pdf: false,
        }
    }

    fn synth_with(llm: Arc<StubLlm>) -> ScriptSynth {
        ScriptSynth::new(llm, "test-model", Prompts::default(), 1000)
    }

    #[tokio::test]
    async fn test_narration_returns_response_text() {
        let llm = Arc::new(StubLlm::new("A calm reading of the source."));
        let synth = synth_with(llm.clone());

        let script = synth
            .synthesize(&request("Photosynthesis converts light.", ScriptMode::Narration))
            .await
            .unwrap();
        assert_eq!(script, Script::Narration("A calm reading of the source.".to_string()));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_llm() {
        let llm = Arc::new(StubLlm::new("Narrated text."));
        let synth = synth_with(llm.clone());

        let request = request("Same input twice.", ScriptMode::Narration);
        let first = synth.synthesize(&request).await.unwrap();
        let second = synth.synthesize(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(synth.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_coalesce() {
        let llm = Arc::new(StubLlm::new("Shared narration."));
        let synth = Arc::new(synth_with(llm.clone()));

        let request = request("Coalesced input.", ScriptMode::Narration);
        let (a, b) = tokio::join!(synth.synthesize(&request), synth.synthesize(&request));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dialogue_parsed_and_cached() {
        let llm = Arc::new(StubLlm::new(
            "Speaker 1: What does the paper claim?\nSpeaker 2: Three results.",
        ));
        let synth = synth_with(llm.clone());

        let script = synth
            .synthesize(&request("Paper text.", ScriptMode::Dialogue))
            .await
            .unwrap();
        match script {
            Script::Dialogue(lines) => assert_eq!(lines.len(), 2),
            other => panic!("expected dialogue, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_dialogue_not_cached() {
        let llm = Arc::new(StubLlm::new("Speaker 1: Just one voice here."));
        let synth = synth_with(llm.clone());

        let request = request("Input.", ScriptMode::Dialogue);
        let err = synth.synthesize(&request).await.unwrap_err();
        assert!(matches!(err, FortellError::MalformedScript(_)));
        assert_eq!(synth.cache_len(), 0);

        // A retry consults the LLM again rather than replaying the failure.
        let _ = synth.synthesize(&request).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let llm = Arc::new(StubLlm::new("anything"));
        let synth = synth_with(llm.clone());
        let err = synth
            .synthesize(&request("   ", ScriptMode::Narration))
            .await
            .unwrap_err();
        assert!(matches!(err, FortellError::InvalidInput(_)));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}

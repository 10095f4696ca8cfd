//! Doctor command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use anyhow::Result;

/// Check every external tool and credential the pipeline can use.
pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("External tools");
    let mut failures = 0;
    for tool in ["pdftotext", "ffmpeg", "ffprobe", "edge-tts", "espeak-ng"] {
        match preflight::check_tool(tool) {
            Ok(()) => Output::success(&format!("{} found", tool)),
            Err(e) => {
                // edge-tts and espeak-ng are optional fallback providers.
                if matches!(tool, "edge-tts" | "espeak-ng") {
                    Output::warning(&format!("{} (optional): {}", tool, e));
                } else {
                    Output::error(&format!("{}: {}", tool, e));
                    failures += 1;
                }
            }
        }
    }

    Output::header("Credentials");
    for (name, purpose) in [
        ("GOOGLE_API_KEY", "script + insights LLM, Gemini TTS"),
        ("OPENAI_API_KEY", "embeddings"),
        ("GOOGLE_TTS_API_KEY", "Google TTS (optional)"),
        ("HUGGINGFACE_API_TOKEN", "Hugging Face TTS (optional)"),
    ] {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Output::success(&format!("{} set ({})", name, purpose)),
            _ => {
                if purpose.contains("optional") {
                    Output::warning(&format!("{} not set ({})", name, purpose));
                } else {
                    Output::error(&format!("{} not set ({})", name, purpose));
                    failures += 1;
                }
            }
        }
    }

    Output::header("Configuration");
    Output::kv("data dir", &settings.data_dir().display().to_string());
    Output::kv(
        "tts provider",
        std::env::var("TTS_PROVIDER")
            .ok()
            .or_else(|| settings.tts.provider.clone())
            .as_deref()
            .unwrap_or("(fallback chain)"),
    );
    Output::kv("embedding dims", &settings.embedding.dimensions.to_string());

    if failures > 0 {
        anyhow::bail!("{} required check(s) failed", failures);
    }
    Output::success("All required checks passed");
    Ok(())
}

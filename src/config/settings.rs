//! Configuration settings for Fortell.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ingest: IngestSettings,
    pub embedding: EmbeddingSettings,
    pub script: ScriptSettings,
    pub tts: TtsSettings,
    pub audio: AudioSettings,
    pub insights: InsightsSettings,
    pub timeouts: TimeoutSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (document library, audio).
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.fortell".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// PDF ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Target chunk size in tokens (~4 chars per token).
    pub chunk_target_tokens: usize,
    /// Overlap between adjacent chunks in tokens.
    pub chunk_overlap_tokens: usize,
    /// Maximum accepted upload size in megabytes.
    pub max_file_size_mb: u64,
    /// Accepted file extensions.
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_target_tokens: 500,
            chunk_overlap_tokens: 50,
            max_file_size_mb: 50,
            allowed_extensions: vec!["pdf".to_string()],
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Fixed at startup; the index inherits it.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
        }
    }
}

/// Script synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// LLM model for script generation.
    pub model: String,
    /// How many characters of the source feed the cache signature.
    pub signature_chars: usize,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            signature_chars: 1000,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Force a single provider (gemini, google, edge, hf, offline).
    /// When set, no fallback is attempted. Overridden by TTS_PROVIDER.
    pub provider: Option<String>,
    /// Worker pool size for per-line fan-out.
    pub workers: usize,
    /// Worker pool size for background work (LLM calls, muxing, disk IO).
    pub bg_workers: usize,
    /// Hugging Face TTS model for the hf provider.
    pub hf_model: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: None,
            workers: 2,
            bg_workers: 4,
            hf_model: "nari-labs/Dia-1.6B".to_string(),
        }
    }
}

/// Output audio settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Target sample rate in Hz for normalized clips.
    pub sample_rate: u32,
    /// Target bitrate in kbps for normalized clips.
    pub bitrate_kbps: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            bitrate_kbps: 160,
        }
    }
}

/// Insights generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsSettings {
    /// LLM model for insights generation.
    pub model: String,
    /// Maximum number of retrieved citations.
    pub max_citations: usize,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            max_citations: 5,
        }
    }
}

/// Deadlines for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Whole-request deadline in seconds.
    pub request_s: u64,
    /// Per-provider call deadline in seconds.
    pub provider_s: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_s: 300,
            provider_s: 60,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FortellError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fortell")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory holding uploaded PDFs.
    pub fn document_library_dir(&self) -> PathBuf {
        self.data_dir().join("document_library")
    }

    /// Directory holding cached clips and merged artifacts.
    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir().join("audio")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.dimensions, 384);
        assert_eq!(settings.tts.workers, 2);
        assert_eq!(settings.timeouts.request_s, 300);
        assert_eq!(settings.timeouts.provider_s, 60);
    }

    #[test]
    fn test_data_subdirs() {
        let settings = Settings::default();
        assert!(settings.document_library_dir().ends_with("document_library"));
        assert!(settings.audio_dir().ends_with("audio"));
    }
}

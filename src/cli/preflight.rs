//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{FortellError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion needs the PDF extractor and the embedding API key.
    Ingest,
    /// Audio generation needs the LLM key and the audio tools.
    GenerateAudio,
    /// Search needs the embedding API key.
    Search,
    /// Insights need the LLM and embedding API keys.
    Insights,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    // The orchestrator wires the LLM client at construction, so every
    // operation needs its key even when the call path never reaches it.
    check_env("GOOGLE_API_KEY")?;
    match operation {
        Operation::Ingest => {
            check_env("OPENAI_API_KEY")?;
            check_tool("pdftotext")?;
        }
        Operation::GenerateAudio => {
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
        }
        Operation::Search => {
            check_env("OPENAI_API_KEY")?;
        }
        Operation::Insights => {
            check_env("OPENAI_API_KEY")?;
        }
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_env(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(FortellError::Config(format!(
            "{name} is empty. Set it with: export {name}='...'",
        ))),
        Err(_) => Err(FortellError::Config(format!(
            "{name} not set. Set it with: export {name}='...'",
        ))),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), pdftotext uses -v,
    // others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        "pdftotext" => "-v",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(FortellError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FortellError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(FortellError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

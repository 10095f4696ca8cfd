//! Clip duration measurement via ffprobe.

use crate::error::{FortellError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::instrument;

/// Measure the exact duration of an audio file in milliseconds.
///
/// Durations are probed, never estimated from text or byte length; chapter
/// timestamps depend on this being exact.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn probe_duration_ms(path: &Path) -> Result<u64> {
    let result = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FortellError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(FortellError::ToolFailed(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(FortellError::ToolFailed(format!(
            "ffprobe returned error for {}",
            path.display()
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|_| FortellError::ToolFailed("Invalid ffprobe output".into()))?;

    let seconds = parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| FortellError::ToolFailed("Could not determine audio duration".into()))?;

    Ok((seconds * 1000.0).round() as u64)
}

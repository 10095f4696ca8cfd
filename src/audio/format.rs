//! Audio format normalization.
//!
//! Every clip counts only once it is in the uniform target format; raw PCM
//! from providers that skip containers entirely is first wrapped in a WAV
//! header built from the provider-reported sample rate and bit depth.

use crate::error::{FortellError, Result};
use std::io::Cursor;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Wrap raw little-endian PCM in a WAV container.
pub fn wrap_pcm_to_wav(pcm: &[u8], sample_rate: u32, bits_per_sample: u16) -> Result<Vec<u8>> {
    if bits_per_sample != 16 {
        return Err(FortellError::ToolFailed(format!(
            "Unsupported PCM bit depth: {}",
            bits_per_sample
        )));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| FortellError::ToolFailed(format!("WAV header write failed: {e}")))?;
        for sample in pcm.chunks_exact(2) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            writer
                .write_sample(value)
                .map_err(|e| FortellError::ToolFailed(format!("WAV sample write failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| FortellError::ToolFailed(format!("WAV finalize failed: {e}")))?;
    }

    Ok(cursor.into_inner())
}

/// Re-encode an audio file to the uniform MP3 target.
///
/// Channel count is preserved; sample rate and bitrate come from settings.
#[instrument(skip_all, fields(source = %source.display()))]
pub async fn normalize_to_mp3(
    source: &Path,
    dest: &Path,
    sample_rate: u32,
    bitrate_kbps: u32,
) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-ar").arg(sample_rate.to_string())
        .arg("-b:a").arg(format!("{}k", bitrate_kbps))
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(FortellError::ToolFailed(format!(
                "ffmpeg conversion failed: {err}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FortellError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(FortellError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

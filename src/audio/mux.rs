//! Clip concatenation and chapter annotation.

use super::{probe_duration_ms, AudioArtifact, Chapter, ClipRef};
use crate::error::{FortellError, Result};
use crate::script::DialogueLine;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// Inputs for one mux operation.
pub struct MuxRequest<'a> {
    /// Per-line clips; `clips[i]` corresponds to `lines[i]`.
    pub clips: &'a [ClipRef],
    pub lines: &'a [DialogueLine],
    /// Directory the merged artifact lands in.
    pub audio_dir: &'a Path,
    /// Deterministic basename of the merged artifact, without extension.
    pub basename: &'a str,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    /// Concurrency bound for duration probes.
    pub probe_workers: usize,
}

/// Build contiguous chapters from measured clip durations.
pub fn chapters_from(
    lines: &[DialogueLine],
    durations_ms: &[u64],
    part_urls: &[Option<String>],
) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(lines.len());
    let mut cursor = 0u64;
    for (index, line) in lines.iter().enumerate() {
        let duration = durations_ms[index];
        chapters.push(Chapter {
            index,
            speaker: line.speaker.as_str().to_string(),
            text: line.text.clone(),
            start_ms: cursor,
            end_ms: cursor + duration,
            part_url: part_urls.get(index).cloned().flatten(),
        });
        cursor += duration;
    }
    chapters
}

/// Concatenate clips into one artifact and annotate chapters.
///
/// Clips are re-encoded to the uniform target during concatenation, so
/// mixed sample rates or codecs cannot poison the output. When the
/// concatenation tool fails the artifact degrades to parts: the first clip
/// becomes the primary URL and chapter timestamps are per-clip.
#[instrument(skip_all, fields(clips = req.clips.len(), basename = req.basename))]
pub async fn mux(req: &MuxRequest<'_>) -> Result<AudioArtifact> {
    if req.clips.len() != req.lines.len() {
        return Err(FortellError::InvalidInput(format!(
            "Clip/line count mismatch: {} vs {}",
            req.clips.len(),
            req.lines.len()
        )));
    }
    if req.clips.is_empty() {
        return Err(FortellError::InvalidInput("Nothing to mux".to_string()));
    }

    // Measured, never estimated; probes run on a bounded pool with
    // order preserved.
    let durations_ms: Vec<u64> = stream::iter(req.clips)
        .map(|clip| probe_duration_ms(&clip.path))
        .buffered(req.probe_workers.max(1))
        .try_collect()
        .await?;

    let part_urls: Vec<Option<String>> =
        req.clips.iter().map(|c| Some(c.url.clone())).collect();
    let parts: Vec<String> = req.clips.iter().map(|c| c.url.clone()).collect();

    match concat_clips(req).await {
        Ok(final_name) => {
            let chapters = chapters_from(req.lines, &durations_ms, &part_urls);

            let merged_path = req.audio_dir.join(&final_name);
            let merged_ms = probe_duration_ms(&merged_path).await?;
            let expected_ms: u64 = durations_ms.iter().sum();
            if merged_ms.abs_diff(expected_ms) > 10 {
                warn!(
                    "Merged duration {}ms deviates from clip sum {}ms",
                    merged_ms, expected_ms
                );
            }

            info!("Muxed {} clips into {}", req.clips.len(), final_name);
            Ok(AudioArtifact {
                url: format!("/audio/{}", final_name),
                parts,
                chapters,
                degraded: false,
            })
        }
        Err(e) => {
            warn!("Mux failed, falling back to parts: {}", e);
            // Per-clip timestamps; there is no merged timeline to anchor to.
            let chapters: Vec<Chapter> = req
                .lines
                .iter()
                .enumerate()
                .map(|(index, line)| Chapter {
                    index,
                    speaker: line.speaker.as_str().to_string(),
                    text: line.text.clone(),
                    start_ms: 0,
                    end_ms: durations_ms[index],
                    part_url: Some(req.clips[index].url.clone()),
                })
                .collect();

            Ok(AudioArtifact {
                url: req.clips[0].url.clone(),
                parts,
                chapters,
                degraded: true,
            })
        }
    }
}

/// Run the concat re-encode; returns the final artifact file name.
async fn concat_clips(req: &MuxRequest<'_>) -> Result<String> {
    let final_name = format!("{}.mp3", req.basename);
    let staging = req
        .audio_dir
        .join(format!(".{}.{}.part", req.basename, uuid::Uuid::new_v4().simple()));
    let list_path = req
        .audio_dir
        .join(format!(".{}.{}.list", req.basename, uuid::Uuid::new_v4().simple()));

    // ffmpeg concat demuxer input: one absolute path per line, quoted.
    let mut list = String::new();
    for clip in req.clips {
        let absolute = clip
            .path
            .canonicalize()
            .map_err(|e| FortellError::ToolFailed(format!("Clip path invalid: {e}")))?;
        list.push_str(&format!(
            "file '{}'\n",
            absolute.to_string_lossy().replace('\'', r"'\''")
        ));
    }
    tokio::fs::write(&list_path, list).await?;

    let result = Command::new("ffmpeg")
        .arg("-f").arg("concat")
        .arg("-safe").arg("0")
        .arg("-i").arg(&list_path)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-ar").arg(req.sample_rate.to_string())
        .arg("-b:a").arg(format!("{}k", req.bitrate_kbps))
        .arg("-f").arg("mp3")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&staging)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let _ = tokio::fs::remove_file(&list_path).await;

    let outcome = match result {
        Ok(out) if out.status.success() => {
            // Half-written files never become visible under the final name.
            tokio::fs::rename(&staging, req.audio_dir.join(&final_name)).await?;
            Ok(final_name)
        }
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(FortellError::ToolFailed(format!("ffmpeg concat failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FortellError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(FortellError::ToolFailed(format!("ffmpeg error: {e}"))),
    };

    if outcome.is_err() {
        let _ = tokio::fs::remove_file(&staging).await;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::SpeakerLabel;

    fn line(speaker: SpeakerLabel, text: &str) -> DialogueLine {
        DialogueLine {
            speaker,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_chapters_are_contiguous_from_zero() {
        let lines = vec![
            line(SpeakerLabel::One, "Welcome."),
            line(SpeakerLabel::Two, "Glad to be here."),
            line(SpeakerLabel::One, "Let's dive in."),
        ];
        let durations = vec![1200, 3400, 2150];
        let urls = vec![
            Some("/audio/a.mp3".to_string()),
            Some("/audio/b.mp3".to_string()),
            Some("/audio/c.mp3".to_string()),
        ];

        let chapters = chapters_from(&lines, &durations, &urls);

        assert_eq!(chapters[0].start_ms, 0);
        for window in chapters.windows(2) {
            assert_eq!(window[0].end_ms, window[1].start_ms);
        }
        assert_eq!(chapters.last().unwrap().end_ms, 1200 + 3400 + 2150);
        for (i, chapter) in chapters.iter().enumerate() {
            assert_eq!(chapter.index, i);
            assert_eq!(chapter.text, lines[i].text);
        }
    }

    #[test]
    fn test_chapter_speakers_match_lines() {
        let lines = vec![
            line(SpeakerLabel::Two, "I open this time."),
            line(SpeakerLabel::One, "And I follow."),
        ];
        let chapters = chapters_from(&lines, &[500, 700], &[None, None]);
        assert_eq!(chapters[0].speaker, "Speaker 2");
        assert_eq!(chapters[1].speaker, "Speaker 1");
        assert!(chapters[0].part_url.is_none());
    }
}

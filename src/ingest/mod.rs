//! PDF ingestion for Fortell.
//!
//! Turns a PDF on disk into an ordered sequence of text chunks with page
//! and positional metadata, ready for embedding and indexing.

mod extract;
mod splitter;

pub use extract::{extract_pages, PageText};
pub use splitter::{split_page, SplitConfig};

use crate::config::IngestSettings;
use crate::error::{FortellError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// One extracted text fragment with its position in the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content, never empty.
    pub text: String,
    /// Sanitized leaf name of the source document.
    pub filename: String,
    /// 1-based page number.
    pub page_number: u32,
    /// Ordinal of the chunk within its page, 0-based.
    pub section_index: u32,
    /// Short heading-like label when the page text starts with one.
    pub section_title: Option<String>,
}

/// Reduce a user-supplied path to its leaf file name.
///
/// Keeps uploads from escaping the document library via path components.
pub fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string())
}

/// PDF ingestor.
pub struct Ingestor {
    split: SplitConfig,
    max_file_size_mb: u64,
    allowed_extensions: Vec<String>,
}

impl Ingestor {
    /// Create an ingestor from settings.
    pub fn new(settings: &IngestSettings) -> Self {
        Self {
            split: SplitConfig {
                target_tokens: settings.chunk_target_tokens,
                overlap_tokens: settings.chunk_overlap_tokens,
            },
            max_file_size_mb: settings.max_file_size_mb,
            allowed_extensions: settings.allowed_extensions.clone(),
        }
    }

    /// Validate a candidate file before extraction.
    fn validate(&self, path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|a| a == &ext) {
            return Err(FortellError::InvalidInput(format!(
                "Unsupported file extension '{}' for {}",
                ext,
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| FortellError::InvalidDocument(format!("{}: {}", path.display(), e)))?;
        let max_bytes = self.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(FortellError::InvalidInput(format!(
                "File exceeds {} MB limit: {}",
                self.max_file_size_mb,
                path.display()
            )));
        }
        Ok(())
    }

    /// Extract and chunk a PDF.
    ///
    /// Fails with `InvalidDocument` when the file is unreadable and
    /// `EmptyExtraction` when the whole document yields no chunks.
    /// Pages that stay empty after the block-level retry are skipped.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest(&self, path: &Path) -> Result<Vec<Chunk>> {
        self.validate(path)?;

        let filename = sanitize_filename(&path.to_string_lossy());
        let pages = extract_pages(path).await?;

        let mut chunks = Vec::new();
        for page in &pages {
            if page.text.trim().is_empty() {
                warn!("Page {} has no extractable text, skipping", page.number);
                continue;
            }

            let page_chunks = split_page(&page.text, &self.split);
            debug!("Page {}: {} chunks", page.number, page_chunks.len());

            for (section_index, piece) in page_chunks.into_iter().enumerate() {
                chunks.push(Chunk {
                    text: piece.text,
                    filename: filename.clone(),
                    page_number: page.number,
                    section_index: section_index as u32,
                    section_title: piece.section_title,
                });
            }
        }

        if chunks.is_empty() {
            return Err(FortellError::EmptyExtraction(format!(
                "No text could be extracted from {}",
                filename
            )));
        }

        info!("Extracted {} chunks from {}", chunks.len(), filename);
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitize_filename("paper.pdf"), "paper.pdf");
        assert_eq!(sanitize_filename("dir/nested/report.pdf"), "report.pdf");
    }

    #[test]
    fn test_validate_rejects_extension() {
        let ingestor = Ingestor::new(&crate::config::IngestSettings::default());
        let err = ingestor.validate(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, FortellError::InvalidInput(_)));
    }
}

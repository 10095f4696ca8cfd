//! Per-page PDF text extraction via the poppler `pdftotext` tool.
//!
//! The whole document is extracted once; pages arrive separated by form
//! feeds. Pages that come back empty are retried individually with
//! layout-preserving extraction, which recovers text from PDFs whose
//! reading-order stream is broken.

use crate::error::{FortellError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Text of one page, 1-based numbering.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Extract all pages of a PDF.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn extract_pages(path: &Path) -> Result<Vec<PageText>> {
    let raw = run_pdftotext(path, None, false).await?;

    // pdftotext emits a form feed after each page.
    let mut pages: Vec<PageText> = raw
        .split('\u{0c}')
        .enumerate()
        .map(|(i, text)| PageText {
            number: i as u32 + 1,
            text: text.to_string(),
        })
        .collect();

    // Trailing separator produces one empty phantom page.
    if pages.last().is_some_and(|p| p.text.trim().is_empty()) {
        pages.pop();
    }

    for page in &mut pages {
        if page.text.trim().is_empty() {
            debug!("Page {} empty, retrying with layout extraction", page.number);
            let retried = run_pdftotext(path, Some(page.number), true).await?;
            page.text = retried.trim_end_matches('\u{0c}').to_string();
        }
    }

    Ok(pages)
}

/// Invoke pdftotext, optionally restricted to one page and in layout mode.
async fn run_pdftotext(path: &Path, page: Option<u32>, layout: bool) -> Result<String> {
    let mut cmd = Command::new("pdftotext");
    cmd.arg("-enc").arg("UTF-8");
    if let Some(n) = page {
        cmd.arg("-f").arg(n.to_string()).arg("-l").arg(n.to_string());
    }
    if layout {
        cmd.arg("-layout");
    }
    cmd.arg(path).arg("-").stdout(Stdio::piped()).stderr(Stdio::piped());

    let result = cmd.output().await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FortellError::ToolNotFound("pdftotext".into()));
        }
        Err(e) => {
            return Err(FortellError::InvalidDocument(format!(
                "pdftotext execution failed: {e}"
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FortellError::InvalidDocument(format!(
            "pdftotext failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

//! Page text splitting.
//!
//! Splits a page into overlapping chunks around a token-denominated target
//! size, preferring sentence boundaries so retrieval is not biased against
//! information sitting at chunk edges.

/// Rough characters-per-token ratio used to convert token counts to chars.
const CHARS_PER_TOKEN: usize = 4;

/// Splitting parameters.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Target chunk size in tokens.
    pub target_tokens: usize,
    /// Overlap between adjacent chunks in tokens.
    pub overlap_tokens: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target_tokens: 500,
            overlap_tokens: 50,
        }
    }
}

/// One piece of a split page.
#[derive(Debug, Clone)]
pub struct SplitPiece {
    pub text: String,
    pub section_title: Option<String>,
}

/// Split one page's text into overlapping chunks.
///
/// A sentence boundary within ±20% of the target size always wins over a
/// mid-sentence cut; failing that, the cut falls back to the last word
/// boundary, then to a hard cut at the target.
pub fn split_page(text: &str, config: &SplitConfig) -> Vec<SplitPiece> {
    let section_title = heading_of(text);

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let target = config.target_tokens * CHARS_PER_TOKEN;
    let overlap = config.overlap_tokens * CHARS_PER_TOKEN;
    let lower = target - target / 5;
    let upper = target + target / 5;

    let chars: Vec<char> = normalized.chars().collect();
    let n = chars.len();

    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < n {
        let remaining = n - start;
        let end = if remaining <= upper {
            n
        } else {
            let window: String = chars[start..start + upper].iter().collect();
            match sentence_cut(&window, lower) {
                Some(cut) => start + cut,
                None => match word_cut(&window, target) {
                    Some(cut) => start + cut,
                    None => start + target,
                },
            }
        };

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            pieces.push(SplitPiece {
                text: piece,
                section_title: section_title.clone(),
            });
        }

        if end >= n {
            break;
        }
        start = end.saturating_sub(overlap);
    }

    pieces
}

/// Collapse all whitespace runs to single spaces.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Char index just past the last sentence boundary at or beyond `min`, if any.
fn sentence_cut(window: &str, min: usize) -> Option<usize> {
    let chars: Vec<char> = window.chars().collect();
    let mut best = None;
    for i in 0..chars.len().saturating_sub(1) {
        if matches!(chars[i], '.' | '?' | '!') && chars[i + 1] == ' ' && i + 1 >= min {
            best = Some(i + 1);
        }
    }
    best
}

/// Char index of the last space at or before `at`, if past the halfway mark.
fn word_cut(window: &str, at: usize) -> Option<usize> {
    let chars: Vec<char> = window.chars().collect();
    let limit = at.min(chars.len());
    (0..limit).rev().find(|&i| chars[i] == ' ').filter(|&i| i > at / 2)
}

/// A short first line with no terminal punctuation reads as a heading.
fn heading_of(text: &str) -> Option<String> {
    let first_line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let looks_like_heading = first_line.chars().count() <= 80
        && !first_line.ends_with(['.', '?', '!', ':', ';', ',']);
    if looks_like_heading {
        Some(first_line.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(target_tokens: usize, overlap_tokens: usize) -> SplitConfig {
        SplitConfig {
            target_tokens,
            overlap_tokens,
        }
    }

    #[test]
    fn test_short_page_single_chunk() {
        let pieces = split_page("A short page of text.", &config(500, 50));
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].text, "A short page of text.");
    }

    #[test]
    fn test_empty_page_no_chunks() {
        assert!(split_page("   \n\n  ", &config(500, 50)).is_empty());
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        // Sentences of ~40 chars; target 80 chars (20 tokens) puts a
        // boundary inside the +/-20% window every time.
        let sentence = "The quick brown fox jumps over a dog. ";
        let text = sentence.repeat(10);
        let pieces = split_page(&text, &config(20, 2));

        assert!(pieces.len() > 1);
        for piece in &pieces[..pieces.len() - 1] {
            assert!(
                piece.text.ends_with('.'),
                "chunk should end at a sentence boundary: {:?}",
                piece.text
            );
        }
    }

    #[test]
    fn test_overlap_repeats_tail_text() {
        let sentence = "Alpha beta gamma delta epsilon zeta eta theta. ";
        let text = sentence.repeat(12);
        let pieces = split_page(&text, &config(20, 5));
        assert!(pieces.len() > 1);

        // The head of each following chunk re-covers the tail of the previous.
        let first_tail: String = pieces[0]
            .text
            .chars()
            .rev()
            .take(10)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        assert!(pieces[1].text.contains(first_tail.trim()));
    }

    #[test]
    fn test_no_boundary_falls_back_to_word_cut() {
        // One unbroken run of words, no sentence punctuation at all.
        let text = "word ".repeat(200);
        let pieces = split_page(&text, &config(20, 2));
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(!piece.text.starts_with(' '));
            // The cut lands on a word boundary, so no chunk ends mid-word.
            assert!(piece.text.ends_with("word"));
        }
    }

    #[test]
    fn test_chunk_size_bounded() {
        let text = "x".repeat(4000);
        let cfg = config(100, 10);
        let upper = cfg.target_tokens * 4 + cfg.target_tokens * 4 / 5;
        let pieces = split_page(&text, &cfg);
        for piece in &pieces {
            assert!(piece.text.chars().count() <= upper);
        }
    }

    #[test]
    fn test_heading_detected() {
        let text = "Results and Discussion\nThe experiment produced three outcomes.";
        let pieces = split_page(text, &config(500, 50));
        assert_eq!(
            pieces[0].section_title.as_deref(),
            Some("Results and Discussion")
        );
    }

    #[test]
    fn test_prose_first_line_is_not_heading() {
        let text = "The experiment produced three outcomes in total.\nMore text follows here.";
        let pieces = split_page(text, &config(500, 50));
        assert!(pieces[0].section_title.is_none());
    }
}

//! In-memory vector index.
//!
//! Append-only parallel storage of chunks and vectors; search is a linear
//! scan ranked by inner product. Adequate for tens of thousands of entries.

use super::{IndexedDocument, PageKey, SearchHit, SearchParams, VectorIndex};
use crate::error::{FortellError, Result};
use crate::ingest::Chunk;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory vector index with a fixed dimension.
pub struct MemoryVectorIndex {
    dimension: usize,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorIndex {
    /// Create an index. All added vectors must match `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(FortellError::VectorIndex(format!(
                "Chunk/vector count mismatch: {} vs {}",
                chunks.len(),
                vectors.len()
            )));
        }
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(FortellError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }
        }

        let mut entries = self.entries.write().unwrap();
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            entries.push(Entry {
                chunk: chunk.clone(),
                vector: vector.clone(),
            });
        }
        Ok(chunks.len())
    }

    async fn search(&self, query: &[f32], params: &SearchParams) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(FortellError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let entries = self.entries.read().unwrap();

        // Score everything except excluded pages; keep the insertion index
        // so equal scores rank deterministically.
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| match &params.exclude {
                Some(page) => {
                    !(entry.chunk.filename == page.filename
                        && entry.chunk.page_number == page.page_number)
                }
                None => true,
            })
            .map(|(idx, entry)| (idx, inner_product(query, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(params.effective_fetch_k());

        // Page-level dedup: the candidate list is score-ordered, so the
        // first hit per page is its best.
        let mut seen: HashSet<PageKey> = HashSet::new();
        let mut hits = Vec::new();
        for (idx, score) in scored {
            if let Some(min) = params.min_score {
                if score < min {
                    continue;
                }
            }
            let chunk = &entries[idx].chunk;
            let key = PageKey {
                filename: chunk.filename.clone(),
                page_number: chunk.page_number,
            };
            if !seen.insert(key) {
                continue;
            }
            hits.push(SearchHit {
                chunk: chunk.clone(),
                score,
                distance: 1.0 - score,
            });
            if hits.len() >= params.k {
                break;
            }
        }

        Ok(hits)
    }

    async fn contains_file(&self, filename: &str) -> Result<bool> {
        let entries = self.entries.read().unwrap();
        Ok(entries.iter().any(|e| e.chunk.filename == filename))
    }

    async fn page_text(&self, page: &PageKey) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap();
        let mut sections: Vec<(u32, &str)> = entries
            .iter()
            .filter(|e| {
                e.chunk.filename == page.filename && e.chunk.page_number == page.page_number
            })
            .map(|e| (e.chunk.section_index, e.chunk.text.as_str()))
            .collect();
        if sections.is_empty() {
            return Ok(None);
        }
        sections.sort_by_key(|(idx, _)| *idx);
        let joined = sections
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(joined))
    }

    async fn sample_chunks(&self, filename: &str, limit: usize) -> Result<Vec<Chunk>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.chunk.filename == filename)
            .take(limit)
            .map(|e| e.chunk.clone())
            .collect())
    }

    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        let entries = self.entries.read().unwrap();

        let mut docs: HashMap<String, (HashSet<u32>, u32)> = HashMap::new();
        for entry in entries.iter() {
            let slot = docs
                .entry(entry.chunk.filename.clone())
                .or_insert_with(|| (HashSet::new(), 0));
            slot.0.insert(entry.chunk.page_number);
            slot.1 += 1;
        }

        let mut result: Vec<IndexedDocument> = docs
            .into_iter()
            .map(|(filename, (pages, chunks))| IndexedDocument {
                filename,
                page_count: pages.len() as u32,
                chunk_count: chunks,
            })
            .collect();
        result.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(result)
    }

    async fn entry_count(&self) -> Result<usize> {
        let entries = self.entries.read().unwrap();
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(filename: &str, page: u32, section: u32, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            filename: filename.to_string(),
            page_number: page,
            section_index: section,
            section_title: None,
        }
    }

    fn unit(x: f32, y: f32, z: f32) -> Vec<f32> {
        let norm = (x * x + y * y + z * z).sqrt();
        vec![x / norm, y / norm, z / norm]
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[chunk("a.pdf", 1, 0, "hello"), chunk("a.pdf", 2, 0, "goodbye")],
                &[unit(1.0, 0.0, 0.0), unit(0.0, 1.0, 0.0)],
            )
            .await
            .unwrap();

        let hits = index
            .search(&unit(1.0, 0.0, 0.0), &SearchParams::top_k(10))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].chunk.text, "hello");
        assert!((hits[0].distance - (1.0 - hits[0].score)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = MemoryVectorIndex::new(3);
        let err = index
            .add(&[chunk("a.pdf", 1, 0, "x")], &[vec![1.0, 0.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, FortellError::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[tokio::test]
    async fn test_page_dedup_keeps_best_per_page() {
        let index = MemoryVectorIndex::new(3);
        // Six chunks on one page dominating the scores, plus lower-scoring
        // chunks spread over other pages.
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        for section in 0..6 {
            chunks.push(chunk("dense.pdf", 1, section, "dense"));
            vectors.push(unit(1.0, 0.01 * section as f32, 0.0));
        }
        for page in 2..=10 {
            chunks.push(chunk("other.pdf", page, 0, "sparse"));
            vectors.push(unit(0.3, 1.0, 0.1 * page as f32));
        }
        index.add(&chunks, &vectors).await.unwrap();

        let params = SearchParams {
            k: 5,
            fetch_k: Some(15),
            ..Default::default()
        };
        let hits = index.search(&unit(1.0, 0.0, 0.0), &params).await.unwrap();

        assert_eq!(hits.len(), 5);
        let mut pages = std::collections::HashSet::new();
        for hit in &hits {
            assert!(pages.insert((hit.chunk.filename.clone(), hit.chunk.page_number)));
        }
        // The dense page appears exactly once, via its best chunk.
        assert_eq!(hits[0].chunk.filename, "dense.pdf");
    }

    #[tokio::test]
    async fn test_exclude_page_removed_before_ranking() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[chunk("a.pdf", 1, 0, "self"), chunk("b.pdf", 4, 0, "other")],
                &[unit(1.0, 0.0, 0.0), unit(0.9, 0.1, 0.0)],
            )
            .await
            .unwrap();

        let params = SearchParams {
            k: 5,
            exclude: Some(PageKey {
                filename: "a.pdf".to_string(),
                page_number: 1,
            }),
            ..Default::default()
        };
        let hits = index.search(&unit(1.0, 0.0, 0.0), &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.filename, "b.pdf");
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[chunk("a.pdf", 1, 0, "near"), chunk("a.pdf", 2, 0, "far")],
                &[unit(1.0, 0.0, 0.0), unit(0.0, 0.0, 1.0)],
            )
            .await
            .unwrap();

        let params = SearchParams {
            k: 5,
            min_score: Some(0.5),
            ..Default::default()
        };
        let hits = index.search(&unit(1.0, 0.0, 0.0), &params).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "near");
    }

    #[tokio::test]
    async fn test_tie_break_by_insertion_order() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[chunk("a.pdf", 1, 0, "first"), chunk("b.pdf", 1, 0, "second")],
                &[unit(1.0, 0.0, 0.0), unit(1.0, 0.0, 0.0)],
            )
            .await
            .unwrap();

        let hits = index
            .search(&unit(1.0, 0.0, 0.0), &SearchParams::top_k(2))
            .await
            .unwrap();
        assert_eq!(hits[0].chunk.text, "first");
        assert_eq!(hits[1].chunk.text, "second");
    }

    #[tokio::test]
    async fn test_page_text_in_section_order() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[
                    chunk("a.pdf", 1, 1, "second part"),
                    chunk("a.pdf", 1, 0, "first part"),
                ],
                &[unit(1.0, 0.0, 0.0), unit(0.0, 1.0, 0.0)],
            )
            .await
            .unwrap();

        let text = index
            .page_text(&PageKey {
                filename: "a.pdf".to_string(),
                page_number: 1,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "first part\n\nsecond part");
    }

    #[tokio::test]
    async fn test_list_documents() {
        let index = MemoryVectorIndex::new(3);
        index
            .add(
                &[
                    chunk("a.pdf", 1, 0, "x"),
                    chunk("a.pdf", 2, 0, "y"),
                    chunk("b.pdf", 1, 0, "z"),
                ],
                &[unit(1.0, 0.0, 0.0), unit(0.0, 1.0, 0.0), unit(0.0, 0.0, 1.0)],
            )
            .await
            .unwrap();

        let docs = index.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "a.pdf");
        assert_eq!(docs[0].page_count, 2);
        assert_eq!(docs[0].chunk_count, 2);
    }
}

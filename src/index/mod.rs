//! Vector index abstraction for Fortell.
//!
//! Provides a trait-based interface so the in-memory index can be swapped
//! for another backend once corpora outgrow linear scans.

mod memory;

pub use memory::MemoryVectorIndex;

use crate::error::Result;
use crate::ingest::Chunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity of one page of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    pub filename: String,
    pub page_number: u32,
}

/// Parameters for a similarity search.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Maximum results returned.
    pub k: usize,
    /// Candidate pool ranked before page-level dedup. Defaults to 3 * k.
    pub fetch_k: Option<usize>,
    /// Results scoring below this are dropped.
    pub min_score: Option<f32>,
    /// Entries on this page are removed before ranking.
    pub exclude: Option<PageKey>,
}

impl SearchParams {
    pub fn top_k(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Effective candidate pool size.
    pub fn effective_fetch_k(&self) -> usize {
        self.fetch_k.unwrap_or(self.k * 3).max(self.k)
    }
}

/// A search hit with its inner-product score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Inner-product score in [-1, 1]; cosine for unit vectors.
    pub score: f32,
    /// Derived distance, 1 - score.
    pub distance: f32,
}

/// Summary information about an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub filename: String,
    pub page_count: u32,
    pub chunk_count: u32,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append chunks with their vectors. Fails with `DimensionMismatch`
    /// when a vector's dimension differs from the index's fixed dimension.
    async fn add(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<usize>;

    /// Top-k similarity search with page-level deduplication.
    async fn search(&self, query: &[f32], params: &SearchParams) -> Result<Vec<SearchHit>>;

    /// Whether any chunks of this document are indexed.
    async fn contains_file(&self, filename: &str) -> Result<bool>;

    /// Concatenated text of one page's chunks, in section order.
    async fn page_text(&self, page: &PageKey) -> Result<Option<String>>;

    /// Up to `limit` chunks per document, in insertion order.
    async fn sample_chunks(&self, filename: &str, limit: usize) -> Result<Vec<Chunk>>;

    /// List all indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Total number of indexed entries.
    async fn entry_count(&self) -> Result<usize>;
}

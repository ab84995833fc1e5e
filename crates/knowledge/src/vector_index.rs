//! Vector index abstraction for knowledge chunks.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval, plus
//! the cosine similarity used by every backend.

use crate::types::KnowledgeChunk;
use scholar_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Upserting chunks with embeddings
/// - Searching for similar vectors (top-k)
/// - Collecting statistics
/// - Resetting/clearing the index
pub trait VectorIndex: Send + Sync {
    /// Insert or update a chunk with its embedding in the index.
    fn upsert_chunk(&mut self, chunk: &KnowledgeChunk) -> AppResult<()>;

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks ordered by descending similarity score.
    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>>;

    /// Get statistics about the index.
    ///
    /// Returns (sources_count, chunks_count).
    fn stats(&self) -> AppResult<(u32, u32)>;

    /// Reset the index, removing all chunks and sources.
    fn reset(&mut self) -> AppResult<()>;
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

//! In-memory vector index for request-scoped stores.
//!
//! The research pipeline builds a throwaway index over the papers of a single
//! run; nothing outlives the request, so there is no reason to touch disk.

use crate::types::KnowledgeChunk;
use crate::vector_index::{cosine_similarity, VectorIndex};
use scholar_core::{AppError, AppResult};
use std::collections::HashSet;

/// Vec-backed vector index.
#[derive(Default)]
pub struct MemoryIndex {
    chunks: Vec<KnowledgeChunk>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently held.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert_chunk(&mut self, chunk: &KnowledgeChunk) -> AppResult<()> {
        if chunk.embedding.is_none() {
            return Err(AppError::Knowledge("Chunk missing embedding".to_string()));
        }

        // Replace on matching id, append otherwise
        if let Some(existing) = self.chunks.iter_mut().find(|c| c.id == chunk.id) {
            *existing = chunk.clone();
        } else {
            self.chunks.push(chunk.clone());
        }

        Ok(())
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
        let mut results: Vec<(KnowledgeChunk, f32)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score = chunk
                    .embedding
                    .as_ref()
                    .map(|e| cosine_similarity(query_embedding, e))
                    .unwrap_or(0.0);
                (chunk.clone(), score)
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    fn stats(&self) -> AppResult<(u32, u32)> {
        let sources: HashSet<&str> = self.chunks.iter().map(|c| c.source_id.as_str()).collect();
        Ok((sources.len() as u32, self.chunks.len() as u32))
    }

    fn reset(&mut self) -> AppResult<()> {
        self.chunks.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: source.to_string(),
            position: 0,
            text: format!("text {}", id),
            embedding: Some(embedding),
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = MemoryIndex::new();
        index.upsert_chunk(&chunk("a", "s1", vec![1.0, 0.0])).unwrap();
        index.upsert_chunk(&chunk("b", "s1", vec![0.0, 1.0])).unwrap();
        index.upsert_chunk(&chunk("c", "s2", vec![0.7, 0.7])).unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].0.id, "a");
        assert_eq!(results[1].0.id, "c");
        assert_eq!(results[2].0.id, "b");
    }

    #[test]
    fn test_top_k_truncation() {
        let mut index = MemoryIndex::new();
        for i in 0..10 {
            index
                .upsert_chunk(&chunk(&format!("c{}", i), "s", vec![1.0, i as f32]))
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut index = MemoryIndex::new();
        index.upsert_chunk(&chunk("a", "s1", vec![1.0])).unwrap();

        let mut updated = chunk("a", "s1", vec![0.5]);
        updated.text = "updated".to_string();
        index.upsert_chunk(&updated).unwrap();

        assert_eq!(index.len(), 1);
        let results = index.search(&[1.0], 1).unwrap();
        assert_eq!(results[0].0.text, "updated");
    }

    #[test]
    fn test_stats_counts_distinct_sources() {
        let mut index = MemoryIndex::new();
        index.upsert_chunk(&chunk("a", "s1", vec![1.0])).unwrap();
        index.upsert_chunk(&chunk("b", "s1", vec![1.0])).unwrap();
        index.upsert_chunk(&chunk("c", "s2", vec![1.0])).unwrap();

        assert_eq!(index.stats().unwrap(), (2, 3));
    }

    #[test]
    fn test_reset() {
        let mut index = MemoryIndex::new();
        index.upsert_chunk(&chunk("a", "s1", vec![1.0])).unwrap();
        index.reset().unwrap();
        assert!(index.is_empty());
    }
}

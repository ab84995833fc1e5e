//! Trigram embedding provider using character trigram hashing.

use crate::embeddings::provider::EmbeddingProvider;
use scholar_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Stop words excluded before hashing; they carry no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings from character trigrams and word
/// frequencies. Not semantically accurate like neural embedding models, but
/// consistent and content-dependent, which is what tests and request-scoped
/// pipeline runs need.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let lower = text.to_lowercase();

        let words: Vec<&str> = lower
            .split_whitespace()
            .filter(|w| !stop_words.contains(w) && w.len() > 2)
            .collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in &words {
            *word_freq.entry(*word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            // Each character trigram contributes to one dimension
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let mut hash = 0u64;
                for &c in window {
                    hash = hash.wrapping_mul(37).wrapping_add(c as u64);
                }
                let dim_idx = (hash as usize) % self.dimensions;
                // sqrt scale keeps frequent words from dominating
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Whole-word signal on top of the trigrams
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += *freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_embed_dimensions_and_norm() {
        let provider = TrigramProvider::new(128);
        let embedding = provider.embed("retrieval augmented generation").await.unwrap();

        assert_eq!(embedding.len(), 128);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_embed_deterministic() {
        let provider = TrigramProvider::new(64);
        let a = provider.embed("identical input text").await.unwrap();
        let b = provider.embed("identical input text").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = TrigramProvider::new(64);
        let a = provider.embed("vector databases and indexing").await.unwrap();
        let b = provider.embed("quantum chromodynamics lattice").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_stop_words_only_gives_zero_vector() {
        let provider = TrigramProvider::new(64);
        let embedding = provider.embed("the and of in").await.unwrap();
        assert!(embedding.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = TrigramProvider::new(64);
        let batch = provider
            .embed_batch(&["alpha beta".to_string(), "gamma delta".to_string()])
            .await
            .unwrap();
        let single = provider.embed("alpha beta").await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], single);
    }
}

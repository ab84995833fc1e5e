//! Embedding provider trait and factory.

use crate::types::KnowledgeBaseConfig;
use scholar_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from a knowledge base configuration.
pub fn create_provider(
    config: &KnowledgeBaseConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "trigram" => {
            let provider = super::providers::trigram::TrigramProvider::new(
                config.embedding_dim as usize,
            );
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = super::providers::ollama::OllamaEmbeddings::new(
                config.endpoint.as_deref().unwrap_or("http://localhost:11434"),
                &config.model,
                config.embedding_dim as usize,
            );
            Ok(Arc::new(provider))
        }

        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Knowledge(
                    "OpenAI embedding provider requires API key".to_string(),
                )
            })?;
            let provider = super::providers::openai::OpenAiEmbeddings::new(
                api_key,
                config.endpoint.as_deref(),
                &config.model,
                config.embedding_dim as usize,
            );
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Knowledge(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> KnowledgeBaseConfig {
        KnowledgeBaseConfig {
            name: "test".to_string(),
            provider: provider.to_string(),
            model: "test-model".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider(&config("trigram"), None).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_ollama_provider() {
        let provider = create_provider(&config("ollama"), None).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_openai_requires_key() {
        assert!(create_provider(&config("openai"), None).is_err());
        assert!(create_provider(&config("openai"), Some("sk-test")).is_ok());
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&config("unknown"), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&config("trigram"), None).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}

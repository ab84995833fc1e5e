//! OpenAI embedding provider.
//!
//! Calls `/v1/embeddings` with true batch requests; retries transient
//! failures with exponential backoff.

use crate::embeddings::provider::EmbeddingProvider;
use scholar_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Maximum retry attempts for failed requests
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 200;

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embedding provider.
#[derive(Debug)]
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddings {
    /// Create a provider for the given key, endpoint, model, and dimensions.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: Option<&str>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: endpoint.unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }

    async fn embed_batch_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < MAX_RETRIES {
            match self.embed_batch_once(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                        tracing::warn!(
                            "Embedding batch failed (attempt {}/{}), retrying in {}ms",
                            attempt,
                            MAX_RETRIES,
                            backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Llm("Unknown embedding error".to_string())))
    }

    async fn embed_batch_once(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let response_body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        if response_body.data.len() != texts.len() {
            return Err(AppError::Llm(format!(
                "Embedding count mismatch: got {}, expected {}",
                response_body.data.len(),
                texts.len()
            )));
        }

        // Restore input order by index
        let mut data = response_body.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::Llm("Cannot embed empty text".to_string()));
        }

        tracing::debug!("Embedding batch of {} texts via OpenAI", texts.len());

        self.embed_batch_with_retries(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata() {
        let provider =
            OpenAiEmbeddings::new("sk-test", None, "text-embedding-3-small", 1536);
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "text-embedding-3-small");
        assert_eq!(provider.dimensions(), 1536);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_custom_endpoint() {
        let provider = OpenAiEmbeddings::new(
            "sk-test",
            Some("https://gateway.local"),
            "text-embedding-3-small",
            1536,
        );
        assert_eq!(provider.base_url, "https://gateway.local");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let provider =
            OpenAiEmbeddings::new("sk-test", None, "text-embedding-3-small", 1536);
        let result = provider.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}

//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and secret
//! injection.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use scholar_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "claude", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
///
/// # Returns
/// A reference-counted trait object implementing `LlmClient`
///
/// # Errors
/// Returns error if the provider is unknown or a required API key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            let client = match endpoint {
                Some(url) => OpenAiClient::with_base_url(api_key, url),
                None => OpenAiClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
        ProviderType::Claude => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Claude provider requires API key".to_string())
            })?;
            let client = match endpoint {
                Some(url) => ClaudeClient::with_base_url(api_key, url),
                None => ClaudeClient::new(api_key),
            };
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(err) => assert!(err.to_string().contains("OpenAI provider requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_claude_requires_api_key() {
        match create_client("claude", None, None) {
            Err(err) => assert!(err.to_string().contains("Claude provider requires API key")),
            Ok(_) => panic!("Expected error for Claude without API key"),
        }
    }

    #[test]
    fn test_create_openai_with_key() {
        let client = create_client("openai", None, Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_anthropic_alias() {
        let client = create_client("anthropic", None, Some("key")).unwrap();
        assert_eq!(client.provider_name(), "claude");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}

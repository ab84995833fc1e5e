//! Anthropic Claude messages provider.
//!
//! Targets the `/v1/messages` endpoint. The messages API requires an explicit
//! `max_tokens`; when the request does not set one we fall back to a
//! conservative default.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::retry::{CallError, RetryPolicy};
use futures::StreamExt;
use scholar_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// max_tokens is mandatory on the messages API.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<UserMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct UserMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Streaming event payload (`data: {...}` lines).
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

/// Claude LLM client.
pub struct ClaudeClient {
    base_url: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ClaudeClient {
    /// Create a client against the public Anthropic endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn to_messages_request(&self, request: &LlmRequest) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![UserMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            system: request.system.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            stream: request.stream,
        }
    }

    async fn try_complete(
        &self,
        messages_request: &MessagesRequest,
    ) -> Result<MessagesResponse, CallError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(messages_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CallError::from_status(
                status,
                AppError::Llm(format!("Claude API error ({}): {}", status, error_text)),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| CallError::Fatal(AppError::Llm(format!("Failed to parse Claude response: {}", e))))
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    fn provider_name(&self) -> &str {
        "claude"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Claude");

        let mut messages_request = self.to_messages_request(request);
        messages_request.stream = false;

        let messages_response = self
            .retry
            .run("claude.complete", || self.try_complete(&messages_request))
            .await?;

        let content = messages_response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(AppError::Llm(
                "Claude response contained no text blocks".to_string(),
            ));
        }

        let usage = messages_response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: messages_response.model,
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to Claude");

        let mut messages_request = self.to_messages_request(request);
        messages_request.stream = true;

        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&messages_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send streaming request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Claude API error ({}): {}",
                status, error_text
            )));
        }

        let model = request.model.clone();

        // Server-sent events; text arrives in content_block_delta events and
        // the run ends with a message_stop event.
        let stream = response.bytes_stream().map(move |result| {
            let bytes = result.map_err(|e| AppError::Llm(format!("Stream error: {}", e)))?;

            let text = String::from_utf8_lossy(&bytes);
            let chunks: Vec<AppResult<LlmStreamChunk>> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .filter(|payload| !payload.trim().is_empty())
                .filter_map(|payload| {
                    let event: StreamEvent = match serde_json::from_str(payload) {
                        Ok(event) => event,
                        Err(e) => {
                            return Some(Err(AppError::Llm(format!(
                                "Failed to parse stream event: {}",
                                e
                            ))))
                        }
                    };

                    match event.kind.as_str() {
                        "content_block_delta" => {
                            let content = event
                                .delta
                                .and_then(|d| d.text)
                                .unwrap_or_default();
                            Some(Ok(LlmStreamChunk {
                                content,
                                model: model.clone(),
                                done: false,
                                usage: None,
                            }))
                        }
                        "message_delta" | "message_stop" => Some(Ok(LlmStreamChunk {
                            content: String::new(),
                            model: model.clone(),
                            done: event.kind == "message_stop",
                            usage: event
                                .usage
                                .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens)),
                        })),
                        // ping, message_start, content_block_start/stop
                        _ => None,
                    }
                })
                .collect();

            Ok(futures::stream::iter(chunks))
        });

        Ok(Box::pin(stream.flat_map(|result| match result {
            Ok(chunks) => chunks,
            Err(e) => futures::stream::iter(vec![Err(e)]),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_tokens_default() {
        let client = ClaudeClient::new("key");
        let request = LlmRequest::new("hi", "claude-sonnet-4-20250514");

        let messages = client.to_messages_request(&request);
        assert_eq!(messages.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_explicit_max_tokens() {
        let client = ClaudeClient::new("key");
        let request = LlmRequest::new("hi", "claude-sonnet-4-20250514").with_max_tokens(4096);

        let messages = client.to_messages_request(&request);
        assert_eq!(messages.max_tokens, 4096);
    }

    #[test]
    fn test_system_prompt_is_top_level() {
        let client = ClaudeClient::new("key");
        let request = LlmRequest::new("hi", "claude-sonnet-4-20250514").with_system("be brief");

        let messages = client.to_messages_request(&request);
        assert_eq!(messages.system.as_deref(), Some("be brief"));
        assert_eq!(messages.messages.len(), 1);
        assert_eq!(messages.messages[0].role, "user");
    }
}

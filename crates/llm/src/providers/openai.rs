//! OpenAI chat completions provider.
//!
//! Targets the `/v1/chat/completions` endpoint. The single prompt/system pair
//! from `LlmRequest` maps onto the messages array. Also works with
//! OpenAI-compatible gateways via a custom base URL.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use crate::retry::{CallError, RetryPolicy};
use futures::StreamExt;
use scholar_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Streaming delta frame (`data: {...}` lines).
#[derive(Debug, Deserialize)]
struct ChatStreamFrame {
    model: Option<String>,
    choices: Vec<ChatStreamChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI LLM client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom (OpenAI-compatible) endpoint.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stream: request.stream,
        }
    }

    async fn try_complete(&self, chat_request: &ChatRequest) -> Result<ChatResponse, CallError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(chat_request)
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
                AppError::Llm(format!("OpenAI API error ({}): {}", status, error_text)),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| CallError::Fatal(AppError::Llm(format!("Failed to parse OpenAI response: {}", e))))
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to OpenAI");

        let mut chat_request = self.to_chat_request(request);
        chat_request.stream = false;

        let chat_response = self
            .retry
            .run("openai.complete", || self.try_complete(&chat_request))
            .await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = chat_response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: chat_response.model,
            usage,
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        tracing::info!("Starting streaming request to OpenAI");

        let mut chat_request = self.to_chat_request(request);
        chat_request.stream = true;

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
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
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let fallback_model = request.model.clone();

        // Server-sent events: each line is `data: <json>` or `data: [DONE]`
        let stream = response.bytes_stream().map(move |result| {
            let bytes = result.map_err(|e| AppError::Llm(format!("Stream error: {}", e)))?;

            let text = String::from_utf8_lossy(&bytes);
            let chunks: Vec<AppResult<LlmStreamChunk>> = text
                .lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .filter(|payload| !payload.trim().is_empty())
                .filter_map(|payload| {
                    if payload.trim() == "[DONE]" {
                        return Some(Ok(LlmStreamChunk {
                            content: String::new(),
                            model: fallback_model.clone(),
                            done: true,
                            usage: None,
                        }));
                    }

                    match serde_json::from_str::<ChatStreamFrame>(payload) {
                        Ok(frame) => {
                            let model =
                                frame.model.unwrap_or_else(|| fallback_model.clone());
                            let choice = frame.choices.into_iter().next()?;
                            let done = choice.finish_reason.is_some();
                            Some(Ok(LlmStreamChunk {
                                content: choice.delta.content.unwrap_or_default(),
                                model,
                                done,
                                usage: frame
                                    .usage
                                    .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens)),
                            }))
                        }
                        Err(e) => Some(Err(AppError::Llm(format!(
                            "Failed to parse stream frame: {}",
                            e
                        )))),
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
    fn test_message_mapping() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("question", "gpt-4o").with_system("rules");

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[0].content, "rules");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.messages[1].content, "question");
    }

    #[test]
    fn test_no_system_message() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("question", "gpt-4o");

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "user");
    }

    #[test]
    fn test_custom_base_url() {
        let client = OpenAiClient::with_base_url("sk-test", "https://gateway.local");
        assert_eq!(client.base_url, "https://gateway.local");
        assert_eq!(client.provider_name(), "openai");
    }
}

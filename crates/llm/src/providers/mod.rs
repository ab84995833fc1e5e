//! LLM provider implementations.

pub mod claude;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

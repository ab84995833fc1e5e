//! Embedding generation for knowledge bases.
//!
//! Provides provider-agnostic embedding generation. The trigram provider is
//! deterministic and offline; ollama and openai call their respective APIs.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

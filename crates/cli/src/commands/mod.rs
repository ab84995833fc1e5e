//! Command handlers for the Scholar CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod knowledge;
pub mod research;
pub mod serve;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use knowledge::KnowledgeCommand;
pub use research::ResearchCommand;
pub use serve::ServeCommand;
pub use stats::StatsCommand;

use scholar_core::{config::AppConfig, AppResult};
use scholar_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Create the configured LLM client, resolving endpoint and API key.
pub(crate) fn make_llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let endpoint = config.resolve_endpoint(&config.provider)?;
    let api_key = config.resolve_api_key(&config.provider)?;

    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
}

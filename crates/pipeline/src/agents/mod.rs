//! Workflow stage agents.
//!
//! Each stage is a thin struct owning its LLM settings; the shared
//! [`StageLlm`] handles prompt loading, rendering, and the completion call.

pub mod critic;
pub mod planner;
pub mod reflector;
pub mod searcher;
pub mod summarizer;
pub mod synthesizer;

pub use critic::CriticAgent;
pub use planner::PlannerAgent;
pub use reflector::ReflectorAgent;
pub use searcher::SearcherAgent;
pub use summarizer::SummarizerAgent;
pub use synthesizer::SynthesizerAgent;

use scholar_core::AppResult;
use scholar_llm::{LlmClient, LlmRequest};
use scholar_prompt::{build_prompt, load_prompt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// LLM access shared by all prompt-driven stages.
#[derive(Clone)]
pub struct StageLlm {
    client: Arc<dyn LlmClient>,
    model: String,
    workspace: PathBuf,
}

impl StageLlm {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, workspace: &Path) -> Self {
        Self {
            client,
            model: model.into(),
            workspace: workspace.to_path_buf(),
        }
    }

    /// Render the named prompt with variables and run a completion.
    pub async fn run_prompt(
        &self,
        prompt_id: &str,
        temperature: f32,
        variables: HashMap<String, String>,
    ) -> AppResult<String> {
        let definition = load_prompt(&self.workspace, prompt_id)?;
        let built = build_prompt(&definition, variables)?;

        let mut request =
            LlmRequest::new(built.user, &self.model).with_temperature(temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        Ok(response.content)
    }
}

/// Build a `HashMap` of template variables from string pairs.
pub(crate) fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Strip markdown code fences from an LLM JSON response.
///
/// Models frequently wrap JSON in ```json ... ``` fences even when told not
/// to; the parser must see the bare object.
pub(crate) fn clean_json_block(content: &str) -> &str {
    let mut cleaned = content.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }

    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    cleaned.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json_block_fenced() {
        let content = "```json\n{\"a\": 1}\n```";
        assert_eq!(clean_json_block(content), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_json_block_bare_fence() {
        let content = "```\n{\"a\": 1}\n```";
        assert_eq!(clean_json_block(content), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_json_block_plain() {
        let content = "{\"a\": 1}";
        assert_eq!(clean_json_block(content), "{\"a\": 1}");
    }
}

//! Synthesizer stage: merges paper summaries into one narrative.

use super::{vars, StageLlm};
use crate::state::WorkflowState;
use scholar_core::AppResult;

/// Fixed synthesis text when search produced nothing to work with.
pub const EMPTY_SYNTHESIS: &str = "No papers found for synthesis.";

pub struct SynthesizerAgent {
    llm: StageLlm,
    temperature: f32,
}

impl SynthesizerAgent {
    pub fn new(llm: StageLlm, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Create a synthesis from the accumulated summaries.
    pub async fn synthesize(&self, state: &mut WorkflowState) -> AppResult<()> {
        if state.summaries.is_empty() {
            tracing::info!("Synthesizer: nothing to synthesize");
            state.synthesis = EMPTY_SYNTHESIS.to_string();
            return Ok(());
        }

        tracing::info!("Synthesizer: merging {} summaries", state.summaries.len());

        let summaries_text = format_summaries(state);

        let synthesis = self
            .llm
            .run_prompt(
                "agent.synthesize",
                self.temperature,
                vars(&[
                    ("query", &state.query),
                    ("summaries", &summaries_text),
                    ("plan", &state.search_plan),
                ]),
            )
            .await?;

        state.record("synthesizer", "Created comprehensive synthesis");
        state.synthesis = synthesis;

        Ok(())
    }
}

/// Render numbered summaries for the synthesis prompt.
pub(crate) fn format_summaries(state: &WorkflowState) -> String {
    state
        .summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Paper {}: {}\n{}", i + 1, s.paper_title, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PaperSummary;

    #[test]
    fn test_format_summaries_numbering() {
        let mut state = WorkflowState::new("q", 2);
        state.summaries = vec![
            PaperSummary {
                paper_title: "First".to_string(),
                authors: vec![],
                url: String::new(),
                summary: "alpha".to_string(),
            },
            PaperSummary {
                paper_title: "Second".to_string(),
                authors: vec![],
                url: String::new(),
                summary: "beta".to_string(),
            },
        ];

        let text = format_summaries(&state);
        assert!(text.contains("Paper 1: First\nalpha"));
        assert!(text.contains("Paper 2: Second\nbeta"));
    }
}

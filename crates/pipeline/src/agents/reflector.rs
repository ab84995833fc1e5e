//! Reflector stage: rewrites the synthesis to address the critique.

use super::{vars, StageLlm};
use crate::agents::synthesizer::format_summaries;
use crate::state::WorkflowState;
use scholar_core::AppResult;

pub struct ReflectorAgent {
    llm: StageLlm,
    temperature: f32,
}

impl ReflectorAgent {
    pub fn new(llm: StageLlm, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Produce an improved synthesis and advance the iteration counter.
    pub async fn reflect(&self, state: &mut WorkflowState) -> AppResult<()> {
        tracing::info!("Reflector: improving synthesis (iteration {})", state.iteration + 1);

        let summaries_text = format_summaries(state);

        let improved = self
            .llm
            .run_prompt(
                "agent.reflect",
                self.temperature,
                vars(&[
                    ("synthesis", &state.synthesis),
                    ("critique", &state.critique_raw),
                    ("summaries", &summaries_text),
                ]),
            )
            .await?;

        state.synthesis = improved;
        state.iteration += 1;

        state.record(
            "reflector",
            format!("Improved synthesis (Iteration {})", state.iteration),
        );

        Ok(())
    }
}

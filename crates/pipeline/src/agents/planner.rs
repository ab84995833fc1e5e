//! Planner stage: expands the query into a search and analysis plan.

use super::{vars, StageLlm};
use crate::state::WorkflowState;
use scholar_core::AppResult;

pub struct PlannerAgent {
    llm: StageLlm,
    temperature: f32,
}

impl PlannerAgent {
    pub fn new(llm: StageLlm, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Generate the research plan and record it in the state.
    pub async fn plan(&self, state: &mut WorkflowState) -> AppResult<()> {
        tracing::info!("Planner: creating research plan");

        let plan = self
            .llm
            .run_prompt(
                "agent.plan",
                self.temperature,
                vars(&[("query", &state.query)]),
            )
            .await?;

        state.record("planner", format!("Created research plan\n{}", plan));
        state.search_plan = plan;

        Ok(())
    }
}

//! The six-stage research synthesis workflow.
//!
//! Planner → Searcher → Summarizer → Synthesizer → Critic, with one
//! conditional back-edge Critic → Reflector → Critic bounded by the iteration
//! counter and the quality threshold.

use crate::agents::{
    CriticAgent, PlannerAgent, ReflectorAgent, SearcherAgent, StageLlm, SummarizerAgent,
    SynthesizerAgent,
};
use crate::arxiv::ArxivClient;
use crate::state::{Paper, WorkflowState};
use scholar_core::config::PipelineConfig;
use scholar_core::AppResult;
use scholar_llm::LlmClient;
use std::path::Path;
use std::sync::Arc;

/// Orchestrator owning the stage agents and loop policy.
pub struct ResearchWorkflow {
    planner: PlannerAgent,
    searcher: SearcherAgent,
    summarizer: SummarizerAgent,
    synthesizer: SynthesizerAgent,
    critic: CriticAgent,
    reflector: ReflectorAgent,
    quality_threshold: f32,
    default_max_iterations: u32,
}

impl ResearchWorkflow {
    /// Build a workflow from an LLM client and pipeline settings.
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: &str,
        workspace: &Path,
        config: &PipelineConfig,
    ) -> Self {
        Self::with_arxiv_client(client, model, workspace, config, ArxivClient::new())
    }

    /// Build a workflow with a custom arXiv client (tests, mirrors).
    pub fn with_arxiv_client(
        client: Arc<dyn LlmClient>,
        model: &str,
        workspace: &Path,
        config: &PipelineConfig,
        arxiv: ArxivClient,
    ) -> Self {
        let llm = StageLlm::new(client, model, workspace);
        let temps = &config.temperatures;

        Self {
            planner: PlannerAgent::new(llm.clone(), temps.planner),
            searcher: SearcherAgent::new(arxiv, config.max_papers),
            summarizer: SummarizerAgent::new(
                llm.clone(),
                temps.summarizer,
                config.chunk_size as usize,
                config.chunk_overlap as usize,
            ),
            synthesizer: SynthesizerAgent::new(llm.clone(), temps.synthesizer),
            critic: CriticAgent::new(llm.clone(), temps.critic),
            reflector: ReflectorAgent::new(llm, temps.reflector),
            quality_threshold: config.quality_threshold,
            default_max_iterations: config.max_iterations,
        }
    }

    /// Execute the full workflow, including the arXiv search.
    pub async fn run(
        &self,
        query: &str,
        max_iterations: Option<u32>,
    ) -> AppResult<WorkflowState> {
        let max_iterations = max_iterations.unwrap_or(self.default_max_iterations);
        let mut state = WorkflowState::new(query, max_iterations);

        tracing::info!(
            "Starting research synthesis workflow (query: {}, max_iterations: {})",
            query,
            max_iterations
        );

        self.planner.plan(&mut state).await?;
        self.searcher.search(&mut state).await?;

        self.finish(state).await
    }

    /// Execute the workflow over an already-known paper set (no search call).
    pub async fn run_with_papers(
        &self,
        query: &str,
        papers: Vec<Paper>,
        max_iterations: Option<u32>,
    ) -> AppResult<WorkflowState> {
        let max_iterations = max_iterations.unwrap_or(self.default_max_iterations);
        let mut state = WorkflowState::new(query, max_iterations);

        self.planner.plan(&mut state).await?;

        state.record("searcher", format!("Seeded {} papers", papers.len()));
        state.papers = papers;

        self.finish(state).await
    }

    /// Shared tail: summarize, synthesize, and run the bounded critique loop.
    async fn finish(&self, mut state: WorkflowState) -> AppResult<WorkflowState> {
        self.summarizer.summarize(&mut state).await?;
        self.synthesizer.synthesize(&mut state).await?;

        if state.summaries.is_empty() {
            state.record("workflow", "Skipping critique: no material to evaluate");
            state.final_output = state.synthesis.clone();
            return Ok(state);
        }

        self.critic.critique(&mut state).await?;

        // Reflect while quality is below the bar and the iteration budget holds
        while state.quality_score < self.quality_threshold
            && state.iteration < state.max_iterations
        {
            self.reflector.reflect(&mut state).await?;
            self.critic.critique(&mut state).await?;
        }

        state.final_output = state.synthesis.clone();

        tracing::info!(
            "Workflow complete (quality: {:.1}/10, iterations: {})",
            state.quality_score,
            state.iteration
        );

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::synthesizer::EMPTY_SYNTHESIS;
    use scholar_llm::{LlmRequest, LlmResponse, LlmStream, LlmUsage};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted LLM: critique prompts pop from a score queue, everything else
    /// returns canned text.
    struct MockLlm {
        critique_scores: Mutex<VecDeque<f32>>,
    }

    impl MockLlm {
        fn with_scores(scores: &[f32]) -> Arc<Self> {
            Arc::new(Self {
                critique_scores: Mutex::new(scores.iter().copied().collect()),
            })
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for MockLlm {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &LlmRequest) -> scholar_core::AppResult<LlmResponse> {
            let content = if request.prompt.contains("Synthesis to Evaluate:") {
                let score = self
                    .critique_scores
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or(3.0);
                format!(r#"{{"quality_score": {}, "hallucinations": []}}"#, score)
            } else {
                "generated text".to_string()
            };

            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }

        async fn stream(&self, _request: &LlmRequest) -> scholar_core::AppResult<LlmStream> {
            unimplemented!("streaming not used in workflow tests")
        }
    }

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec!["Author One".to_string()],
            abstract_text: "An abstract about retrieval augmented generation and grounding of language model outputs in source documents."
                .to_string(),
            published: "2024-01-15".to_string(),
            url: format!("http://arxiv.org/abs/{}", id),
            pdf_url: None,
        }
    }

    fn workflow(client: Arc<dyn LlmClient>, workspace: &Path) -> ResearchWorkflow {
        let config = PipelineConfig::default();
        ResearchWorkflow::new(client, "mock-model", workspace, &config)
    }

    #[tokio::test]
    async fn test_high_score_skips_reflection() {
        let workspace = TempDir::new().unwrap();
        let client = MockLlm::with_scores(&[9.0]);
        let flow = workflow(client, workspace.path());

        let state = flow
            .run_with_papers("test query", vec![paper("p1", "Paper One")], Some(2))
            .await
            .unwrap();

        assert_eq!(state.iteration, 0);
        assert!((state.quality_score - 9.0).abs() < f32::EPSILON);
        assert_eq!(state.final_output, "generated text");
    }

    #[tokio::test]
    async fn test_low_score_triggers_bounded_reflection() {
        let workspace = TempDir::new().unwrap();
        // Every critique scores 3.0; the loop must stop at max_iterations
        let client = MockLlm::with_scores(&[3.0, 3.0, 3.0, 3.0, 3.0]);
        let flow = workflow(client, workspace.path());

        let state = flow
            .run_with_papers("test query", vec![paper("p1", "Paper One")], Some(2))
            .await
            .unwrap();

        assert_eq!(state.iteration, 2);
        assert!(state.quality_score < 7.0);
    }

    #[tokio::test]
    async fn test_reflection_exits_once_quality_recovers() {
        let workspace = TempDir::new().unwrap();
        let client = MockLlm::with_scores(&[5.0, 8.0]);
        let flow = workflow(client, workspace.path());

        let state = flow
            .run_with_papers("test query", vec![paper("p1", "Paper One")], Some(5))
            .await
            .unwrap();

        assert_eq!(state.iteration, 1);
        assert!((state.quality_score - 8.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_no_papers_skips_critique() {
        let workspace = TempDir::new().unwrap();
        let client = MockLlm::with_scores(&[]);
        let flow = workflow(client, workspace.path());

        let state = flow
            .run_with_papers("test query", vec![], Some(2))
            .await
            .unwrap();

        assert_eq!(state.synthesis, EMPTY_SYNTHESIS);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.quality_score, 0.0);
        assert!(state.messages.iter().all(|m| m.agent != "critic"));
    }

    #[tokio::test]
    async fn test_transcript_covers_stages() {
        let workspace = TempDir::new().unwrap();
        let client = MockLlm::with_scores(&[9.0]);
        let flow = workflow(client, workspace.path());

        let state = flow
            .run_with_papers("test query", vec![paper("p1", "Paper One")], Some(2))
            .await
            .unwrap();

        let agents: Vec<&str> = state.messages.iter().map(|m| m.agent.as_str()).collect();
        assert!(agents.contains(&"planner"));
        assert!(agents.contains(&"searcher"));
        assert!(agents.contains(&"summarizer"));
        assert!(agents.contains(&"synthesizer"));
        assert!(agents.contains(&"critic"));
    }
}

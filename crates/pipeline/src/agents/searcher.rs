//! Searcher stage: retrieves papers from arXiv.

use crate::arxiv::ArxivClient;
use crate::state::WorkflowState;
use scholar_core::AppResult;

pub struct SearcherAgent {
    client: ArxivClient,
    max_papers: u32,
}

impl SearcherAgent {
    pub fn new(client: ArxivClient, max_papers: u32) -> Self {
        Self { client, max_papers }
    }

    /// Search for papers matching the query and record them in the state.
    pub async fn search(&self, state: &mut WorkflowState) -> AppResult<()> {
        tracing::info!("Searcher: querying arXiv");

        let papers = self.client.search(&state.query, self.max_papers).await?;

        state.record("searcher", format!("Found {} relevant papers", papers.len()));
        state.papers = papers;

        Ok(())
    }
}

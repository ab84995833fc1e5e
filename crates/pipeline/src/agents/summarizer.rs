//! Summarizer stage: request-scoped RAG over the retrieved papers.
//!
//! Builds an in-memory vector index over title+abstract chunks of every
//! paper, then summarizes the top papers against the chunks most relevant to
//! the query. The index lives and dies with the run.

use super::{vars, StageLlm};
use crate::state::{PaperSummary, WorkflowState};
use scholar_core::AppResult;
use scholar_knowledge::embeddings::{self, EmbeddingProvider};
use scholar_knowledge::vector_index::VectorIndex;
use scholar_knowledge::{chunker, retrieval, KnowledgeBaseConfig, KnowledgeChunk, MemoryIndex};
use std::sync::Arc;

/// Papers summarized per run (the rest only inform the search transcript).
const MAX_SUMMARIZED_PAPERS: usize = 5;

/// Chunks retrieved per paper summary.
const CHUNKS_PER_SUMMARY: usize = 3;

pub struct SummarizerAgent {
    llm: StageLlm,
    temperature: f32,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SummarizerAgent {
    pub fn new(llm: StageLlm, temperature: f32, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            llm,
            temperature,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Summarize the top papers using retrieval over the paper store.
    pub async fn summarize(&self, state: &mut WorkflowState) -> AppResult<()> {
        if state.papers.is_empty() {
            tracing::info!("Summarizer: no papers to summarize");
            state.summaries = Vec::new();
            return Ok(());
        }

        tracing::info!("Summarizer: indexing {} papers", state.papers.len());

        let (index, provider) = self.build_paper_index(state).await?;

        let mut summaries = Vec::new();

        for paper in state.papers.iter().take(MAX_SUMMARIZED_PAPERS) {
            let retrieval_query = format!("{} {}", paper.title, state.query);
            let retrieved = retrieval::retrieve(
                &index,
                provider.as_ref(),
                &retrieval_query,
                CHUNKS_PER_SUMMARY,
            )
            .await?;

            // Thin retrieval falls back to the paper's own abstract
            let context = if retrieved.is_empty() {
                paper.abstract_text.clone()
            } else {
                retrieved.context
            };

            let summary = self
                .llm
                .run_prompt(
                    "agent.summarize",
                    self.temperature,
                    vars(&[
                        ("title", &paper.title),
                        ("context", &context),
                        ("query", &state.query),
                    ]),
                )
                .await?;

            summaries.push(PaperSummary {
                paper_title: paper.title.clone(),
                authors: paper.authors.clone(),
                url: paper.url.clone(),
                summary,
            });
        }

        state.record(
            "summarizer",
            format!("Analyzed {} papers using RAG", summaries.len()),
        );
        state.summaries = summaries;

        Ok(())
    }

    /// Chunk and embed every paper into a request-scoped memory index.
    async fn build_paper_index(
        &self,
        state: &WorkflowState,
    ) -> AppResult<(MemoryIndex, Arc<dyn EmbeddingProvider>)> {
        let config = KnowledgeBaseConfig::default();
        let provider = embeddings::create_provider(&config, None)?;

        let mut index = MemoryIndex::new();

        for paper in &state.papers {
            let content = format!("Title: {}\n\nAbstract: {}", paper.title, paper.abstract_text);
            let candidates =
                chunker::chunk_text(&paper.id, &content, self.chunk_size, self.chunk_overlap);

            let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
            let embeddings = provider.embed_batch(&texts).await?;

            for (candidate, embedding) in candidates.iter().zip(embeddings) {
                index.upsert_chunk(&KnowledgeChunk {
                    id: uuid::Uuid::new_v4().to_string(),
                    source_id: candidate.source_id.clone(),
                    position: candidate.position,
                    text: candidate.text.clone(),
                    embedding: Some(embedding),
                    metadata: serde_json::json!({
                        "title": paper.title,
                        "authors": paper.authors.join(", "),
                        "published": paper.published,
                        "url": paper.url,
                    }),
                })?;
            }
        }

        tracing::debug!("Paper index holds {} chunks", index.len());

        Ok((index, provider))
    }
}

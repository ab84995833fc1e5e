//! Retrieval over a vector index: search, relevance cutoff, context assembly.
//!
//! Produces the context block handed to the LLM plus human-readable source
//! references for the response.

use crate::embeddings::EmbeddingProvider;
use crate::types::KnowledgeChunk;
use crate::vector_index::VectorIndex;
use scholar_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum cosine similarity score for a chunk to be considered relevant.
/// 0.20 suits trigram embeddings; semantic models can afford 0.3-0.5.
pub const MIN_RELEVANCE_SCORE: f32 = 0.20;

/// Below this top score the answer prompt flags the retrieval as weak.
pub const CONFIDENCE_THRESHOLD: f32 = 0.45;

/// Maximum snippet length for source references.
const MAX_SNIPPET_LENGTH: usize = 150;

/// A human-readable reference to a retrieved source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source name (file name or paper title)
    pub source: String,

    /// Location hint within the source
    pub location: String,

    /// Leading snippet of the matched chunk
    pub snippet: String,
}

/// Everything retrieval produced for one query.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Retrieved chunks, best first
    pub chunks: Vec<KnowledgeChunk>,

    /// Relevance scores aligned with `chunks`
    pub scores: Vec<f32>,

    /// Numbered context block for the LLM prompt
    pub context: String,

    /// Deduplicated source references
    pub sources: Vec<SourceRef>,

    /// Highest relevance score
    pub max_score: f32,

    /// True when even the best chunk scored under the confidence bar
    pub low_confidence: bool,
}

impl RetrievedContext {
    /// Whether nothing relevant was found.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Retrieve relevant chunks for a query and assemble the LLM context.
pub async fn retrieve(
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    top_k: usize,
) -> AppResult<RetrievedContext> {
    if query.trim().is_empty() {
        return Err(AppError::Knowledge("Query cannot be empty".to_string()));
    }

    let query_embedding = provider.embed(query).await?;

    let results = index.search(&query_embedding, top_k)?;

    tracing::debug!("Retrieved {} chunks before filtering", results.len());

    // Apply relevance cutoff
    let filtered: Vec<_> = results
        .into_iter()
        .filter(|(_chunk, score)| *score >= MIN_RELEVANCE_SCORE)
        .collect();

    if filtered.is_empty() {
        tracing::info!(
            "No relevant chunks found (all scores below {:.2} threshold)",
            MIN_RELEVANCE_SCORE
        );
        return Ok(RetrievedContext {
            chunks: vec![],
            scores: vec![],
            context: String::new(),
            sources: vec![],
            max_score: 0.0,
            low_confidence: true,
        });
    }

    let chunks: Vec<KnowledgeChunk> = filtered.iter().map(|(c, _)| c.clone()).collect();
    let scores: Vec<f32> = filtered.iter().map(|(_, s)| *s).collect();
    let max_score = scores.first().copied().unwrap_or(0.0);
    let low_confidence = max_score < CONFIDENCE_THRESHOLD;

    tracing::info!(
        "Retrieved {} relevant chunks (max score: {:.3}, low_confidence: {})",
        chunks.len(),
        max_score,
        low_confidence
    );

    let context = build_context(&chunks);
    let sources = map_chunks_to_sources(&chunks);

    Ok(RetrievedContext {
        chunks,
        scores,
        context,
        sources,
        max_score,
        low_confidence,
    })
}

/// Build a numbered context block from chunks.
pub fn build_context(chunks: &[KnowledgeChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Document {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Map chunks to deduplicated human-readable source references.
fn map_chunks_to_sources(chunks: &[KnowledgeChunk]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let source = extract_source_name(chunk);
        let location = format!("chunk {}", chunk.position);
        let key = (source.clone(), location.clone());

        if seen.insert(key) {
            sources.push(SourceRef {
                source,
                location,
                snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
            });
        }
    }

    sources
}

/// Extract a human-readable source name from chunk metadata or source_id.
fn extract_source_name(chunk: &KnowledgeChunk) -> String {
    // Paper chunks carry a title; file chunks carry a path
    if let Some(title) = chunk.metadata.get("title").and_then(|v| v.as_str()) {
        return title.to_string();
    }

    if let Some(path) = chunk.metadata.get("source_path").and_then(|v| v.as_str()) {
        if let Some(filename) = path.rsplit('/').next() {
            return filename.to_string();
        }
    }

    // Fallback: source_id, truncated if it looks like a UUID
    if chunk.source_id.len() > 12 && !chunk.source_id.contains('.') {
        format!("{}...", &chunk.source_id[..12])
    } else {
        chunk.source_id.clone()
    }
}

/// Truncate snippet to maximum length at a word boundary.
fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }

    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];

    if let Some(last_space) = truncated.rfind(char::is_whitespace) {
        format!("{}...", &truncated[..last_space])
    } else {
        format!("{}...", truncated)
    }
}

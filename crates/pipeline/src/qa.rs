//! Self-correcting document Q&A.
//!
//! Retrieve → generate → (review → refine)* against a knowledge base. The
//! review loop is bounded by `max_iterations` and exits as soon as the
//! reviewer accepts the answer or reports high confidence.

use crate::agents::{clean_json_block, vars, StageLlm};
use scholar_core::{AppError, AppResult};
use scholar_knowledge::{retrieve_context, RetrievedContext, SourceRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Confidence above which an answer is accepted even if flagged.
const ACCEPT_CONFIDENCE: f32 = 0.9;

/// Reviewer verdict on a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReview {
    #[serde(default = "default_true")]
    pub is_accurate: bool,

    #[serde(default = "default_true")]
    pub is_complete: bool,

    #[serde(default = "default_true")]
    pub is_grounded: bool,

    #[serde(default)]
    pub needs_refinement: bool,

    #[serde(default)]
    pub issues: Vec<String>,

    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_true() -> bool {
    true
}

fn default_confidence() -> f32 {
    0.8
}

impl Default for GenerationReview {
    fn default() -> Self {
        Self {
            is_accurate: true,
            is_complete: true,
            is_grounded: true,
            needs_refinement: false,
            issues: Vec::new(),
            confidence: default_confidence(),
        }
    }
}

/// Options for a Q&A run.
#[derive(Debug, Clone)]
pub struct QaOptions {
    /// Knowledge base to query
    pub base_name: String,

    /// Chunks to retrieve
    pub top_k: u32,

    /// Enable the review/refine loop
    pub self_correction: bool,

    /// Maximum review passes
    pub max_iterations: u32,

    /// Include source references in the result
    pub return_sources: bool,
}

/// Result of a Q&A run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaResult {
    /// The question asked
    pub question: String,

    /// Final answer text
    pub answer: String,

    /// Source references (when requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,

    /// Review passes performed
    pub iterations: u32,

    /// Last review, when self-correction ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<GenerationReview>,
}

/// Answer a question against a knowledge base.
///
/// Retrieval failures and an empty index surface as errors; an empty
/// retrieval result produces the standard "no information" answer without an
/// LLM call.
pub async fn answer_question(
    workspace: &Path,
    llm: &StageLlm,
    question: &str,
    options: &QaOptions,
    api_key: Option<&str>,
) -> AppResult<QaResult> {
    if question.trim().is_empty() {
        return Err(AppError::Pipeline("Question cannot be empty".to_string()));
    }

    let retrieved = retrieve_context(
        workspace,
        &options.base_name,
        question,
        options.top_k,
        api_key,
    )
    .await?;

    if retrieved.is_empty() {
        return Ok(QaResult {
            question: question.to_string(),
            answer: "I could not find this information in the available documents.".to_string(),
            sources: options.return_sources.then(Vec::new),
            iterations: 0,
            review: None,
        });
    }

    let mut answer = generate_answer(llm, question, &retrieved).await?;

    let mut iterations = 0u32;
    let mut last_review = None;

    if options.self_correction {
        for _ in 0..options.max_iterations {
            iterations += 1;

            let review = review_answer(llm, question, &answer, &retrieved).await?;

            tracing::debug!(
                "Answer review {}: accurate={}, grounded={}, needs_refinement={}, confidence={:.2}",
                iterations,
                review.is_accurate,
                review.is_grounded,
                review.needs_refinement,
                review.confidence
            );

            let accepted = !review.needs_refinement || review.confidence > ACCEPT_CONFIDENCE;
            last_review = Some(review.clone());

            if accepted {
                break;
            }

            answer = refine_answer(llm, question, &answer, &review, &retrieved).await?;
        }
    }

    Ok(QaResult {
        question: question.to_string(),
        answer,
        sources: options.return_sources.then(|| retrieved.sources.clone()),
        iterations,
        review: last_review,
    })
}

/// Generate the initial answer from retrieved context.
async fn generate_answer(
    llm: &StageLlm,
    question: &str,
    retrieved: &RetrievedContext,
) -> AppResult<String> {
    llm.run_prompt(
        "agent.answer",
        0.3,
        vars(&[("question", question), ("context", &retrieved.context)]),
    )
    .await
}

/// Ask the reviewer prompt for a verdict; unparseable output accepts.
async fn review_answer(
    llm: &StageLlm,
    question: &str,
    answer: &str,
    retrieved: &RetrievedContext,
) -> AppResult<GenerationReview> {
    let response = llm
        .run_prompt(
            "agent.review",
            0.1,
            vars(&[
                ("question", question),
                ("answer", answer),
                ("context", &retrieved.context),
            ]),
        )
        .await?;

    let cleaned = clean_json_block(&response);
    Ok(serde_json::from_str(cleaned).unwrap_or_default())
}

/// Rewrite the answer to address the reviewer's issues.
async fn refine_answer(
    llm: &StageLlm,
    question: &str,
    answer: &str,
    review: &GenerationReview,
    retrieved: &RetrievedContext,
) -> AppResult<String> {
    let issues = review
        .issues
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");

    llm.run_prompt(
        "agent.refine",
        0.3,
        vars(&[
            ("question", question),
            ("answer", answer),
            ("issues", &issues),
            ("context", &retrieved.context),
        ]),
    )
    .await
}

//! Critic stage: evaluates the synthesis against its sources.
//!
//! The critic returns JSON with a 0-10 quality score. Malformed output never
//! fails the run: the score extractor falls back to a value scan and finally
//! to a neutral 5.0.

use super::{clean_json_block, vars, StageLlm};
use crate::state::{Critique, WorkflowState};
use scholar_core::AppResult;

/// Score assumed when the critic's output yields no parseable score.
const NEUTRAL_SCORE: f32 = 5.0;

pub struct CriticAgent {
    llm: StageLlm,
    temperature: f32,
}

impl CriticAgent {
    pub fn new(llm: StageLlm, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// Evaluate the current synthesis, updating the critique and score.
    pub async fn critique(&self, state: &mut WorkflowState) -> AppResult<()> {
        tracing::info!("Critic: evaluating synthesis");

        let ground_truth = state
            .summaries
            .iter()
            .map(|s| {
                format!(
                    "Paper: {}\nAuthors: {}\n{}",
                    s.paper_title,
                    s.authors.join(", "),
                    s.summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let response = self
            .llm
            .run_prompt(
                "agent.critique",
                self.temperature,
                vars(&[
                    ("synthesis", &state.synthesis),
                    ("ground_truth", &ground_truth),
                    ("query", &state.query),
                ]),
            )
            .await?;

        let (critique, score) = parse_critique(&response);

        state.record(
            "critic",
            format!("Evaluated synthesis (Quality: {:.1}/10)", score),
        );
        state.critique_raw = response;
        state.critique = critique;
        state.quality_score = score;

        Ok(())
    }
}

/// Parse the critic's response into a structured critique and a clamped score.
pub(crate) fn parse_critique(content: &str) -> (Option<Critique>, f32) {
    let cleaned = clean_json_block(content);

    if let Ok(critique) = serde_json::from_str::<Critique>(cleaned) {
        let score = clamp_score(critique.quality_score);
        return (Some(critique), score);
    }

    // Fall back to scanning the raw text for a quality_score value
    if let Some(score) = scan_quality_score(content) {
        return (None, clamp_score(score));
    }

    (None, NEUTRAL_SCORE)
}

/// Clamp a score onto the 0-10 scale.
fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.clamp(0.0, 10.0)
}

/// Find a `"quality_score": <number>` pair anywhere in free text.
fn scan_quality_score(content: &str) -> Option<f32> {
    let key_pos = content.find("quality_score")?;
    let after_key = &content[key_pos + "quality_score".len()..];
    let colon_pos = after_key.find(':')?;
    let after_colon = after_key[colon_pos + 1..].trim_start();

    let number: String = after_colon
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    number.parse().ok()
}

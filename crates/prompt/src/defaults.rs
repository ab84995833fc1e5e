//! Compiled-in prompt definitions for every pipeline stage.
//!
//! Workspace overrides in `.scholar/prompts/<id>.yml` take precedence;
//! these defaults keep the tool usable with zero setup.

use crate::types::{PromptBehavior, PromptDefinition, PromptOutputSpec};

const PLAN_SYSTEM: &str = "\
You are a research planning expert. Given a research query, create a detailed plan for:
1. What specific aspects to search for
2. Key topics and subtopics to explore
3. How to synthesize findings
4. Success criteria for the analysis

Be specific and actionable.";

const PLAN_TEMPLATE: &str = "Research Query: {{query}}";

const SUMMARIZE_SYSTEM: &str = "\
You are an expert research paper analyzer. Summarize the paper focusing on:
1. Main contributions and findings
2. Methodology used
3. Key results and implications
4. Relevance to the research query

Be concise but comprehensive. Use only information from the provided context.";

const SUMMARIZE_TEMPLATE: &str = "\
Paper Title: {{title}}

Context from paper:
{{context}}

Research Query: {{query}}

Provide a structured summary.";

const SYNTHESIZE_SYSTEM: &str = "\
You are a research synthesis expert. Given summaries of multiple papers:
1. Identify common themes and patterns
2. Highlight contradictions or debates
3. Synthesize key insights
4. Draw meaningful conclusions
5. Identify research gaps

Create a coherent narrative that answers the research query.";

const SYNTHESIZE_TEMPLATE: &str = "\
Research Query: {{query}}

Paper Summaries:
{{summaries}}

Research Plan Context:
{{plan}}

Provide a comprehensive synthesis with clear sections.";

const CRITIQUE_SYSTEM: &str = "\
You are a critical evaluator specializing in hallucination detection. Analyze the synthesis against source papers:

1. FACTUAL ACCURACY: Check each claim against source papers
2. HALLUCINATION DETECTION: Identify any unsupported claims
3. COMPLETENESS: Are key findings missing?
4. COHERENCE: Is the logic sound?
5. QUALITY SCORE: Rate 0-10

Provide specific feedback with citations to source papers.";

const CRITIQUE_TEMPLATE: &str = "\
Synthesis to Evaluate:
{{synthesis}}

Source Papers (Ground Truth):
{{ground_truth}}

Research Query: {{query}}

Respond with JSON only, using these fields:
- hallucinations: list of unsupported claims
- accuracy_issues: list of inaccuracies
- missing_points: important omissions
- strengths: what's done well
- quality_score: 0-10
- recommendations: specific improvements";

const REFLECT_SYSTEM: &str = "\
You are a reflective agent that improves research synthesis.
Given the original synthesis, critique, and source papers:
1. Address all identified issues
2. Remove hallucinations
3. Add missing information
4. Improve clarity and coherence
5. Ensure all claims are grounded in sources

Produce an improved version that maintains the same structure but fixes all issues.";

const REFLECT_TEMPLATE: &str = "\
Original Synthesis:
{{synthesis}}

Critique and Issues:
{{critique}}

Source Papers:
{{summaries}}

Create an improved synthesis that addresses all critique points.";

const ANSWER_SYSTEM: &str = "\
You are an assistant for question-answering tasks.
Use the retrieved context to answer the question.
If the context does not contain the answer, say that you don't know.
Answer as if you had read the original documents directly; never mention chunks, embeddings, or document numbers.
Keep the answer concise and factual.";

const ANSWER_TEMPLATE: &str = "\
Context:
{{context}}

Question: {{question}}

Answer:";

const REVIEW_SYSTEM: &str = "\
You are a strict reviewer of generated answers. Judge the answer only against the retrieved context.";

const REVIEW_TEMPLATE: &str = "\
Question: {{question}}

Answer to review:
{{answer}}

Retrieved context:
{{context}}

Respond with JSON only, using these fields:
- is_accurate: boolean
- is_complete: boolean
- is_grounded: boolean
- needs_refinement: boolean
- issues: list of concrete problems (empty if none)
- confidence: 0.0-1.0";

const REFINE_SYSTEM: &str = "\
You revise answers to fix the specific issues a reviewer found.
Stay grounded in the retrieved context; do not introduce new claims.";

const REFINE_TEMPLATE: &str = "\
Question: {{question}}

Current answer:
{{answer}}

Issues found:
{{issues}}

Retrieved context:
{{context}}

Produce a corrected answer.";

fn definition(
    id: &str,
    title: &str,
    tone: &str,
    style: &str,
    system: &str,
    template: &str,
    format: &str,
) -> PromptDefinition {
    PromptDefinition {
        id: id.to_string(),
        title: title.to_string(),
        api_version: "1.0".to_string(),
        behavior: PromptBehavior {
            tone: tone.to_string(),
            style: style.to_string(),
        },
        system: Some(system.to_string()),
        template: template.to_string(),
        output: PromptOutputSpec {
            format: format.to_string(),
        },
    }
}

/// Look up a compiled-in prompt definition by ID.
pub fn builtin(prompt_id: &str) -> Option<PromptDefinition> {
    let def = match prompt_id {
        "agent.plan" => definition(
            "agent.plan",
            "Research Plan",
            "professional",
            "structured",
            PLAN_SYSTEM,
            PLAN_TEMPLATE,
            "markdown",
        ),
        "agent.summarize" => definition(
            "agent.summarize",
            "Paper Summary",
            "professional",
            "concise",
            SUMMARIZE_SYSTEM,
            SUMMARIZE_TEMPLATE,
            "markdown",
        ),
        "agent.synthesize" => definition(
            "agent.synthesize",
            "Research Synthesis",
            "professional",
            "structured",
            SYNTHESIZE_SYSTEM,
            SYNTHESIZE_TEMPLATE,
            "markdown",
        ),
        "agent.critique" => definition(
            "agent.critique",
            "Synthesis Critique",
            "critical",
            "structured",
            CRITIQUE_SYSTEM,
            CRITIQUE_TEMPLATE,
            "json",
        ),
        "agent.reflect" => definition(
            "agent.reflect",
            "Synthesis Reflection",
            "professional",
            "structured",
            REFLECT_SYSTEM,
            REFLECT_TEMPLATE,
            "markdown",
        ),
        "agent.answer" => definition(
            "agent.answer",
            "Document Answer",
            "professional",
            "concise",
            ANSWER_SYSTEM,
            ANSWER_TEMPLATE,
            "text",
        ),
        "agent.review" => definition(
            "agent.review",
            "Answer Review",
            "critical",
            "structured",
            REVIEW_SYSTEM,
            REVIEW_TEMPLATE,
            "json",
        ),
        "agent.refine" => definition(
            "agent.refine",
            "Answer Refinement",
            "professional",
            "concise",
            REFINE_SYSTEM,
            REFINE_TEMPLATE,
            "text",
        ),
        _ => return None,
    };

    Some(def)
}

/// IDs of all compiled-in prompts.
pub fn builtin_ids() -> &'static [&'static str] {
    &[
        "agent.plan",
        "agent.summarize",
        "agent.synthesize",
        "agent.critique",
        "agent.reflect",
        "agent.answer",
        "agent.review",
        "agent.refine",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_ids_resolve() {
        for id in builtin_ids() {
            let def = builtin(id).unwrap();
            assert_eq!(&def.id, id);
            assert!(!def.template.is_empty());
            assert!(def.system.is_some());
        }
    }

    #[test]
    fn test_unknown_id() {
        assert!(builtin("agent.nonexistent").is_none());
    }

    #[test]
    fn test_critique_outputs_json() {
        let def = builtin("agent.critique").unwrap();
        assert_eq!(def.output.format, "json");
        assert!(def.template.contains("quality_score"));
    }
}

//! Pipeline state shared across workflow stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// arXiv entry identifier
    pub id: String,

    /// Paper title (whitespace-normalized)
    pub title: String,

    /// Author names
    pub authors: Vec<String>,

    /// Abstract text (whitespace-normalized)
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Publication date (YYYY-MM-DD)
    pub published: String,

    /// Entry URL
    pub url: String,

    /// Direct PDF link, when the feed provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// A per-paper summary produced by the summarizer stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    /// Title of the summarized paper
    pub paper_title: String,

    /// Author names
    pub authors: Vec<String>,

    /// Entry URL
    pub url: String,

    /// Summary text
    pub summary: String,
}

/// Structured critic output.
///
/// `quality_score` is always clamped to the 0-10 scale; unparseable critic
/// responses degrade to a neutral 5.0 rather than erroring the run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Critique {
    #[serde(default)]
    pub hallucinations: Vec<String>,

    #[serde(default)]
    pub accuracy_issues: Vec<String>,

    #[serde(default)]
    pub missing_points: Vec<String>,

    #[serde(default)]
    pub strengths: Vec<String>,

    #[serde(default)]
    pub recommendations: Vec<String>,

    #[serde(default)]
    pub quality_score: f32,
}

/// One transcript line from a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Stage name ("planner", "critic", ...)
    pub agent: String,

    /// Message content
    pub content: String,

    /// When the message was recorded
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// State accumulated over one workflow run.
///
/// Created at run start, discarded after the report is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// The research query
    pub query: String,

    /// Plan produced by the planner stage
    pub search_plan: String,

    /// Papers found by the searcher stage
    pub papers: Vec<Paper>,

    /// Per-paper summaries
    pub summaries: Vec<PaperSummary>,

    /// Current synthesis text (rewritten by the reflector)
    pub synthesis: String,

    /// Raw critic response (for the report)
    pub critique_raw: String,

    /// Parsed critique, when the critic produced valid JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<Critique>,

    /// Latest quality score in [0, 10]
    pub quality_score: f32,

    /// Completed reflection iterations
    pub iteration: u32,

    /// Iteration bound for the critique/reflection loop
    pub max_iterations: u32,

    /// Stage transcript
    pub messages: Vec<AgentMessage>,

    /// Final synthesis text
    pub final_output: String,
}

impl WorkflowState {
    /// Create the initial state for a query.
    pub fn new(query: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            query: query.into(),
            search_plan: String::new(),
            papers: Vec::new(),
            summaries: Vec::new(),
            synthesis: String::new(),
            critique_raw: String::new(),
            critique: None,
            quality_score: 0.0,
            iteration: 0,
            max_iterations,
            messages: Vec::new(),
            final_output: String::new(),
        }
    }

    /// Append a transcript message.
    pub fn record(&mut self, agent: &str, content: impl Into<String>) {
        self.messages.push(AgentMessage::new(agent, content));
    }
}

/// Persisted result of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The research query
    pub query: String,

    /// Final synthesis text
    pub final_synthesis: String,

    /// Final quality score in [0, 10]
    pub quality_score: f32,

    /// Reflection iterations used
    pub iterations: u32,

    /// Number of papers analyzed
    pub papers_analyzed: usize,

    /// Papers referenced
    pub papers: Vec<Paper>,

    /// Research plan
    pub search_plan: String,

    /// Raw critic response
    pub critique: String,

    /// Report creation time
    pub timestamp: DateTime<Utc>,
}

impl RunReport {
    /// Build a report from a completed workflow state.
    pub fn from_state(state: &WorkflowState) -> Self {
        Self {
            query: state.query.clone(),
            final_synthesis: state.final_output.clone(),
            quality_score: state.quality_score,
            iterations: state.iteration,
            papers_analyzed: state.papers.len(),
            papers: state.papers.clone(),
            search_plan: state.search_plan.clone(),
            critique: state.critique_raw.clone(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = WorkflowState::new("query", 2);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.max_iterations, 2);
        assert_eq!(state.quality_score, 0.0);
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_record_transcript() {
        let mut state = WorkflowState::new("query", 2);
        state.record("planner", "created plan");
        state.record("searcher", "found 3 papers");

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].agent, "planner");
    }

    #[test]
    fn test_report_from_state() {
        let mut state = WorkflowState::new("q", 2);
        state.final_output = "synthesis".to_string();
        state.quality_score = 8.5;
        state.iteration = 1;

        let report = RunReport::from_state(&state);
        assert_eq!(report.final_synthesis, "synthesis");
        assert_eq!(report.iterations, 1);
        assert!((report.quality_score - 8.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_report_json_round_trip() {
        let state = WorkflowState::new("q", 2);
        let report = RunReport::from_state(&state);

        let json = serde_json::to_string(&report).unwrap();
        let restored: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.query, "q");
    }

    #[test]
    fn test_critique_defaults() {
        let critique: Critique = serde_json::from_str(r#"{"quality_score": 6.5}"#).unwrap();
        assert!(critique.hallucinations.is_empty());
        assert!((critique.quality_score - 6.5).abs() < f32::EPSILON);
    }
}

//! Research synthesis pipeline for Scholar.
//!
//! Implements the six-stage workflow (Planner → Searcher → Summarizer →
//! Synthesizer → Critic → Reflector) with a bounded critique/reflection loop,
//! plus the self-correcting document Q&A path and evaluation metrics over
//! persisted run reports.

pub mod agents;
pub mod arxiv;
pub mod metrics;
pub mod qa;
pub mod report;
pub mod state;
pub mod workflow;

pub use arxiv::ArxivClient;
pub use qa::{answer_question, QaOptions, QaResult};
pub use state::{AgentMessage, Critique, Paper, PaperSummary, RunReport, WorkflowState};
pub use workflow::ResearchWorkflow;

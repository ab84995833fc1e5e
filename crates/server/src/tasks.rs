//! In-memory research task registry.
//!
//! Tasks are request-scoped state: the registry lives only as long as the
//! server process and is never persisted.

use chrono::{DateTime, Utc};
use scholar_pipeline::RunReport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lifecycle state of a research task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One research task tracked by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchTask {
    /// Create a pending task for a query.
    pub fn pending(task_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            query: query.into(),
            created_at: Utc::now(),
            completed_at: None,
            quality_score: None,
            iterations: None,
            report: None,
            error: None,
        }
    }

    /// Whether the task reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Shared task registry handle.
pub type TaskRegistry = Arc<RwLock<HashMap<String, ResearchTask>>>;

/// Create an empty registry.
pub fn new_registry() -> TaskRegistry {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Mark a task as running.
pub async fn mark_running(registry: &TaskRegistry, task_id: &str) {
    if let Some(task) = registry.write().await.get_mut(task_id) {
        task.status = TaskStatus::Running;
    }
}

/// Mark a task as completed with its report.
pub async fn mark_completed(registry: &TaskRegistry, task_id: &str, report: RunReport) {
    if let Some(task) = registry.write().await.get_mut(task_id) {
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now());
        task.quality_score = Some(report.quality_score);
        task.iterations = Some(report.iterations);
        task.report = Some(report);
    }
}

/// Mark a task as failed with an error message.
pub async fn mark_failed(registry: &TaskRegistry, task_id: &str, error: String) {
    if let Some(task) = registry.write().await.get_mut(task_id) {
        task.status = TaskStatus::Failed;
        task.completed_at = Some(Utc::now());
        task.error = Some(error);
    }
}

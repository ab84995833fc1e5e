//! Request handlers for the REST API.

use crate::tasks::{self, ResearchTask, TaskStatus};
use crate::{api_error, ApiResult, ServerState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use scholar_core::AppError;
use scholar_knowledge::SourceRef;
use scholar_pipeline::{qa, ResearchWorkflow, RunReport};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub index_ready: bool,
    pub active_tasks: usize,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks_created: u32,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: Option<u32>,
    pub return_sources: Option<bool>,
    pub self_correction: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
    pub iterations: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ResearchAccepted {
    pub task_id: String,
    pub status: TaskStatus,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub total: usize,
    pub tasks: Vec<ResearchTask>,
}

/// GET /health
pub async fn handle_health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let index_ready = scholar_knowledge::stats(&state.config.workspace, &state.base_name)
        .map(|s| s.chunks_count > 0)
        .unwrap_or(false);

    let active_tasks = state
        .tasks
        .read()
        .await
        .values()
        .filter(|t| !t.is_finished())
        .count();

    Json(HealthResponse {
        status: "healthy",
        index_ready,
        active_tasks,
    })
}

/// POST /upload
pub async fn handle_upload(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<UploadResponse> {
    if request.content.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "content cannot be empty",
        ));
    }

    let stats = scholar_knowledge::learn_text(
        &state.config.workspace,
        &state.base_name,
        &request.filename,
        &request.content,
        state.api_key.as_deref(),
    )
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(
        "Uploaded '{}': {} chunks",
        request.filename,
        stats.chunks_count
    );

    Ok(Json(UploadResponse {
        message: "Document uploaded and processed successfully".to_string(),
        filename: request.filename,
        chunks_created: stats.chunks_count,
    }))
}

/// POST /query
pub async fn handle_query(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<QueryResponse> {
    if request.question.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "question cannot be empty",
        ));
    }

    let options = qa::QaOptions {
        base_name: state.base_name.clone(),
        top_k: request.top_k.unwrap_or(state.config.pipeline.top_k),
        self_correction: request
            .self_correction
            .unwrap_or(state.config.pipeline.self_correction),
        max_iterations: state.config.pipeline.qa_max_iterations,
        return_sources: request.return_sources.unwrap_or(true),
    };

    let result = qa::answer_question(
        &state.config.workspace,
        &state.stage_llm,
        &request.question,
        &options,
        state.api_key.as_deref(),
    )
    .await
    .map_err(|e| match e {
        // An unpopulated index is a client-side sequencing problem
        AppError::Knowledge(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    Ok(Json(QueryResponse {
        question: result.question,
        answer: result.answer,
        sources: result.sources,
        iterations: result.iterations,
    }))
}

/// POST /research
pub async fn handle_research_create(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<(StatusCode, Json<ResearchAccepted>), crate::ApiError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query cannot be empty"));
    }

    let task_id = uuid::Uuid::new_v4().to_string();

    state
        .tasks
        .write()
        .await
        .insert(task_id.clone(), ResearchTask::pending(&task_id, &query));

    let task_state = Arc::clone(&state);
    let spawn_task_id = task_id.clone();
    let max_iterations = request.max_iterations;

    tokio::spawn(async move {
        run_research_task(task_state, spawn_task_id, query, max_iterations).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ResearchAccepted {
            task_id,
            status: TaskStatus::Pending,
        }),
    ))
}

/// Background execution of one research task.
async fn run_research_task(
    state: Arc<ServerState>,
    task_id: String,
    query: String,
    max_iterations: Option<u32>,
) {
    tasks::mark_running(&state.tasks, &task_id).await;

    let workflow = ResearchWorkflow::new(
        Arc::clone(&state.llm_client),
        &state.model,
        &state.config.workspace,
        &state.config.pipeline,
    );

    match workflow.run(&query, max_iterations).await {
        Ok(workflow_state) => {
            let report = RunReport::from_state(&workflow_state);

            // Persist alongside CLI runs; registry failure modes stay in memory
            if let Err(e) = scholar_pipeline::report::save_report(
                &report,
                &state.config.reports_dir(),
                None,
            ) {
                tracing::warn!("Failed to persist run report: {}", e);
            }

            tasks::mark_completed(&state.tasks, &task_id, report).await;
        }
        Err(e) => {
            tracing::error!("Research task {} failed: {}", task_id, e);
            tasks::mark_failed(&state.tasks, &task_id, e.to_string()).await;
        }
    }
}

/// GET /research/{id}
pub async fn handle_research_get(
    State(state): State<Arc<ServerState>>,
    Path(task_id): Path<String>,
) -> ApiResult<ResearchTask> {
    state
        .tasks
        .read()
        .await
        .get(&task_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Task not found"))
}

/// GET /research
pub async fn handle_research_list(
    State(state): State<Arc<ServerState>>,
) -> Json<TaskListResponse> {
    let mut tasks: Vec<ResearchTask> = state.tasks.read().await.values().cloned().collect();

    // Newest first
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Json(TaskListResponse {
        total: tasks.len(),
        tasks,
    })
}

/// DELETE /research/{id}
pub async fn handle_research_delete(
    State(state): State<Arc<ServerState>>,
    Path(task_id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let mut tasks = state.tasks.write().await;

    let Some(task) = tasks.get(&task_id) else {
        return Err(api_error(StatusCode::NOT_FOUND, "Task not found"));
    };

    if !task.is_finished() {
        return Err(api_error(
            StatusCode::CONFLICT,
            "Task is still running; wait for it to finish",
        ));
    }

    tasks.remove(&task_id);

    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

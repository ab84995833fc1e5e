//! HTTP service for Scholar.
//!
//! A thin JSON/REST facade over the knowledge base and the research
//! pipeline: upload documents, query them, and run research synthesis as
//! background tasks.

pub mod handlers;
pub mod tasks;

use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use scholar_core::{AppConfig, AppError, AppResult};
use scholar_llm::LlmClient;
use scholar_pipeline::agents::StageLlm;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use tasks::TaskRegistry;

/// Knowledge base used for uploads and queries.
pub const DEFAULT_BASE_NAME: &str = "uploads";

/// Shared server state.
pub struct ServerState {
    /// Application configuration
    pub config: AppConfig,

    /// LLM client shared by queries and research tasks
    pub llm_client: Arc<dyn LlmClient>,

    /// Prompt-driven LLM wrapper for the Q&A path
    pub stage_llm: StageLlm,

    /// Model identifier
    pub model: String,

    /// Resolved API key for the active provider
    pub api_key: Option<String>,

    /// Knowledge base name for uploads
    pub base_name: String,

    /// Research task registry
    pub tasks: TaskRegistry,
}

impl ServerState {
    /// Build server state from configuration and a ready LLM client.
    pub fn new(
        config: AppConfig,
        llm_client: Arc<dyn LlmClient>,
        api_key: Option<String>,
    ) -> Self {
        let stage_llm = StageLlm::new(
            Arc::clone(&llm_client),
            config.model.clone(),
            &config.workspace,
        );
        let model = config.model.clone();

        Self {
            config,
            llm_client,
            stage_llm,
            model,
            api_key,
            base_name: DEFAULT_BASE_NAME.to_string(),
            tasks: tasks::new_registry(),
        }
    }
}

/// API error payload: status code plus a JSON body.
pub type ApiError = (StatusCode, Json<Value>);

/// Result alias for JSON handlers.
pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Build an API error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Build the application router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/upload", post(handlers::handle_upload))
        .route("/query", post(handlers::handle_query))
        .route("/research", post(handlers::handle_research_create))
        .route("/research", get(handlers::handle_research_list))
        .route("/research/{id}", get(handlers::handle_research_get))
        .route("/research/{id}", delete(handlers::handle_research_delete))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(state: Arc<ServerState>, host: &str, port: u16) -> AppResult<()> {
    let addr = format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .map_err(|e| AppError::Config(format!("Invalid bind address '{}:{}': {}", host, port, e)))?;

    let router = build_router(state);

    tracing::info!("Scholar API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Other(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path as AxumPath, State};
    use scholar_llm::{LlmRequest, LlmResponse, LlmStream, LlmUsage};
    use tempfile::TempDir;

    struct EchoLlm;

    #[async_trait::async_trait]
    impl LlmClient for EchoLlm {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            Ok(LlmResponse {
                content: "mock answer".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            })
        }

        async fn stream(&self, _request: &LlmRequest) -> AppResult<LlmStream> {
            unimplemented!()
        }
    }

    fn test_state(workspace: &TempDir) -> Arc<ServerState> {
        let mut config = AppConfig::default();
        config.workspace = workspace.path().to_path_buf();
        config.pipeline.self_correction = false;

        Arc::new(ServerState::new(config, Arc::new(EchoLlm), None))
    }

    #[tokio::test]
    async fn test_health_reports_empty_index() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);

        let response = handlers::handle_health(State(state)).await;
        assert_eq!(response.0.status, "healthy");
        assert!(!response.0.index_ready);
        assert_eq!(response.0.active_tasks, 0);
    }

    #[tokio::test]
    async fn test_upload_then_query() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);

        let upload = handlers::handle_upload(
            State(Arc::clone(&state)),
            Json(handlers::UploadRequest {
                filename: "notes.txt".to_string(),
                content: "Rust ownership guarantees memory safety without garbage collection."
                    .to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(upload.0.chunks_created >= 1);

        let query = handlers::handle_query(
            State(Arc::clone(&state)),
            Json(handlers::QueryRequest {
                question: "rust ownership memory safety".to_string(),
                top_k: None,
                return_sources: Some(true),
                self_correction: Some(false),
            }),
        )
        .await
        .unwrap();

        assert_eq!(query.0.answer, "mock answer");
        assert!(query.0.sources.is_some());

        // Health flips to ready once chunks exist
        let health = handlers::handle_health(State(state)).await;
        assert!(health.0.index_ready);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_content() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);

        let result = handlers::handle_upload(
            State(state),
            Json(handlers::UploadRequest {
                filename: "empty.txt".to_string(),
                content: "   ".to_string(),
            }),
        )
        .await;

        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_before_upload_is_client_error() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);

        let result = handlers::handle_query(
            State(state),
            Json(handlers::QueryRequest {
                question: "anything".to_string(),
                top_k: None,
                return_sources: None,
                self_correction: Some(false),
            }),
        )
        .await;

        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_task_endpoints() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);

        // Unknown task is a 404
        let result = handlers::handle_research_get(
            State(Arc::clone(&state)),
            AxumPath("nope".to_string()),
        )
        .await;
        assert_eq!(result.err().unwrap().0, StatusCode::NOT_FOUND);

        // Empty list
        let list = handlers::handle_research_list(State(Arc::clone(&state))).await;
        assert_eq!(list.0.total, 0);

        // Deleting a running task is refused
        state.tasks.write().await.insert(
            "t1".to_string(),
            tasks::ResearchTask::pending("t1", "query"),
        );
        let result = handlers::handle_research_delete(
            State(Arc::clone(&state)),
            AxumPath("t1".to_string()),
        )
        .await;
        assert_eq!(result.err().unwrap().0, StatusCode::CONFLICT);

        // Finished tasks delete cleanly
        tasks::mark_failed(&state.tasks, "t1", "boom".to_string()).await;
        let result = handlers::handle_research_delete(
            State(Arc::clone(&state)),
            AxumPath("t1".to_string()),
        )
        .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_router_builds() {
        let workspace = TempDir::new().unwrap();
        let state = test_state(&workspace);
        let _router = build_router(state);
    }
}

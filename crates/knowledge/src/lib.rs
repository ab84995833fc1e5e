//! Knowledge base management for Scholar.
//!
//! Local-first RAG: documents are chunked, embedded, and stored in a SQLite
//! vector index per knowledge base under `.scholar/knowledge/<base>/`.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod memory;
pub mod parser;
pub mod retrieval;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use memory::MemoryIndex;
pub use retrieval::{RetrievedContext, SourceRef};
pub use types::{
    AskOptions, AskResult, BaseStats, KnowledgeBaseConfig, KnowledgeChunk, KnowledgeSource,
    LearnOptions, LearnStats,
};
pub use vector_index::VectorIndex;

use chrono::Utc;
use scholar_core::{AppError, AppResult};
use std::path::Path;
use std::time::Instant;
use walkdir::WalkDir;

use embeddings::EmbeddingProvider;
use index::SqliteIndex;

/// Learn from sources and populate the knowledge base.
pub async fn learn(
    workspace: &Path,
    options: LearnOptions,
    api_key: Option<&str>,
) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let base_config = config::load_config(workspace, &options.base_name)?;

    let index_path = config::get_index_path(workspace, &options.base_name);
    let mut index = SqliteIndex::open(&index_path)?;

    if options.reset {
        tracing::info!("Resetting knowledge base");
        vector_index::VectorIndex::reset(&mut index)?;
    }

    let provider = embeddings::create_provider(&base_config, api_key)?;

    let mut sources_count = 0u32;
    let mut chunks_count = 0u32;
    let mut bytes_processed = 0u64;

    for path in &options.paths {
        if path.is_file() {
            if let Ok((chunks, bytes)) =
                process_file(&mut index, provider.as_ref(), &base_config, path).await
            {
                sources_count += 1;
                chunks_count += chunks;
                bytes_processed += bytes;
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && should_include(entry_path, &options) {
                    if let Ok((chunks, bytes)) =
                        process_file(&mut index, provider.as_ref(), &base_config, entry_path).await
                    {
                        sources_count += 1;
                        chunks_count += chunks;
                        bytes_processed += bytes;
                    }
                }
            }
        }
    }

    config::save_config(workspace, &base_config)?;

    let duration = start.elapsed();

    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} bytes in {:.2}s",
        sources_count,
        chunks_count,
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(LearnStats {
        sources_count,
        chunks_count,
        bytes_processed,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Ingest a single document given as raw text (the upload path).
pub async fn learn_text(
    workspace: &Path,
    base_name: &str,
    source_name: &str,
    text: &str,
    api_key: Option<&str>,
) -> AppResult<LearnStats> {
    let start = Instant::now();

    if text.trim().is_empty() {
        return Err(AppError::Knowledge(
            "Document content cannot be empty".to_string(),
        ));
    }

    let base_config = config::load_config(workspace, base_name)?;
    let index_path = config::get_index_path(workspace, base_name);
    let mut index = SqliteIndex::open(&index_path)?;

    let provider = embeddings::create_provider(&base_config, api_key)?;

    let source_id = uuid::Uuid::new_v4().to_string();
    let source = KnowledgeSource {
        id: source_id.clone(),
        path: None,
        url: None,
        content_type: "text".to_string(),
        learned_at: Utc::now(),
        size_bytes: text.len() as u64,
    };
    index.insert_source(&source)?;

    let chunks_count = embed_and_store(
        &mut index,
        provider.as_ref(),
        &base_config,
        &source_id,
        text,
        serde_json::json!({ "source_path": source_name }),
    )
    .await?;

    config::save_config(workspace, &base_config)?;

    Ok(LearnStats {
        sources_count: 1,
        chunks_count,
        bytes_processed: text.len() as u64,
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

/// Process a single file into the index.
async fn process_file(
    index: &mut SqliteIndex,
    provider: &dyn EmbeddingProvider,
    base_config: &KnowledgeBaseConfig,
    path: &Path,
) -> AppResult<(u32, u64)> {
    tracing::debug!("Processing file: {:?}", path);

    let text = parser::parse_file(path)?;
    let size_bytes = text.len() as u64;

    let source_id = uuid::Uuid::new_v4().to_string();
    let source = KnowledgeSource {
        id: source_id.clone(),
        path: Some(path.to_path_buf()),
        url: None,
        content_type: parser::ContentType::from_path(path).as_str().to_string(),
        learned_at: Utc::now(),
        size_bytes,
    };

    index.insert_source(&source)?;

    let chunks_count = embed_and_store(
        index,
        provider,
        base_config,
        &source_id,
        &text,
        serde_json::json!({ "source_path": path.to_string_lossy() }),
    )
    .await?;

    tracing::debug!(
        "Processed {:?}: {} chunks, {} bytes",
        path,
        chunks_count,
        size_bytes
    );

    Ok((chunks_count, size_bytes))
}

/// Chunk text, embed in batches, and upsert into the index.
async fn embed_and_store(
    index: &mut SqliteIndex,
    provider: &dyn EmbeddingProvider,
    base_config: &KnowledgeBaseConfig,
    source_id: &str,
    text: &str,
    extra_metadata: serde_json::Value,
) -> AppResult<u32> {
    let candidates = chunker::chunk_text(
        source_id,
        text,
        base_config.chunk_size as usize,
        base_config.chunk_overlap as usize,
    );

    let mut chunks_count = 0u32;
    let batch_size = (base_config.batch_size as usize).max(1);

    for batch in candidates.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = provider.embed_batch(&texts).await?;

        for (candidate, embedding) in batch.iter().zip(embeddings) {
            let mut metadata = candidate.metadata.clone();
            if let (Some(meta), Some(extra)) = (metadata.as_object_mut(), extra_metadata.as_object())
            {
                for (k, v) in extra {
                    meta.insert(k.clone(), v.clone());
                }
            }

            let chunk = KnowledgeChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source_id: candidate.source_id.clone(),
                position: candidate.position,
                text: candidate.text.clone(),
                embedding: Some(embedding),
                metadata,
            };

            index.upsert_chunk(&chunk)?;
            chunks_count += 1;
        }
    }

    Ok(chunks_count)
}

/// Check if a file should be included based on patterns.
fn should_include(path: &Path, options: &LearnOptions) -> bool {
    let path_str = path.to_string_lossy();

    // Excludes win over includes
    for pattern in &options.exclude {
        if path_str.contains(pattern) {
            return false;
        }
    }

    if !options.include.is_empty() {
        return options.include.iter().any(|p| path_str.contains(p));
    }

    true
}

/// Query the knowledge base and return relevant chunks.
pub async fn ask(
    workspace: &Path,
    options: AskOptions,
    api_key: Option<&str>,
) -> AppResult<AskResult> {
    tracing::info!(
        "Querying knowledge base '{}' with query: {}",
        options.base_name,
        options.query
    );

    let base_config = config::load_config(workspace, &options.base_name)?;

    let index_path = config::get_index_path(workspace, &options.base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' has no index. Run 'scholar knowledge learn' first.",
            options.base_name
        )));
    }

    let index = SqliteIndex::open(&index_path)?;
    let provider = embeddings::create_provider(&base_config, api_key)?;

    let retrieved = retrieval::retrieve(
        &index,
        provider.as_ref(),
        &options.query,
        options.top_k as usize,
    )
    .await?;

    Ok(AskResult {
        chunks: retrieved.chunks,
        scores: retrieved.scores,
    })
}

/// Retrieve context (chunks plus assembled prompt block) for a query.
pub async fn retrieve_context(
    workspace: &Path,
    base_name: &str,
    query: &str,
    top_k: u32,
    api_key: Option<&str>,
) -> AppResult<RetrievedContext> {
    let base_config = config::load_config(workspace, base_name)?;

    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' has no index. Run 'scholar knowledge learn' first.",
            base_name
        )));
    }

    let index = SqliteIndex::open(&index_path)?;
    let provider = embeddings::create_provider(&base_config, api_key)?;

    retrieval::retrieve(&index, provider.as_ref(), query, top_k as usize).await
}

/// Clean (reset) a knowledge base.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let mut index = SqliteIndex::open(&index_path)?;
    vector_index::VectorIndex::reset(&mut index)?;

    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}

/// Get statistics for a knowledge base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let index = SqliteIndex::open(&index_path)?;
    let (sources_count, chunks_count) = vector_index::VectorIndex::stats(&index)?;

    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(BaseStats {
        base_name: base_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_learn_and_ask_round_trip() {
        let workspace = TempDir::new().unwrap();
        let docs = workspace.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();

        let mut file = std::fs::File::create(docs.join("rust.txt")).unwrap();
        writeln!(
            file,
            "Rust is a systems programming language focused on safety and performance. \
             Ownership and borrowing prevent data races at compile time."
        )
        .unwrap();

        let stats = learn(
            workspace.path(),
            LearnOptions {
                base_name: "test".to_string(),
                paths: vec![docs],
                include: vec![],
                exclude: vec![],
                reset: false,
            },
            None,
        )
        .await
        .unwrap();

        assert_eq!(stats.sources_count, 1);
        assert!(stats.chunks_count >= 1);

        let result = ask(
            workspace.path(),
            AskOptions {
                base_name: "test".to_string(),
                query: "ownership borrowing safety".to_string(),
                top_k: 3,
            },
            None,
        )
        .await
        .unwrap();

        assert!(!result.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_learn_text_upload_path() {
        let workspace = TempDir::new().unwrap();

        let stats = learn_text(
            workspace.path(),
            "uploads",
            "report.pdf",
            "Quarterly revenue grew twelve percent driven by subscription renewals.",
            None,
        )
        .await
        .unwrap();

        assert_eq!(stats.sources_count, 1);
        assert!(stats.chunks_count >= 1);

        let base_stats = super::stats(workspace.path(), "uploads").unwrap();
        assert_eq!(base_stats.sources_count, 1);
    }

    #[tokio::test]
    async fn test_learn_text_rejects_empty() {
        let workspace = TempDir::new().unwrap();
        let result = learn_text(workspace.path(), "uploads", "empty.txt", "   ", None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ask_unknown_base() {
        let workspace = TempDir::new().unwrap();
        let result = ask(
            workspace.path(),
            AskOptions {
                base_name: "missing".to_string(),
                query: "anything".to_string(),
                top_k: 3,
            },
            None,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_should_include_patterns() {
        let options = LearnOptions {
            base_name: "b".to_string(),
            paths: vec![],
            include: vec![".md".to_string()],
            exclude: vec!["draft".to_string()],
            reset: false,
        };

        assert!(should_include(Path::new("notes/a.md"), &options));
        assert!(!should_include(Path::new("notes/a.txt"), &options));
        assert!(!should_include(Path::new("notes/draft.md"), &options));
    }
}

//! Knowledge command handler.
//!
//! Handles local RAG knowledge base management.

use clap::{Args, Subcommand};
use scholar_core::{config::AppConfig, AppResult};
use scholar_knowledge::LearnOptions;
use std::path::PathBuf;

/// Knowledge base management (local RAG)
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Learn from local files and directories
    Learn(KnowledgeLearnCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// Remove all sources and chunks from a base
    Reset(KnowledgeResetCommand),
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Learn(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
            KnowledgeAction::Reset(cmd) => cmd.execute(config).await,
        }
    }
}

/// Learn from sources
#[derive(Args, Debug)]
pub struct KnowledgeLearnCommand {
    /// Knowledge base name
    pub base: String,

    /// Paths to learn from
    #[arg(long)]
    pub path: Vec<PathBuf>,

    /// Include patterns (substring match)
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude patterns (substring match)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Reset base before learning
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeLearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge learn command for base '{}'", self.base);

        let options = LearnOptions {
            base_name: self.base.clone(),
            paths: self.path.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
        };

        let api_key = config.resolve_api_key(&config.provider)?;

        let stats =
            scholar_knowledge::learn(&config.workspace, options, api_key.as_deref()).await?;

        if self.json {
            let output = serde_json::json!({
                "base": self.base,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Learned {} sources ({} chunks, {} bytes) in {:.2}s",
                stats.sources_count, stats.chunks_count, stats.bytes_processed, stats.duration_secs
            );
        }

        Ok(())
    }
}

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let stats = scholar_knowledge::stats(&config.workspace, &self.base)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks:  {}", stats.chunks_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
        }

        Ok(())
    }
}

/// Reset a knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeResetCommand {
    /// Knowledge base name
    pub base: String,
}

impl KnowledgeResetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        scholar_knowledge::clean(&config.workspace, &self.base)?;
        println!("Knowledge base '{}' reset", self.base);
        Ok(())
    }
}

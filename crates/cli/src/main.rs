//! Scholar CLI
//!
//! Main entry point for the scholar command-line tool.
//! Research synthesis over arXiv plus local document Q&A with RAG.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, KnowledgeCommand, ResearchCommand, ServeCommand, StatsCommand};
use scholar_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Scholar CLI - research synthesis and document Q&A with RAG
#[derive(Parser, Debug)]
#[command(name = "scholar")]
#[command(about = "Multi-agent research synthesis and document Q&A", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SCHOLAR_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SCHOLAR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, claude, ollama)
    #[arg(short, long, global = true, env = "SCHOLAR_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SCHOLAR_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the research synthesis workflow
    Research(ResearchCommand),

    /// Ask a question against a knowledge base
    Ask(AskCommand),

    /// Knowledge base management (local RAG)
    Knowledge(KnowledgeCommand),

    /// Run the HTTP API server
    Serve(ServeCommand),

    /// Show evaluation metrics over saved run reports
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from environment
    let config = AppConfig::load()?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Scholar CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .scholar directory exists
    config.ensure_scholar_dir()?;

    let command_name = match &cli.command {
        Commands::Research(_) => "research",
        Commands::Ask(_) => "ask",
        Commands::Knowledge(_) => "knowledge",
        Commands::Serve(_) => "serve",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Research(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

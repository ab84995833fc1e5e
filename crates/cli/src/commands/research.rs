//! Research command handler.
//!
//! Runs the six-stage synthesis workflow in single-query, interactive, or
//! batch mode, mirroring the service's behavior from the terminal.

use super::make_llm_client;
use clap::Args;
use scholar_core::{config::AppConfig, AppError, AppResult};
use scholar_pipeline::report::{save_batch_summary, save_report, BatchSummary};
use scholar_pipeline::{ResearchWorkflow, RunReport, WorkflowState};
use std::io::Write;
use std::path::PathBuf;

/// Run the research synthesis workflow
#[derive(Args, Debug)]
pub struct ResearchCommand {
    /// Research query to process
    #[arg(short, long)]
    pub query: Option<String>,

    /// Interactive mode: read queries from stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Batch mode: process one query per line from a file
    #[arg(short, long, conflicts_with_all = ["query", "interactive"])]
    pub batch: Option<PathBuf>,

    /// Maximum critic/reflector iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,

    /// Output file (single query) or directory (batch)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResearchCommand {
    /// Execute the research command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing research command");

        let client = make_llm_client(config)?;
        let workflow =
            ResearchWorkflow::new(client, &config.model, &config.workspace, &config.pipeline);

        if let Some(ref query) = self.query {
            self.run_single(config, &workflow, query).await
        } else if let Some(ref batch_file) = self.batch {
            self.run_batch(config, &workflow, batch_file).await
        } else {
            // Interactive is the default when nothing else was requested
            self.run_interactive(config, &workflow).await
        }
    }

    /// Process one query and save its report.
    async fn run_single(
        &self,
        config: &AppConfig,
        workflow: &ResearchWorkflow,
        query: &str,
    ) -> AppResult<()> {
        let state = workflow.run(query, self.iterations).await?;
        let report = RunReport::from_state(&state);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_results(&state);
        }

        let saved = match self.output {
            Some(ref path) => {
                let dir = path.parent().unwrap_or(std::path::Path::new("."));
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| AppError::Config(format!("Invalid output path: {:?}", path)))?;
                save_report(&report, dir, Some(filename))?
            }
            None => save_report(&report, &config.reports_dir(), None)?,
        };

        if !self.json {
            println!("Results saved to: {}", saved.display());
        }

        Ok(())
    }

    /// Process queries from a file, one per line.
    async fn run_batch(
        &self,
        config: &AppConfig,
        workflow: &ResearchWorkflow,
        batch_file: &PathBuf,
    ) -> AppResult<()> {
        let contents = std::fs::read_to_string(batch_file).map_err(|e| {
            AppError::Config(format!("Failed to read batch file {:?}: {}", batch_file, e))
        })?;

        let queries: Vec<&str> = contents
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        if queries.is_empty() {
            return Err(AppError::Config("No queries found in batch file".to_string()));
        }

        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| config.reports_dir());

        println!("Processing {} queries from {:?}", queries.len(), batch_file);

        let mut reports = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            println!("\n[{}/{}] {}", i + 1, queries.len(), query);

            match workflow.run(query, self.iterations).await {
                Ok(state) => {
                    let report = RunReport::from_state(&state);
                    let filename = format!("result_{:03}.json", i + 1);
                    save_report(&report, &output_dir, Some(&filename))?;
                    println!(
                        "  quality: {:.1}/10, iterations: {}",
                        report.quality_score, report.iterations
                    );
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!("Query {} failed: {}", i + 1, e);
                    println!("  failed: {}", e);
                }
            }
        }

        let summary = BatchSummary::new(queries.len(), &reports);
        save_batch_summary(&summary, &output_dir)?;

        println!(
            "\nBatch complete: {}/{} succeeded, average quality {:.2}/10",
            summary.successful, summary.total_queries, summary.average_quality
        );
        println!("Results saved to: {}", output_dir.display());

        Ok(())
    }

    /// Read queries from stdin until quit.
    async fn run_interactive(
        &self,
        config: &AppConfig,
        workflow: &ResearchWorkflow,
    ) -> AppResult<()> {
        println!("Interactive mode - type 'quit' to exit\n");

        loop {
            print!("Enter research query: ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }

            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if matches!(query.to_lowercase().as_str(), "quit" | "exit" | "q") {
                break;
            }

            match workflow.run(query, self.iterations).await {
                Ok(state) => {
                    print_results(&state);
                    let report = RunReport::from_state(&state);
                    let saved = save_report(&report, &config.reports_dir(), None)?;
                    println!("Results saved to: {}\n", saved.display());
                }
                Err(e) => println!("Error: {}\n", e),
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}

/// Print a human-readable run summary to stdout.
fn print_results(state: &WorkflowState) {
    println!("\n{}", "=".repeat(78));
    println!("RESEARCH SYNTHESIS RESULTS");
    println!("{}", "=".repeat(78));
    println!("\nQuery: {}", state.query);
    println!("Quality score: {:.1}/10", state.quality_score);
    println!("Iterations: {}", state.iteration);
    println!("Papers analyzed: {}", state.papers.len());

    println!("\n{}", "-".repeat(78));
    println!("FINAL SYNTHESIS");
    println!("{}", "-".repeat(78));
    println!("{}", state.final_output);

    if !state.papers.is_empty() {
        println!("\n{}", "-".repeat(78));
        println!("PAPERS REFERENCED");
        println!("{}", "-".repeat(78));
        for (i, paper) in state.papers.iter().take(5).enumerate() {
            println!("\n{}. {}", i + 1, paper.title);
            let authors: Vec<&str> = paper.authors.iter().take(3).map(|s| s.as_str()).collect();
            println!("   Authors: {}", authors.join(", "));
            println!("   Published: {}", paper.published);
            println!("   URL: {}", paper.url);
        }
    }

    println!("\n{}\n", "=".repeat(78));
}

//! Stats command handler.
//!
//! Aggregates evaluation metrics over saved run reports.

use clap::Args;
use scholar_core::{config::AppConfig, AppResult};
use scholar_pipeline::metrics::EvaluationMetrics;
use scholar_pipeline::report::load_reports;
use std::path::PathBuf;

/// Show evaluation metrics over saved run reports
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Report directory (default: .scholar/reports)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    /// Execute the stats command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let dir = self.dir.clone().unwrap_or_else(|| config.reports_dir());

        let reports = load_reports(&dir)?;

        let mut metrics = EvaluationMetrics::new();
        for report in reports {
            metrics.add_result(report);
        }

        if self.json {
            match metrics.calculate() {
                Some(quality) => println!("{}", serde_json::to_string_pretty(&quality)?),
                None => println!("{}", serde_json::json!({ "totalQueries": 0 })),
            }
        } else {
            print!("{}", metrics.render_report());
        }

        Ok(())
    }
}

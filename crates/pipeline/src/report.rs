//! Run report persistence.
//!
//! Reports are JSON blobs in a flat directory; batch runs add a summary file.

use crate::state::RunReport;
use chrono::Utc;
use scholar_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_queries: usize,
    pub successful: usize,
    pub failed: usize,
    pub average_quality: f32,
    pub timestamp: chrono::DateTime<Utc>,
}

impl BatchSummary {
    /// Build a summary from completed reports and the attempted count.
    pub fn new(total_queries: usize, reports: &[RunReport]) -> Self {
        let average_quality = if reports.is_empty() {
            0.0
        } else {
            reports.iter().map(|r| r.quality_score).sum::<f32>() / reports.len() as f32
        };

        Self {
            total_queries,
            successful: reports.len(),
            failed: total_queries.saturating_sub(reports.len()),
            average_quality,
            timestamp: Utc::now(),
        }
    }
}

/// Save a run report, generating a timestamped filename when none is given.
pub fn save_report(
    report: &RunReport,
    dir: &Path,
    filename: Option<&str>,
) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::Pipeline(format!("Failed to create report directory: {}", e)))?;

    let filename = match filename {
        Some(name) => name.to_string(),
        None => format!(
            "research_synthesis_{}.json",
            report.timestamp.format("%Y%m%d_%H%M%S")
        ),
    };

    let path = dir.join(filename);

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::Serialization(e.to_string()))?;

    std::fs::write(&path, json)
        .map_err(|e| AppError::Pipeline(format!("Failed to write report {:?}: {}", path, e)))?;

    tracing::info!("Saved run report to {:?}", path);

    Ok(path)
}

/// Save a batch summary next to its result files.
pub fn save_batch_summary(summary: &BatchSummary, dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::Pipeline(format!("Failed to create report directory: {}", e)))?;

    let path = dir.join("batch_summary.json");

    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| AppError::Serialization(e.to_string()))?;

    std::fs::write(&path, json)
        .map_err(|e| AppError::Pipeline(format!("Failed to write summary {:?}: {}", path, e)))?;

    Ok(path)
}

/// Load all run reports from a directory, skipping unparseable files.
pub fn load_reports(dir: &Path) -> AppResult<Vec<RunReport>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();

    for entry in std::fs::read_dir(dir)
        .map_err(|e| AppError::Pipeline(format!("Failed to read {:?}: {}", dir, e)))?
        .flatten()
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some("batch_summary.json") {
            continue;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping unreadable report {:?}: {}", path, e);
                continue;
            }
        };

        match serde_json::from_str::<RunReport>(&content) {
            Ok(report) => reports.push(report),
            Err(e) => tracing::warn!("Skipping unparseable report {:?}: {}", path, e),
        }
    }

    // Oldest first
    reports.sort_by_key(|r| r.timestamp);

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorkflowState;
    use tempfile::TempDir;

    fn report(query: &str, score: f32) -> RunReport {
        let mut state = WorkflowState::new(query, 2);
        state.quality_score = score;
        state.final_output = "synthesis".to_string();
        RunReport::from_state(&state)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();

        save_report(&report("q1", 7.0), dir.path(), Some("result_001.json")).unwrap();
        save_report(&report("q2", 8.0), dir.path(), Some("result_002.json")).unwrap();

        let reports = load_reports(dir.path()).unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_timestamped_filename() {
        let dir = TempDir::new().unwrap();
        let path = save_report(&report("q", 5.0), dir.path(), None).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("research_synthesis_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_load_skips_garbage_and_summary() {
        let dir = TempDir::new().unwrap();

        save_report(&report("q", 5.0), dir.path(), Some("result_001.json")).unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let summary = BatchSummary::new(1, &[report("q", 5.0)]);
        save_batch_summary(&summary, dir.path()).unwrap();

        let reports = load_reports(dir.path()).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_batch_summary_counts() {
        let reports = vec![report("a", 6.0), report("b", 8.0)];
        let summary = BatchSummary::new(3, &reports);

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.average_quality - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let reports = load_reports(&missing).unwrap();
        assert!(reports.is_empty());
    }
}

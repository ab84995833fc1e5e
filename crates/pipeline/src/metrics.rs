//! Evaluation metrics over persisted run reports.
//!
//! Aggregates quality scores, iteration usage, and paper counts across runs
//! into a text report and a JSON payload.

use crate::state::RunReport;
use serde::{Deserialize, Serialize};

/// High-quality bar for the rate metrics.
const HIGH_QUALITY_SCORE: f32 = 8.0;

/// Low-quality bar for the rate metrics.
const LOW_QUALITY_SCORE: f32 = 6.0;

/// Aggregated quality metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_queries: usize,
    pub avg_quality_score: f32,
    pub std_quality_score: f32,
    pub min_quality_score: f32,
    pub max_quality_score: f32,
    pub avg_iterations: f32,
    pub avg_papers_analyzed: f32,
    /// Share of runs scoring at or above 8.0
    pub high_quality_rate: f32,
    /// Share of runs scoring under 6.0
    pub low_quality_rate: f32,
    /// Share of runs that used at least one reflection
    pub reflection_usage_rate: f32,
}

/// Accumulates run reports and computes metrics.
#[derive(Default)]
pub struct EvaluationMetrics {
    results: Vec<RunReport>,
}

impl EvaluationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a run report for evaluation.
    pub fn add_result(&mut self, report: RunReport) {
        self.results.push(report);
    }

    /// Number of collected reports.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no reports were collected.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Calculate quality metrics across all results.
    pub fn calculate(&self) -> Option<QualityMetrics> {
        if self.results.is_empty() {
            return None;
        }

        let scores: Vec<f32> = self.results.iter().map(|r| r.quality_score).collect();
        let iterations: Vec<f32> = self.results.iter().map(|r| r.iterations as f32).collect();
        let papers: Vec<f32> = self
            .results
            .iter()
            .map(|r| r.papers_analyzed as f32)
            .collect();

        let n = scores.len() as f32;
        let avg = mean(&scores);

        let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f32>() / n;

        let high = scores.iter().filter(|s| **s >= HIGH_QUALITY_SCORE).count() as f32 / n;
        let low = scores.iter().filter(|s| **s < LOW_QUALITY_SCORE).count() as f32 / n;
        let reflected = self.results.iter().filter(|r| r.iterations > 0).count() as f32 / n;

        Some(QualityMetrics {
            total_queries: self.results.len(),
            avg_quality_score: avg,
            std_quality_score: variance.sqrt(),
            min_quality_score: scores.iter().copied().fold(f32::INFINITY, f32::min),
            max_quality_score: scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            avg_iterations: mean(&iterations),
            avg_papers_analyzed: mean(&papers),
            high_quality_rate: high,
            low_quality_rate: low,
            reflection_usage_rate: reflected,
        })
    }

    /// Render a human-readable evaluation report.
    pub fn render_report(&self) -> String {
        let Some(metrics) = self.calculate() else {
            return "No run reports collected.\n".to_string();
        };

        let mut report = String::new();
        report.push_str("EVALUATION REPORT\n");
        report.push_str("=================\n\n");
        report.push_str("Quality metrics\n");
        report.push_str("---------------\n");
        report.push_str(&format!(
            "Total queries processed:   {}\n",
            metrics.total_queries
        ));
        report.push_str(&format!(
            "Average quality score:     {:.2}/10\n",
            metrics.avg_quality_score
        ));
        report.push_str(&format!(
            "Quality score std dev:     {:.2}\n",
            metrics.std_quality_score
        ));
        report.push_str(&format!(
            "Min/Max quality score:     {:.1} / {:.1}\n",
            metrics.min_quality_score, metrics.max_quality_score
        ));
        report.push_str(&format!(
            "High quality rate (>=8.0): {:.1}%\n",
            metrics.high_quality_rate * 100.0
        ));
        report.push_str(&format!(
            "Low quality rate (<6.0):   {:.1}%\n\n",
            metrics.low_quality_rate * 100.0
        ));
        report.push_str("Analysis metrics\n");
        report.push_str("----------------\n");
        report.push_str(&format!(
            "Avg papers analyzed:       {:.1}\n",
            metrics.avg_papers_analyzed
        ));
        report.push_str(&format!(
            "Avg reflection iterations: {:.1}\n",
            metrics.avg_iterations
        ));
        report.push_str(&format!(
            "Reflection usage rate:     {:.1}%\n\n",
            metrics.reflection_usage_rate * 100.0
        ));

        report.push_str(interpret(metrics.avg_quality_score));
        report.push('\n');

        report
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// One-line interpretation of the average score.
fn interpret(avg: f32) -> &'static str {
    if avg >= 8.0 {
        "Assessment: system consistently produces high-quality synthesis."
    } else if avg >= 7.0 {
        "Assessment: system meets the quality threshold with room for improvement."
    } else if avg >= 6.0 {
        "Assessment: system needs optimization."
    } else {
        "Assessment: system requires significant improvements."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::WorkflowState;

    fn report(score: f32, iterations: u32, papers: usize) -> RunReport {
        let mut state = WorkflowState::new("q", 2);
        state.quality_score = score;
        state.iteration = iterations;
        state.papers = (0..papers)
            .map(|i| crate::state::Paper {
                id: format!("p{}", i),
                title: format!("Paper {}", i),
                authors: vec![],
                abstract_text: String::new(),
                published: String::new(),
                url: String::new(),
                pdf_url: None,
            })
            .collect();
        RunReport::from_state(&state)
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = EvaluationMetrics::new();
        assert!(metrics.calculate().is_none());
        assert!(metrics.render_report().contains("No run reports"));
    }

    #[test]
    fn test_averages() {
        let mut metrics = EvaluationMetrics::new();
        metrics.add_result(report(6.0, 0, 4));
        metrics.add_result(report(8.0, 2, 6));

        let m = metrics.calculate().unwrap();
        assert_eq!(m.total_queries, 2);
        assert!((m.avg_quality_score - 7.0).abs() < 1e-5);
        assert!((m.avg_iterations - 1.0).abs() < 1e-5);
        assert!((m.avg_papers_analyzed - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_rates() {
        let mut metrics = EvaluationMetrics::new();
        metrics.add_result(report(9.0, 1, 1));
        metrics.add_result(report(5.0, 0, 1));
        metrics.add_result(report(7.0, 2, 1));
        metrics.add_result(report(8.0, 0, 1));

        let m = metrics.calculate().unwrap();
        assert!((m.high_quality_rate - 0.5).abs() < 1e-5);
        assert!((m.low_quality_rate - 0.25).abs() < 1e-5);
        assert!((m.reflection_usage_rate - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_min_max_and_std() {
        let mut metrics = EvaluationMetrics::new();
        metrics.add_result(report(4.0, 0, 1));
        metrics.add_result(report(8.0, 0, 1));

        let m = metrics.calculate().unwrap();
        assert_eq!(m.min_quality_score, 4.0);
        assert_eq!(m.max_quality_score, 8.0);
        assert!((m.std_quality_score - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_render_report_text() {
        let mut metrics = EvaluationMetrics::new();
        metrics.add_result(report(8.5, 1, 5));

        let text = metrics.render_report();
        assert!(text.contains("Total queries processed:   1"));
        assert!(text.contains("high-quality synthesis"));
    }
}

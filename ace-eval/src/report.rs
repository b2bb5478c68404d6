//! Machine-readable report plus terminal-bound summary for a regression
//! run (spec.md §4.9: "the harness emits a machine-readable report and a
//! terminal-bound summary; a CI gate consumes the recommendation").
//! Grounded on the teacher's `eval::report::EvaluationReport`
//! JSON-plus-Markdown-summary shape, trimmed to the literal aggregate
//! `{ total, passed, failed, avg_faithfulness, avg_coverage,
//! recommendation }` spec.md names.

use crate::runner::RegressionSummary;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct CaseReportEntry {
    pub id: String,
    pub category: String,
    pub passed: bool,
    pub faithfulness: f64,
    pub coverage: f64,
    pub accuracy: Option<f64>,
    pub failure_reasons: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegressionReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub avg_faithfulness: f64,
    pub avg_coverage: f64,
    pub recommendation: &'static str,
    pub cases: Vec<CaseReportEntry>,
}

impl From<&RegressionSummary> for RegressionReport {
    fn from(summary: &RegressionSummary) -> Self {
        RegressionReport {
            total: summary.total,
            passed: summary.passed,
            failed: summary.failed,
            avg_faithfulness: summary.avg_faithfulness,
            avg_coverage: summary.avg_coverage,
            recommendation: summary.recommendation.as_str(),
            cases: summary
                .cases
                .iter()
                .map(|c| CaseReportEntry {
                    id: c.id.clone(),
                    category: c.category.clone(),
                    passed: c.passed,
                    faithfulness: c.faithfulness,
                    coverage: c.coverage,
                    accuracy: c.accuracy,
                    failure_reasons: c.failure_reasons.clone(),
                })
                .collect(),
        }
    }
}

/// Writes the full regression report as JSON to `path`, creating parent
/// directories as needed.
pub fn write_json(summary: &RegressionSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let report = RegressionReport::from(summary);
    let json = serde_json::to_string_pretty(&report).context("serializing regression report")?;
    std::fs::write(path, json).with_context(|| format!("writing regression report to {}", path.display()))
}

/// Prints the terminal-bound summary a CI gate's human operator reads
/// alongside the machine-readable JSON.
pub fn print_summary(summary: &RegressionSummary) {
    println!(
        "[ace-eval] {}/{} passed, avg_faithfulness={:.3} avg_coverage={:.3} -> {}",
        summary.passed,
        summary.total,
        summary.avg_faithfulness,
        summary.avg_coverage,
        summary.recommendation.as_str()
    );
    for case in &summary.cases {
        if !case.passed {
            println!(
                "  FAIL {} [{}] faithfulness={:.2} coverage={:.2}: {}",
                case.id,
                case.category,
                case.faithfulness,
                case.coverage,
                case.failure_reasons.join("; ")
            );
        }
    }
}

//! Regression runner (spec.md §4.9): drives each golden test case
//! through the inference workflow, scores it, and aggregates a
//! pass/fail recommendation. Grounded on the teacher's
//! `evaluations::pipeline::stages` sequential-stage-driver shape, run
//! one dataset case at a time rather than concurrently so the harness
//! never over-saturates the LM backend it is judging against.

use crate::dataset::{GoldenDataset, TestCase};
use crate::scorers::{score_answer_accuracy, score_evidence_coverage, score_faithfulness};
use common::error::AceResult;
use inference::InferenceWorkflow;
use prompt_registry::PromptRegistry;
use tracing::{info, warn};

/// Thresholds applied when a test case doesn't declare its own.
#[derive(Debug, Clone, Copy)]
pub struct DefaultThresholds {
    pub faithfulness: f64,
    pub coverage: f64,
}

/// Outcome of running a single golden test case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub id: String,
    pub category: String,
    pub passed: bool,
    pub faithfulness: f64,
    pub coverage: f64,
    pub accuracy: Option<f64>,
    pub failure_reasons: Vec<String>,
}

/// Aggregate result of a full regression run (spec.md §4.9).
#[derive(Debug, Clone)]
pub struct RegressionSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub avg_faithfulness: f64,
    pub avg_coverage: f64,
    pub recommendation: Recommendation,
    pub cases: Vec<CaseResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Pass,
    Fail,
    ReviewRequired,
}

impl Recommendation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::ReviewRequired => "REVIEW_REQUIRED",
        }
    }
}

fn check_substrings(text: &str, must_include: &[String], must_not_include: &[String]) -> Vec<String> {
    let mut reasons = Vec::new();
    let lower = text.to_lowercase();
    for needle in must_include {
        if !lower.contains(&needle.to_lowercase()) {
            reasons.push(format!("missing required phrase: {needle}"));
        }
    }
    for needle in must_not_include {
        if lower.contains(&needle.to_lowercase()) {
            reasons.push(format!("contains forbidden phrase: {needle}"));
        }
    }
    reasons
}

async fn run_case(
    workflow: &InferenceWorkflow,
    prompts: &PromptRegistry,
    case: &TestCase,
    defaults: DefaultThresholds,
) -> AceResult<CaseResult> {
    let response = workflow.run(&case.query).await?;
    let lm = workflow.lm();

    let faithfulness = score_faithfulness(lm, prompts, &response.response, &response.retrieved_context_summary).await?;
    let coverage = score_evidence_coverage(lm, prompts, &response.response, &response.retrieved_context_summary).await?;

    let accuracy = if let Some(expected) = &case.expected {
        Some(score_answer_accuracy(lm, prompts, &response.response, expected).await?.score)
    } else {
        None
    };

    let faithfulness_threshold = case
        .thresholds
        .as_ref()
        .and_then(|t| t.faithfulness)
        .unwrap_or(defaults.faithfulness);
    let coverage_threshold = case
        .thresholds
        .as_ref()
        .and_then(|t| t.coverage)
        .unwrap_or(defaults.coverage);

    let mut failure_reasons = check_substrings(&response.response, &case.must_include, &case.must_not_include);

    if !response.success {
        failure_reasons.push("workflow did not converge to a valid answer".to_string());
    }
    if faithfulness.score < faithfulness_threshold {
        failure_reasons.push(format!(
            "faithfulness {:.2} below threshold {:.2}",
            faithfulness.score, faithfulness_threshold
        ));
    }
    if coverage.score < coverage_threshold {
        failure_reasons.push(format!(
            "coverage {:.2} below threshold {:.2}",
            coverage.score, coverage_threshold
        ));
    }

    Ok(CaseResult {
        id: case.id.clone(),
        category: case.category.clone(),
        passed: failure_reasons.is_empty(),
        faithfulness: faithfulness.score,
        coverage: coverage.score,
        accuracy,
        failure_reasons,
    })
}

/// Runs every case in `dataset` sequentially and aggregates the result.
pub async fn run_regression(
    workflow: &InferenceWorkflow,
    prompts: &PromptRegistry,
    dataset: &GoldenDataset,
    defaults: DefaultThresholds,
) -> AceResult<RegressionSummary> {
    let mut cases = Vec::with_capacity(dataset.test_cases.len());

    for case in &dataset.test_cases {
        let result = run_case(workflow, prompts, case, defaults).await?;
        if result.passed {
            info!(case = %result.id, "case passed");
        } else {
            warn!(case = %result.id, reasons = ?result.failure_reasons, "case failed");
        }
        cases.push(result);
    }

    Ok(aggregate(cases))
}

/// Pure rollup of per-case results into the final report (spec.md §4.9:
/// `PASS` iff zero failures and avg faithfulness ≥ 0.97; `FAIL` if avg
/// faithfulness < 0.95 or failure rate > 20%; else `REVIEW_REQUIRED`).
#[must_use]
fn aggregate(cases: Vec<CaseResult>) -> RegressionSummary {
    let total = cases.len();
    let passed = cases.iter().filter(|c| c.passed).count();
    let failed = total - passed;

    #[allow(clippy::cast_precision_loss)]
    let avg_faithfulness = if total == 0 {
        0.0
    } else {
        cases.iter().map(|c| c.faithfulness).sum::<f64>() / total as f64
    };
    #[allow(clippy::cast_precision_loss)]
    let avg_coverage = if total == 0 {
        0.0
    } else {
        cases.iter().map(|c| c.coverage).sum::<f64>() / total as f64
    };

    #[allow(clippy::cast_precision_loss)]
    let failure_rate = if total == 0 { 0.0 } else { failed as f64 / total as f64 };

    let recommendation = if failed == 0 && avg_faithfulness >= 0.97 {
        Recommendation::Pass
    } else if avg_faithfulness < 0.95 || failure_rate > 0.20 {
        Recommendation::Fail
    } else {
        Recommendation::ReviewRequired
    };

    RegressionSummary {
        total,
        passed,
        failed,
        avg_faithfulness,
        avg_coverage,
        recommendation,
        cases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, passed: bool, faithfulness: f64) -> CaseResult {
        CaseResult {
            id: id.to_string(),
            category: "test".to_string(),
            passed,
            faithfulness,
            coverage: 0.9,
            accuracy: None,
            failure_reasons: if passed { Vec::new() } else { vec!["failed".to_string()] },
        }
    }

    #[test]
    fn pass_requires_zero_failures_and_high_faithfulness() {
        let summary = aggregate(vec![case("s1", true, 0.99), case("s2", true, 0.98)]);
        assert_eq!(summary.recommendation, Recommendation::Pass);
    }

    #[test]
    fn high_failure_rate_forces_fail_even_with_good_faithfulness() {
        // 2 of 5 cases fail: a 40% failure rate exceeds the 20% ceiling.
        let summary = aggregate(vec![
            case("s1", false, 0.99),
            case("s2", false, 0.99),
            case("s3", true, 0.99),
            case("s4", true, 0.99),
            case("s5", true, 0.99),
        ]);
        assert_eq!(summary.recommendation, Recommendation::Fail);
    }

    #[test]
    fn low_avg_faithfulness_forces_fail() {
        let summary = aggregate(vec![case("s1", true, 0.5), case("s2", true, 0.5)]);
        assert_eq!(summary.recommendation, Recommendation::Fail);
    }

    #[test]
    fn one_failure_with_good_faithfulness_is_review_required() {
        let summary = aggregate(vec![
            case("s1", false, 0.99),
            case("s2", true, 0.99),
            case("s3", true, 0.99),
            case("s4", true, 0.99),
        ]);
        assert_eq!(summary.recommendation, Recommendation::ReviewRequired);
    }
}

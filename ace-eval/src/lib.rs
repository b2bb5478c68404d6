//! Evaluation Harness (C9): faithfulness, evidence-coverage, and
//! answer-accuracy scorers plus a regression runner against a versioned
//! golden dataset. Grounded throughout on the teacher's `evaluations`
//! crate (`datasets`, `pipeline::stages`, `report` shape) generalized
//! from retrieval-precision scoring into LLM-judge faithfulness/coverage
//! scoring against the inference workflow.

pub mod dataset;
pub mod report;
pub mod runner;
pub mod scorers;

pub use dataset::{CaseThresholds, GoldenDataset, TestCase};
pub use runner::{run_regression, CaseResult, DefaultThresholds, Recommendation, RegressionSummary};

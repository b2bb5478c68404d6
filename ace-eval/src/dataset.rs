//! Golden dataset loading (spec.md §4.9/§6): `{version, description,
//! total_tests, test_cases}`, grounded on the teacher's
//! `corpus::CorpusManifest` JSON-manifest loading.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CaseThresholds {
    pub faithfulness: Option<f64>,
    pub coverage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub category: String,
    pub query: String,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default, rename = "mustInclude")]
    pub must_include: Vec<String>,
    #[serde(default, rename = "mustNotInclude")]
    pub must_not_include: Vec<String>,
    #[serde(default)]
    pub thresholds: Option<CaseThresholds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoldenDataset {
    pub version: String,
    pub description: String,
    pub total_tests: usize,
    pub test_cases: Vec<TestCase>,
}

impl GoldenDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading golden dataset {}", path.display()))?;
        let dataset: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing golden dataset {}", path.display()))?;
        if dataset.test_cases.len() != dataset.total_tests {
            bail!(
                "golden dataset {} declares total_tests={} but contains {} test_cases",
                path.display(),
                dataset.total_tests,
                dataset.test_cases.len()
            );
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_dataset(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("ace-eval-dataset-test-{}.json", std::process::id()));
        std::fs::write(&path, contents).expect("write temp dataset");
        path
    }

    #[test]
    fn loads_a_well_formed_dataset() {
        let path = write_temp_dataset(
            r#"{
                "version": "1.0.0",
                "description": "smoke test",
                "total_tests": 1,
                "test_cases": [
                    { "id": "s1", "category": "faction", "query": "who controls the mines?" }
                ]
            }"#,
        );

        let dataset = GoldenDataset::load(&path).unwrap();
        assert_eq!(dataset.test_cases.len(), 1);
        assert_eq!(dataset.test_cases[0].id, "s1");
        assert!(dataset.test_cases[0].must_include.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_a_total_tests_mismatch() {
        let path = write_temp_dataset(
            r#"{
                "version": "1.0.0",
                "description": "mismatch",
                "total_tests": 2,
                "test_cases": [
                    { "id": "s1", "category": "faction", "query": "who controls the mines?" }
                ]
            }"#,
        );

        let result = GoldenDataset::load(&path);
        assert!(result.is_err());

        std::fs::remove_file(&path).ok();
    }
}

//! JSON report writer for evaluation, comparison, and sweep outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Cross-validated outcome of one classifier configuration, flattened to
/// primitives so this crate carries no dependency on the evaluation crate.
///
/// Rates whose denominator is zero are undefined and stored as `None`
/// (`null` in JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Display label, e.g. `logistic_regression/balanced`.
    pub label: String,
    /// Algorithm name.
    pub algorithm: String,
    /// Class weight policy, e.g. `uniform` or `5:1`.
    pub class_weights: String,
    /// Rows evaluated.
    pub n_rows: usize,
    /// Folds used.
    pub n_folds: usize,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
    pub true_positive_rate: Option<f64>,
    pub false_positive_rate: Option<f64>,
    pub precision: Option<f64>,
    pub accuracy: Option<f64>,
    /// Mean of per-fold accuracies.
    pub mean_accuracy: f64,
    /// Population standard deviation of per-fold accuracies.
    pub std_accuracy: f64,
    pub fold_accuracies: Vec<f64>,
}

impl EvaluationRecord {
    /// Map an undefined (NaN or infinite) rate to `None`.
    #[must_use]
    pub fn defined(rate: f64) -> Option<f64> {
        rate.is_finite().then_some(rate)
    }
}

/// Writes evaluation reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluate.json`,
/// `{experiment}_compare.json`, and `{experiment}_sweep.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a single evaluation to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(label = %record.label))]
    pub fn write_evaluation(&self, record: &EvaluationRecord) -> Result<PathBuf, IoError> {
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            evaluation: record,
        };
        let path = self.write_json("evaluate", &artifact)?;
        info!(path = %path.display(), "evaluation report written");
        Ok(path)
    }

    /// Write side-by-side evaluations to `{experiment}_compare.json`.
    ///
    /// `best` names the selected record's label, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_candidates = records.len()))]
    pub fn write_comparison(
        &self,
        records: &[EvaluationRecord],
        best: Option<&str>,
    ) -> Result<PathBuf, IoError> {
        let artifact = CompareArtifact {
            experiment: self.experiment.as_str(),
            n_candidates: records.len(),
            best,
            candidates: records,
        };
        let path = self.write_json("compare", &artifact)?;
        info!(path = %path.display(), "comparison report written");
        Ok(path)
    }

    /// Write a class-0 penalty sweep to `{experiment}_sweep.json`.
    ///
    /// Each point pairs the label-0 weight with its evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(algorithm = %algorithm, n_points = points.len()))]
    pub fn write_sweep(
        &self,
        algorithm: &str,
        points: &[(f64, EvaluationRecord)],
    ) -> Result<PathBuf, IoError> {
        let artifact = SweepArtifact {
            experiment: self.experiment.as_str(),
            algorithm,
            points: points
                .iter()
                .map(|(negative_weight, record)| SweepPoint {
                    negative_weight: *negative_weight,
                    true_positive_rate: record.true_positive_rate,
                    false_positive_rate: record.false_positive_rate,
                    evaluation: record,
                })
                .collect(),
        };
        let path = self.write_json("sweep", &artifact)?;
        info!(path = %path.display(), "sweep report written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, kind: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    evaluation: &'a EvaluationRecord,
}

#[derive(Serialize)]
struct CompareArtifact<'a> {
    experiment: &'a str,
    n_candidates: usize,
    best: Option<&'a str>,
    candidates: &'a [EvaluationRecord],
}

#[derive(Serialize)]
struct SweepArtifact<'a> {
    experiment: &'a str,
    algorithm: &'a str,
    points: Vec<SweepPoint<'a>>,
}

#[derive(Serialize)]
struct SweepPoint<'a> {
    negative_weight: f64,
    true_positive_rate: Option<f64>,
    false_positive_rate: Option<f64>,
    evaluation: &'a EvaluationRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(label: &str, fpr: Option<f64>) -> EvaluationRecord {
        EvaluationRecord {
            label: label.to_string(),
            algorithm: "logistic_regression".to_string(),
            class_weights: "uniform".to_string(),
            n_rows: 8,
            n_folds: 2,
            true_positive: 3,
            false_positive: 1,
            true_negative: 3,
            false_negative: 1,
            true_positive_rate: Some(0.75),
            false_positive_rate: fpr,
            precision: Some(0.75),
            accuracy: Some(0.75),
            mean_accuracy: 0.75,
            std_accuracy: 0.0,
            fold_accuracies: vec![0.75, 0.75],
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn defined_maps_nan_to_none() {
        assert_eq!(EvaluationRecord::defined(0.25), Some(0.25));
        assert_eq!(EvaluationRecord::defined(f64::NAN), None);
        assert_eq!(EvaluationRecord::defined(f64::INFINITY), None);
    }

    #[test]
    fn write_evaluation_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("test_run".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let path = writer.write_evaluation(&record("lr", Some(0.25))).unwrap();
        assert_eq!(path, dir.path().join("test_run_evaluate.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["evaluation"]["true_positive"], 3);
        assert_eq!(content["evaluation"]["false_positive_rate"], 0.25);
        assert_eq!(
            content["evaluation"]["fold_accuracies"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn undefined_rate_serialized_as_null() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("nan_rate".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let path = writer.write_evaluation(&record("lr", None)).unwrap();
        let content = read_json(&path);
        assert!(content["evaluation"]["false_positive_rate"].is_null());
    }

    #[test]
    fn evaluation_record_round_trips() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("round".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let original = record("lr", None);
        let path = writer.write_evaluation(&original).unwrap();
        let back: EvaluationRecord =
            serde_json::from_value(read_json(&path)["evaluation"].clone()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn write_comparison_keeps_order_and_best() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("cmp".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let records = vec![record("a", Some(0.5)), record("b", Some(0.25))];
        let path = writer.write_comparison(&records, Some("b")).unwrap();

        let content = read_json(&path);
        assert_eq!(content["n_candidates"], 2);
        assert_eq!(content["best"], "b");
        let candidates = content["candidates"].as_array().unwrap();
        assert_eq!(candidates[0]["label"], "a");
        assert_eq!(candidates[1]["label"], "b");
    }

    #[test]
    fn write_comparison_without_best() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("cmp_none".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let path = writer.write_comparison(&[], None).unwrap();
        let content = read_json(&path);
        assert!(content["best"].is_null());
        assert_eq!(content["n_candidates"], 0);
    }

    #[test]
    fn write_sweep_points() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("sweep".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let points = vec![(1.0, record("w1", Some(0.5))), (5.0, record("w5", Some(0.25)))];
        let path = writer.write_sweep("random_forest", &points).unwrap();
        assert_eq!(path, dir.path().join("sweep_sweep.json"));

        let content = read_json(&path);
        assert_eq!(content["algorithm"], "random_forest");
        let points = content["points"].as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1]["negative_weight"], 5.0);
        assert_eq!(points[1]["false_positive_rate"], 0.25);
        assert_eq!(points[1]["evaluation"]["label"], "w5");
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("nested_test".into()).unwrap();
        let writer = ReportWriter::new(&nested, experiment).unwrap();

        writer.write_evaluation(&record("lr", Some(1.0))).unwrap();
        assert!(nested.join("nested_test_evaluate.json").exists());
    }

    #[test]
    fn output_dir_blocked_by_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let experiment = ExperimentName::new("blocked".into()).unwrap();

        let result = ReportWriter::new(&blocker.join("out"), experiment);
        assert!(matches!(result, Err(IoError::OutputDirCreate { .. })));
    }
}

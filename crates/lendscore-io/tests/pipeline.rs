//! End-to-end integration tests: CSV -> cross-validation -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use lendscore_eval::{
    Algorithm, Candidate, CandidateReport, ClassWeights, ClassifierAdapter, CrossValidator,
    best_by_false_positive_rate, compare,
};
use lendscore_io::{EvaluationRecord, ExperimentName, IoError, LoanReader, ReportWriter};
use lendscore_linear::LogisticRegressionConfig;
use lendscore_rf::RandomForestConfig;
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn to_record(report: &CandidateReport) -> EvaluationRecord {
    let cm = report.result.confusion;
    EvaluationRecord {
        label: report.label.clone(),
        algorithm: report.algorithm.clone(),
        class_weights: report.class_weights.to_string(),
        n_rows: report.result.n_rows,
        n_folds: report.result.n_folds,
        true_positive: cm.true_positive,
        false_positive: cm.false_positive,
        true_negative: cm.true_negative,
        false_negative: cm.false_negative,
        true_positive_rate: EvaluationRecord::defined(cm.true_positive_rate()),
        false_positive_rate: EvaluationRecord::defined(cm.false_positive_rate()),
        precision: EvaluationRecord::defined(cm.precision()),
        accuracy: EvaluationRecord::defined(cm.accuracy()),
        mean_accuracy: report.result.mean_accuracy,
        std_accuracy: report.result.std_accuracy,
        fold_accuracies: report.result.fold_accuracies.clone(),
    }
}

#[test]
fn fixture_loads_with_expected_shape() {
    let dataset = LoanReader::new(&fixture_path("loans_small.csv"))
        .read()
        .expect("fixture should parse");

    assert_eq!(dataset.n_rows(), 24);
    assert_eq!(dataset.n_features(), 3);
    assert_eq!(dataset.feature_names(), &["fico", "int_rate", "installment"]);
    // Every fourth loan defaults.
    assert_eq!(dataset.class_counts(), [6, 18]);
}

#[test]
fn evaluate_round_trip() {
    // 1. Read CSV
    let dataset = LoanReader::new(&fixture_path("loans_small.csv"))
        .read()
        .unwrap();

    // 2. Cross-validate a balanced logistic regression
    let adapter = ClassifierAdapter::new(Algorithm::Logistic(LogisticRegressionConfig::new()))
        .with_class_weights(ClassWeights::Balanced);
    let validator = CrossValidator::new(3).unwrap();
    let result = validator
        .evaluate(&adapter, dataset.features(), dataset.labels())
        .unwrap();
    assert_eq!(result.predictions.len(), dataset.n_rows());

    let report = CandidateReport {
        label: "logistic_regression/balanced".to_string(),
        algorithm: "logistic_regression".to_string(),
        class_weights: ClassWeights::Balanced,
        result,
    };

    // 3. Write JSON report
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("eval_rt".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_evaluation(&to_record(&report)).unwrap();

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "eval_rt");

    let record: EvaluationRecord = serde_json::from_value(content["evaluation"].clone()).unwrap();
    assert_eq!(record.n_rows, 24);
    assert_eq!(record.n_folds, 3);
    assert_eq!(
        record.true_positive + record.false_positive + record.true_negative + record.false_negative,
        24
    );
    assert_eq!(record.true_positive + record.false_negative, 18);
    assert_eq!(record.false_positive + record.true_negative, 6);

    // Classes are separable on every feature.
    let tpr = record.true_positive_rate.unwrap();
    let fpr = record.false_positive_rate.unwrap();
    assert!(tpr >= 0.9, "tpr = {tpr}");
    assert!(fpr <= 0.2, "fpr = {fpr}");
}

#[test]
fn compare_round_trip() {
    let dataset = LoanReader::new(&fixture_path("loans_small.csv"))
        .read()
        .unwrap();

    let mut candidates = Vec::new();
    for weights in [ClassWeights::Uniform, ClassWeights::Balanced] {
        candidates.push(Candidate::new(
            Algorithm::Logistic(LogisticRegressionConfig::new()),
            weights,
        ));
        candidates.push(Candidate::new(
            Algorithm::Forest(RandomForestConfig::new(20).unwrap().with_seed(42)),
            weights,
        ));
    }

    let validator = CrossValidator::new(4).unwrap();
    let reports = compare(&candidates, &validator, dataset.features(), dataset.labels()).unwrap();
    let best = best_by_false_positive_rate(&reports, 0.5).map(|r| r.label.as_str());
    let records: Vec<EvaluationRecord> = reports.iter().map(to_record).collect();

    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("cmp_rt".into()).unwrap();
    let writer = ReportWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_comparison(&records, best).unwrap();
    assert_eq!(path, dir.path().join("cmp_rt_compare.json"));

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["n_candidates"], 4);
    assert!(content["best"].is_string());

    let labels: Vec<&str> = content["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        vec![
            "logistic_regression/uniform",
            "random_forest/uniform",
            "logistic_regression/balanced",
            "random_forest/balanced",
        ]
    );
}

#[test]
fn bad_label_fixture_rejected() {
    let result = LoanReader::new(&fixture_path("loans_bad_label.csv")).read();
    assert!(matches!(
        result,
        Err(IoError::InvalidLabel { row_index: 1, ref raw, .. }) if raw == "default"
    ));
}

#[test]
fn missing_value_fixture_rejected() {
    let result = LoanReader::new(&fixture_path("loans_missing_value.csv")).read();
    assert!(matches!(
        result,
        Err(IoError::NonFiniteValue { row_index: 1, ref column, .. }) if column == "int_rate"
    ));
}

#[test]
fn single_column_fixture_rejected() {
    let result = LoanReader::new(&fixture_path("loans_single_column.csv")).read();
    assert!(matches!(result, Err(IoError::NoFeatureColumns { .. })));
}

#[test]
fn wrong_label_column_rejected() {
    let result = LoanReader::new(&fixture_path("loans_small.csv"))
        .with_label_column("not_fully_paid")
        .read();
    assert!(matches!(result, Err(IoError::MissingLabelColumn { .. })));
}

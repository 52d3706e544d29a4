//! Side-by-side evaluation of several classifier configurations.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, instrument};

use crate::adapter::{Algorithm, Classifier, ClassifierAdapter};
use crate::cross_val::{CrossValidationResult, CrossValidator};
use crate::error::EvalError;
use crate::weights::ClassWeights;

/// One configuration to evaluate.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Display label, unique within a comparison.
    pub label: String,
    /// Model to fit in each fold.
    pub algorithm: Algorithm,
    /// Class weight policy applied on each fit.
    pub class_weights: ClassWeights,
}

impl Candidate {
    /// Build a candidate labeled `{algorithm}/{class_weights}`.
    #[must_use]
    pub fn new(algorithm: Algorithm, class_weights: ClassWeights) -> Self {
        Self {
            label: format!("{}/{}", algorithm.name(), class_weights),
            algorithm,
            class_weights,
        }
    }
}

/// The cross-validated outcome for one [`Candidate`].
#[derive(Debug, Clone)]
pub struct CandidateReport {
    /// The candidate's label.
    pub label: String,
    /// Algorithm name.
    pub algorithm: String,
    /// Class weight policy used.
    pub class_weights: ClassWeights,
    /// Cross-validation outcome.
    pub result: CrossValidationResult,
}

/// Cross-validate every candidate on the same folds.
///
/// Candidates run in parallel and share nothing mutable; reports come
/// back in input order. The first failing candidate's error is returned.
///
/// # Errors
///
/// Any error from [`CrossValidator::evaluate`].
#[instrument(skip_all, fields(n_candidates = candidates.len(), n_rows = features.len()))]
pub fn compare(
    candidates: &[Candidate],
    validator: &CrossValidator,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<Vec<CandidateReport>, EvalError> {
    let reports: Vec<CandidateReport> = candidates
        .par_iter()
        .map(|candidate| -> Result<CandidateReport, EvalError> {
            let adapter = ClassifierAdapter::new(candidate.algorithm.clone())
                .with_class_weights(candidate.class_weights);
            let result = validator.evaluate(&adapter, features, labels)?;
            info!(
                candidate = %candidate.label,
                tpr = result.true_positive_rate(),
                fpr = result.false_positive_rate(),
                "candidate evaluated"
            );
            Ok(CandidateReport {
                label: candidate.label.clone(),
                algorithm: candidate.algorithm.name(),
                class_weights: candidate.class_weights,
                result,
            })
        })
        .collect::<Result<_, _>>()?;

    Ok(reports)
}

/// Evaluate `algorithm` once per label-0 weight, label 1 fixed at 1.0.
///
/// # Errors
///
/// [`EvalError::InvalidClassWeight`] for a non-positive or non-finite
/// weight, otherwise as [`compare`].
pub fn penalty_sweep(
    algorithm: &Algorithm,
    negative_weights: &[f64],
    validator: &CrossValidator,
    features: &[Vec<f64>],
    labels: &[usize],
) -> Result<Vec<CandidateReport>, EvalError> {
    let candidates = negative_weights
        .iter()
        .map(|&w| {
            ClassWeights::custom(w, 1.0).map(|weights| Candidate::new(algorithm.clone(), weights))
        })
        .collect::<Result<Vec<_>, _>>()?;
    compare(&candidates, validator, features, labels)
}

/// Pick the report with the lowest false-positive rate among those whose
/// true-positive rate is at least `min_tpr`.
///
/// Reports with an undefined (NaN) rate never qualify. Ties keep the
/// earlier report.
#[must_use]
pub fn best_by_false_positive_rate(
    reports: &[CandidateReport],
    min_tpr: f64,
) -> Option<&CandidateReport> {
    reports
        .iter()
        .filter(|r| {
            let tpr = r.result.true_positive_rate();
            let fpr = r.result.false_positive_rate();
            tpr >= min_tpr && !fpr.is_nan()
        })
        .min_by(|a, b| {
            a.result
                .false_positive_rate()
                .total_cmp(&b.result.false_positive_rate())
        })
}

#[cfg(test)]
mod tests {
    use lendscore_linear::LogisticRegressionConfig;
    use lendscore_rf::RandomForestConfig;

    use super::*;
    use crate::confusion::ConfusionCounts;

    fn report(label: &str, predicted: &[usize], actual: &[usize]) -> CandidateReport {
        let confusion = ConfusionCounts::from_labels(predicted, actual).unwrap();
        CandidateReport {
            label: label.to_string(),
            algorithm: "test".to_string(),
            class_weights: ClassWeights::Uniform,
            result: CrossValidationResult {
                predictions: predicted.to_vec(),
                confusion,
                fold_counts: vec![confusion],
                fold_accuracies: vec![confusion.accuracy()],
                mean_accuracy: confusion.accuracy(),
                std_accuracy: 0.0,
                n_folds: 1,
                n_rows: actual.len(),
            },
        }
    }

    fn dataset() -> (Vec<Vec<f64>>, Vec<usize>) {
        let features = (0..20).map(|i| vec![(i % 10) as f64]).collect();
        let labels = (0..20).map(|i| usize::from(i % 10 >= 3)).collect();
        (features, labels)
    }

    #[test]
    fn candidate_label_combines_parts() {
        let candidate = Candidate::new(
            Algorithm::Logistic(LogisticRegressionConfig::new()),
            ClassWeights::Balanced,
        );
        assert_eq!(candidate.label, "logistic_regression/balanced");
    }

    #[test]
    fn compare_preserves_input_order() {
        let (features, labels) = dataset();
        let candidates = vec![
            Candidate::new(
                Algorithm::Forest(RandomForestConfig::new(5).unwrap()),
                ClassWeights::Uniform,
            ),
            Candidate::new(
                Algorithm::Logistic(LogisticRegressionConfig::new()),
                ClassWeights::Balanced,
            ),
        ];
        let validator = CrossValidator::new(2).unwrap();
        let reports = compare(&candidates, &validator, &features, &labels).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].label, "random_forest/uniform");
        assert_eq!(reports[1].label, "logistic_regression/balanced");
        assert!(reports.iter().all(|r| r.result.predictions.len() == 20));
    }

    #[test]
    fn sweep_builds_custom_candidates() {
        let (features, labels) = dataset();
        let algorithm = Algorithm::Logistic(LogisticRegressionConfig::new());
        let validator = CrossValidator::new(2).unwrap();
        let reports = penalty_sweep(&algorithm, &[1.0, 4.0], &validator, &features, &labels).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[1].class_weights,
            ClassWeights::Custom {
                negative: 4.0,
                positive: 1.0
            }
        );
    }

    #[test]
    fn sweep_rejects_bad_weight() {
        let (features, labels) = dataset();
        let algorithm = Algorithm::Logistic(LogisticRegressionConfig::new());
        let validator = CrossValidator::new(2).unwrap();
        let err = penalty_sweep(&algorithm, &[1.0, -3.0], &validator, &features, &labels)
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidClassWeight { class: 0, .. }));
    }

    #[test]
    fn best_respects_tpr_floor() {
        let actual = [1, 1, 1, 1, 0, 0];
        let reports = vec![
            // tpr 1.0, fpr 1.0
            report("loose", &[1, 1, 1, 1, 1, 1], &actual),
            // tpr 0.75, fpr 0.5
            report("middle", &[1, 1, 1, 0, 1, 0], &actual),
            // tpr 0.25, fpr 0.0
            report("strict", &[1, 0, 0, 0, 0, 0], &actual),
        ];

        let best = best_by_false_positive_rate(&reports, 0.7).unwrap();
        assert_eq!(best.label, "middle");
        let best = best_by_false_positive_rate(&reports, 0.0).unwrap();
        assert_eq!(best.label, "strict");
        assert!(best_by_false_positive_rate(&reports, 1.1).is_none());
    }

    #[test]
    fn best_skips_undefined_rates() {
        // No actual negatives: fpr is NaN.
        let reports = vec![report("no_negatives", &[1, 1], &[1, 1])];
        assert!(best_by_false_positive_rate(&reports, 0.0).is_none());
    }
}

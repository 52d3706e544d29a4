//! K-fold cross-validated prediction.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::adapter::{Classifier, ClassifierAdapter, validate_rows};
use crate::confusion::ConfusionCounts;
use crate::error::EvalError;

/// How rows are assigned to folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldStrategy {
    /// Rows `0..n` in `k` contiguous blocks; the first `n % k` blocks get
    /// one extra row. No shuffling.
    #[default]
    Contiguous,
    /// Rows shuffled within each class, then dealt round-robin so every
    /// fold sees roughly the overall class ratio.
    Stratified {
        /// Seed for the within-class shuffle.
        seed: u64,
    },
}

/// One train/test partition of the row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Rows the model is fitted on, ascending.
    pub train_indices: Vec<usize>,
    /// Rows the model predicts, ascending.
    pub test_indices: Vec<usize>,
}

/// Cross-validation configuration.
///
/// Construct via [`CrossValidator::new`], then chain `with_strategy` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidator {
    n_folds: usize,
    strategy: FoldStrategy,
}

/// Results of a cross-validated evaluation.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// One out-of-fold prediction per row, in row order.
    pub predictions: Vec<usize>,
    /// Confusion counts over all rows.
    pub confusion: ConfusionCounts,
    /// Confusion counts for each held-out fold.
    pub fold_counts: Vec<ConfusionCounts>,
    /// Accuracy for each fold.
    pub fold_accuracies: Vec<f64>,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of rows.
    pub n_rows: usize,
}

impl CrossValidationResult {
    /// True-positive rate over all rows.
    #[must_use]
    pub fn true_positive_rate(&self) -> f64 {
        self.confusion.true_positive_rate()
    }

    /// False-positive rate over all rows.
    #[must_use]
    pub fn false_positive_rate(&self) -> f64 {
        self.confusion.false_positive_rate()
    }
}

impl CrossValidator {
    /// Create a validator with `n_folds` contiguous folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        if n_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            strategy: FoldStrategy::Contiguous,
        })
    }

    /// Set the fold assignment strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: FoldStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the fold assignment strategy.
    #[must_use]
    pub fn strategy(&self) -> FoldStrategy {
        self.strategy
    }

    /// Partition `0..labels.len()` into folds.
    ///
    /// Every row appears in exactly one test set. `n_folds == labels.len()`
    /// is leave-one-out.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                   |
    /// |--------------------------------------|------------------------|
    /// | [`EvalError::EmptyDataset`]          | zero rows              |
    /// | [`EvalError::FoldCountExceedsRows`]  | more folds than rows   |
    pub fn folds(&self, labels: &[usize]) -> Result<Vec<Fold>, EvalError> {
        let n_rows = labels.len();
        if n_rows == 0 {
            return Err(EvalError::EmptyDataset);
        }
        if self.n_folds > n_rows {
            return Err(EvalError::FoldCountExceedsRows {
                n_folds: self.n_folds,
                n_rows,
            });
        }

        let assignments = match self.strategy {
            FoldStrategy::Contiguous => self.contiguous_assignments(n_rows),
            FoldStrategy::Stratified { seed } => self.stratified_assignments(labels, seed),
        };

        let mut test_sets: Vec<Vec<usize>> = vec![Vec::new(); self.n_folds];
        for (row, &fold) in assignments.iter().enumerate() {
            test_sets[fold].push(row);
        }

        Ok(test_sets
            .into_iter()
            .enumerate()
            .map(|(fold, test_indices)| Fold {
                train_indices: (0..n_rows).filter(|&row| assignments[row] != fold).collect(),
                test_indices,
            })
            .collect())
    }

    fn contiguous_assignments(&self, n_rows: usize) -> Vec<usize> {
        let base = n_rows / self.n_folds;
        let extra = n_rows % self.n_folds;
        let mut assignments = Vec::with_capacity(n_rows);
        for fold in 0..self.n_folds {
            let size = base + usize::from(fold < extra);
            assignments.extend(std::iter::repeat_n(fold, size));
        }
        assignments
    }

    /// The deal counter carries over between classes so folds fill evenly
    /// even when one class is smaller than `n_folds`.
    fn stratified_assignments(&self, labels: &[usize], seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (row, &label) in labels.iter().enumerate() {
            by_class.entry(label).or_default().push(row);
        }

        let mut assignments = vec![0usize; labels.len()];
        let mut dealt = 0usize;
        for rows in by_class.values_mut() {
            rows.shuffle(&mut rng);
            for &row in rows.iter() {
                assignments[row] = dealt % self.n_folds;
                dealt += 1;
            }
        }
        assignments
    }

    /// Produce one out-of-fold prediction per row.
    ///
    /// Each fold fits a fresh model on the remaining rows, with the
    /// adapter's class weights recomputed on those rows.
    ///
    /// # Errors
    ///
    /// Input validation errors from the adapter, fold errors from
    /// [`CrossValidator::folds`], and engine errors from each fit.
    pub fn predict<C: Classifier>(
        &self,
        adapter: &ClassifierAdapter<C>,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<Vec<usize>, EvalError> {
        Ok(self.run(adapter, features, labels)?.0)
    }

    /// Cross-validate and tally the out-of-fold predictions.
    ///
    /// # Errors
    ///
    /// Same as [`CrossValidator::predict`].
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_rows = features.len()))]
    pub fn evaluate<C: Classifier>(
        &self,
        adapter: &ClassifierAdapter<C>,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<CrossValidationResult, EvalError> {
        let (predictions, fold_counts) = self.run(adapter, features, labels)?;

        let confusion = fold_counts
            .iter()
            .fold(ConfusionCounts::default(), |acc, &counts| acc.merge(counts));
        let fold_accuracies: Vec<f64> = fold_counts.iter().map(ConfusionCounts::accuracy).collect();

        let n = fold_accuracies.len() as f64;
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / n;
            variance.sqrt()
        };

        info!(
            mean_accuracy,
            std_accuracy,
            tpr = confusion.true_positive_rate(),
            fpr = confusion.false_positive_rate(),
            "cross-validation complete"
        );

        Ok(CrossValidationResult {
            predictions,
            confusion,
            fold_counts,
            fold_accuracies,
            mean_accuracy,
            std_accuracy,
            n_folds: self.n_folds,
            n_rows: labels.len(),
        })
    }

    fn run<C: Classifier>(
        &self,
        adapter: &ClassifierAdapter<C>,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<(Vec<usize>, Vec<ConfusionCounts>), EvalError> {
        validate_rows(features, labels)?;
        let folds = self.folds(labels)?;

        let mut predictions = vec![0usize; labels.len()];
        let mut fold_counts = Vec::with_capacity(folds.len());

        for (fold_index, fold) in folds.iter().enumerate() {
            let train_features: Vec<Vec<f64>> = fold
                .train_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let train_labels: Vec<usize> = fold.train_indices.iter().map(|&i| labels[i]).collect();
            let test_features: Vec<Vec<f64>> = fold
                .test_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let test_labels: Vec<usize> = fold.test_indices.iter().map(|&i| labels[i]).collect();

            let model = adapter.train(&train_features, &train_labels)?;
            let fold_predictions = adapter.predict(&model, &test_features)?;
            let counts = ConfusionCounts::from_labels(&fold_predictions, &test_labels)?;
            info!(
                fold = fold_index,
                n_test = test_labels.len(),
                accuracy = counts.accuracy(),
                "fold completed"
            );

            for (&row, &prediction) in fold.test_indices.iter().zip(&fold_predictions) {
                predictions[row] = prediction;
            }
            fold_counts.push(counts);
        }

        Ok((predictions, fold_counts))
    }
}

#[cfg(test)]
mod tests {
    use lendscore_linear::LogisticRegressionConfig;
    use lendscore_rf::{MaxFeatures, RandomForestConfig};

    use super::*;
    use crate::adapter::Algorithm;

    fn test_sets(folds: &[Fold]) -> Vec<Vec<usize>> {
        folds.iter().map(|f| f.test_indices.clone()).collect()
    }

    #[test]
    fn contiguous_sizes_front_loaded() {
        let cv = CrossValidator::new(3).unwrap();
        let folds = cv.folds(&[0; 7]).unwrap();
        assert_eq!(
            test_sets(&folds),
            vec![vec![0, 1, 2], vec![3, 4], vec![5, 6]]
        );
        assert_eq!(folds[1].train_indices, vec![0, 1, 2, 5, 6]);
    }

    #[test]
    fn leave_one_out_when_k_equals_n() {
        let cv = CrossValidator::new(4).unwrap();
        let folds = cv.folds(&[0, 1, 0, 1]).unwrap();
        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.test_indices, vec![i]);
            assert_eq!(fold.train_indices.len(), 3);
        }
    }

    #[test]
    fn stratified_covers_every_row_once() {
        let labels: Vec<usize> = (0..23).map(|i| usize::from(i % 5 != 0)).collect();
        let cv = CrossValidator::new(4)
            .unwrap()
            .with_strategy(FoldStrategy::Stratified { seed: 9 });
        let folds = cv.folds(&labels).unwrap();

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
        for fold in &folds {
            assert!(!fold.test_indices.is_empty());
            let negatives = fold.test_indices.iter().filter(|&&i| labels[i] == 0).count();
            assert!((1..=2).contains(&negatives), "negatives = {negatives}");
        }
    }

    #[test]
    fn stratified_tiny_class_keeps_folds_nonempty() {
        // One negative among five rows, five folds.
        let cv = CrossValidator::new(5)
            .unwrap()
            .with_strategy(FoldStrategy::Stratified { seed: 1 });
        let folds = cv.folds(&[1, 1, 0, 1, 1]).unwrap();
        assert!(folds.iter().all(|f| f.test_indices.len() == 1));
    }

    #[test]
    fn stratified_is_seed_deterministic() {
        let labels: Vec<usize> = (0..30).map(|i| i % 2).collect();
        let strategy = FoldStrategy::Stratified { seed: 5 };
        let a = CrossValidator::new(3).unwrap().with_strategy(strategy);
        let b = CrossValidator::new(3).unwrap().with_strategy(strategy);
        assert_eq!(a.folds(&labels).unwrap(), b.folds(&labels).unwrap());
    }

    #[test]
    fn fold_count_validation() {
        assert!(matches!(
            CrossValidator::new(1).unwrap_err(),
            EvalError::InvalidFoldCount { n_folds: 1 }
        ));
        let err = CrossValidator::new(5).unwrap().folds(&[0, 1, 0]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::FoldCountExceedsRows { n_folds: 5, n_rows: 3 }
        ));
        let err = CrossValidator::new(2).unwrap().folds(&[]).unwrap_err();
        assert!(matches!(err, EvalError::EmptyDataset));
    }

    #[test]
    fn evaluate_separable_forest() {
        // Interleaved so contiguous folds hold both classes.
        let features: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![if i % 2 == 0 { i as f64 * 0.1 } else { 10.0 + i as f64 * 0.1 }])
            .collect();
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let adapter = ClassifierAdapter::new(Algorithm::Forest(
            RandomForestConfig::new(20)
                .unwrap()
                .with_max_features(MaxFeatures::All),
        ));

        let result = CrossValidator::new(5)
            .unwrap()
            .evaluate(&adapter, &features, &labels)
            .unwrap();
        assert_eq!(result.predictions.len(), 40);
        assert_eq!(result.confusion.total(), 40);
        assert_eq!(result.fold_accuracies.len(), 5);
        assert_eq!(result.fold_counts.len(), 5);
        assert!(result.mean_accuracy > 0.9, "mean = {}", result.mean_accuracy);
        assert!((result.true_positive_rate() - 1.0).abs() < f64::EPSILON);
        assert!(result.false_positive_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn predict_matches_evaluate() {
        let features: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..12).map(|i| usize::from(i % 3 != 0)).collect();
        let adapter = ClassifierAdapter::new(LogisticRegressionConfig::new());
        let cv = CrossValidator::new(3).unwrap();

        let predictions = cv.predict(&adapter, &features, &labels).unwrap();
        let result = cv.evaluate(&adapter, &features, &labels).unwrap();
        assert_eq!(predictions, result.predictions);
        assert_eq!(
            result.confusion,
            ConfusionCounts::from_labels(&predictions, &labels).unwrap()
        );
    }

    #[test]
    fn predict_rejects_bad_rows() {
        let adapter = ClassifierAdapter::new(LogisticRegressionConfig::new());
        let cv = CrossValidator::new(2).unwrap();
        let err = cv
            .predict(&adapter, &[vec![0.0], vec![1.0]], &[0])
            .unwrap_err();
        assert!(matches!(err, EvalError::LengthMismatch { .. }));
    }
}

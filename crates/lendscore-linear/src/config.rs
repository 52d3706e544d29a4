//! Configuration builder for logistic regression training.

use crate::error::LinearError;
use crate::logistic::LogisticRegression;

/// Configuration for logistic regression training.
///
/// Construct via [`LogisticRegressionConfig::new`], then chain `with_*` methods.
/// Hyperparameters are validated when [`fit`](Self::fit) is called.
///
/// # Defaults
///
/// | Parameter       | Default |
/// |-----------------|---------|
/// | `learning_rate` | 0.1     |
/// | `max_iter`      | 1000    |
/// | `tolerance`     | 1e-6    |
/// | `l2_penalty`    | 1e-3    |
/// | `threshold`     | 0.5     |
#[derive(Debug, Clone)]
pub struct LogisticRegressionConfig {
    pub(crate) learning_rate: f64,
    pub(crate) max_iter: usize,
    pub(crate) tolerance: f64,
    pub(crate) l2_penalty: f64,
    pub(crate) threshold: f64,
}

impl LogisticRegressionConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 1000,
            tolerance: 1e-6,
            l2_penalty: 1e-3,
            threshold: 0.5,
        }
    }

    // --- Setters ---

    /// Set the gradient descent step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the maximum number of gradient descent iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance on every gradient component.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the L2 penalty applied to the coefficients (not the intercept).
    #[must_use]
    pub fn with_l2_penalty(mut self, l2_penalty: f64) -> Self {
        self.l2_penalty = l2_penalty;
        self
    }

    /// Set the probability at or above which a sample is labeled 1.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    // --- Getters ---

    /// Return the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Return the iteration cap.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the convergence tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Return the L2 penalty.
    #[must_use]
    pub fn l2_penalty(&self) -> f64 {
        self.l2_penalty
    }

    /// Return the decision threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Train with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`LogisticRegressionConfig::fit_weighted`].
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<LogisticRegression, LinearError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Train a logistic regression on the provided row-major dataset.
    ///
    /// `labels[sample_idx]` must be 0 or 1. `sample_weights[sample_idx]`
    /// multiplies that sample's contribution to the loss.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                        |
    /// |--------------------------------------------|---------------------------------------------|
    /// | [`LinearError::InvalidLearningRate`]       | learning rate not positive and finite       |
    /// | [`LinearError::InvalidMaxIter`]            | `max_iter` is zero                          |
    /// | [`LinearError::InvalidTolerance`]          | tolerance not positive and finite           |
    /// | [`LinearError::InvalidL2Penalty`]          | penalty negative or non-finite              |
    /// | [`LinearError::InvalidThreshold`]          | threshold outside (0.0, 1.0)                |
    /// | [`LinearError::EmptyDataset`]              | `features` is empty                         |
    /// | [`LinearError::ZeroFeatures`]              | rows have zero feature columns              |
    /// | [`LinearError::FeatureCountMismatch`]      | rows have inconsistent lengths              |
    /// | [`LinearError::LabelCountMismatch`]        | `labels.len() != features.len()`            |
    /// | [`LinearError::LabelOutOfRange`]           | a label is not 0 or 1                       |
    /// | [`LinearError::SampleWeightCountMismatch`] | `sample_weights.len() != features.len()`    |
    /// | [`LinearError::InvalidSampleWeight`]       | a weight is zero, negative, or non-finite   |
    /// | [`LinearError::NonFiniteValue`]            | any feature value is NaN or infinite        |
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<LogisticRegression, LinearError> {
        self.validate()?;
        crate::logistic::train(self, features, labels, sample_weights)
    }

    fn validate(&self) -> Result<(), LinearError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LinearError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.max_iter == 0 {
            return Err(LinearError::InvalidMaxIter {
                max_iter: self.max_iter,
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(LinearError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        if !(self.l2_penalty.is_finite() && self.l2_penalty >= 0.0) {
            return Err(LinearError::InvalidL2Penalty {
                l2_penalty: self.l2_penalty,
            });
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(LinearError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Vec<Vec<f64>>, Vec<usize>) {
        (vec![vec![0.0], vec![1.0]], vec![0, 1])
    }

    #[test]
    fn defaults() {
        let config = LogisticRegressionConfig::new();
        assert!((config.learning_rate() - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.max_iter(), 1000);
        assert!((config.tolerance() - 1e-6).abs() < f64::EPSILON);
        assert!((config.l2_penalty() - 1e-3).abs() < f64::EPSILON);
        assert!((config.threshold() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_learning_rate_rejected() {
        let (features, labels) = toy();
        let err = LogisticRegressionConfig::new()
            .with_learning_rate(0.0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, LinearError::InvalidLearningRate { .. }));
    }

    #[test]
    fn zero_max_iter_rejected() {
        let (features, labels) = toy();
        let err = LogisticRegressionConfig::new()
            .with_max_iter(0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, LinearError::InvalidMaxIter { max_iter: 0 }));
    }

    #[test]
    fn negative_penalty_rejected() {
        let (features, labels) = toy();
        let err = LogisticRegressionConfig::new()
            .with_l2_penalty(-1.0)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, LinearError::InvalidL2Penalty { .. }));
    }

    #[test]
    fn threshold_bounds_rejected() {
        let (features, labels) = toy();
        for threshold in [0.0, 1.0, f64::NAN] {
            let err = LogisticRegressionConfig::new()
                .with_threshold(threshold)
                .fit(&features, &labels)
                .unwrap_err();
            assert!(matches!(err, LinearError::InvalidThreshold { .. }));
        }
    }

    #[test]
    fn nan_tolerance_rejected() {
        let (features, labels) = toy();
        let err = LogisticRegressionConfig::new()
            .with_tolerance(f64::NAN)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, LinearError::InvalidTolerance { .. }));
    }
}

//! Sample-weighted binary logistic regression.

use tracing::{debug, info, instrument};

use crate::config::LogisticRegressionConfig;
use crate::error::LinearError;
use crate::scale::Standardizer;

/// A fitted binary logistic regression.
///
/// Coefficients are stored on the original feature scale, so prediction
/// does not need the training-time standardization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
    n_iter: usize,
    converged: bool,
}

/// Sigmoid activation: σ(z) = 1 / (1 + e^(-z)), evaluated without overflow.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn validate_training_set(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<usize, LinearError> {
    if features.is_empty() {
        return Err(LinearError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(LinearError::ZeroFeatures);
    }
    if labels.len() != n_samples {
        return Err(LinearError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    if let Some((sample_index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l > 1) {
        return Err(LinearError::LabelOutOfRange {
            sample_index,
            label,
        });
    }
    if sample_weights.len() != n_samples {
        return Err(LinearError::SampleWeightCountMismatch {
            n_samples,
            n_weights: sample_weights.len(),
        });
    }
    for (sample_index, &weight) in sample_weights.iter().enumerate() {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(LinearError::InvalidSampleWeight {
                sample_index,
                weight,
            });
        }
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(LinearError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(LinearError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Fit by batch gradient descent on standardized features.
///
/// Minimizes the weighted mean binary cross-entropy
/// `Σ w_i · bce(p_i, y_i) / Σ w_i` plus `l2_penalty / 2 · ‖β‖²`.
#[instrument(skip_all, fields(n_samples = features.len()))]
pub(crate) fn train(
    config: &LogisticRegressionConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<LogisticRegression, LinearError> {
    let n_features = validate_training_set(features, labels, sample_weights)?;
    let scaler = Standardizer::fit(features, n_features);
    let scaled = scaler.transform(features);
    let total_weight: f64 = sample_weights.iter().sum();

    info!(
        n_samples = features.len(),
        n_features,
        total_weight,
        max_iter = config.max_iter,
        "training logistic regression"
    );

    let mut beta = vec![0.0f64; n_features];
    let mut bias = 0.0f64;
    let mut coef_grad = vec![0.0f64; n_features];
    let mut n_iter = 0;
    let mut converged = false;

    while n_iter < config.max_iter {
        n_iter += 1;
        coef_grad.iter_mut().for_each(|g| *g = 0.0);
        let mut bias_grad = 0.0;

        for ((row, &label), &weight) in scaled.iter().zip(labels).zip(sample_weights) {
            let z = bias + row.iter().zip(&beta).map(|(x, b)| x * b).sum::<f64>();
            let error = weight * (sigmoid(z) - label as f64);
            bias_grad += error;
            for (grad, &x) in coef_grad.iter_mut().zip(row) {
                *grad += error * x;
            }
        }

        bias_grad /= total_weight;
        for (grad, &b) in coef_grad.iter_mut().zip(&beta) {
            *grad = *grad / total_weight + config.l2_penalty * b;
        }

        bias -= config.learning_rate * bias_grad;
        for (b, &grad) in beta.iter_mut().zip(&coef_grad) {
            *b -= config.learning_rate * grad;
        }

        if bias_grad.abs() < config.tolerance
            && coef_grad.iter().all(|g| g.abs() < config.tolerance)
        {
            converged = true;
            break;
        }
    }

    // Fold the standardization back into the parameters.
    let coefficients: Vec<f64> = beta
        .iter()
        .zip(&scaler.scales)
        .map(|(&b, &scale)| b / scale)
        .collect();
    let intercept = bias
        - coefficients
            .iter()
            .zip(&scaler.means)
            .map(|(c, m)| c * m)
            .sum::<f64>();

    debug!(n_iter, converged, intercept, "logistic regression fitted");

    Ok(LogisticRegression {
        coefficients,
        intercept,
        threshold: config.threshold,
        n_iter,
        converged,
    })
}

impl LogisticRegression {
    /// Return the probability that `sample` belongs to class 1.
    ///
    /// # Errors
    ///
    /// Returns [`LinearError::PredictionFeatureMismatch`] when the sample width
    /// differs from the training width.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, LinearError> {
        if sample.len() != self.coefficients.len() {
            return Err(LinearError::PredictionFeatureMismatch {
                expected: self.coefficients.len(),
                got: sample.len(),
            });
        }
        let z = self.intercept
            + sample
                .iter()
                .zip(&self.coefficients)
                .map(|(x, c)| x * c)
                .sum::<f64>();
        Ok(sigmoid(z))
    }

    /// Predict the class label (0 or 1) for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`LinearError::PredictionFeatureMismatch`] on a width mismatch.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, LinearError> {
        Ok(usize::from(self.predict_proba(sample)? >= self.threshold))
    }

    /// Predict class labels for a batch of samples.
    ///
    /// # Errors
    ///
    /// Returns [`LinearError::PredictionFeatureMismatch`] if any sample has the
    /// wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, LinearError> {
        features.iter().map(|sample| self.predict(sample)).collect()
    }

    /// Return the coefficients on the original feature scale.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Return the intercept on the original feature scale.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Return the number of features the model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Return the number of gradient descent iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Return `true` if the gradient fell below tolerance before `max_iter`.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }
}

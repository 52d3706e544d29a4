//! The seam between evaluation code and the model engines.
//!
//! [`Classifier`] and [`Predictor`] are the only surface the cross-validator
//! sees. [`ClassifierAdapter`] adds input validation and turns a
//! [`ClassWeights`] policy into per-row sample weights before each fit.

use lendscore_linear::{LogisticRegression, LogisticRegressionConfig};
use lendscore_rf::{RandomForest, RandomForestConfig};
use tracing::{debug, instrument};

use crate::error::EvalError;
use crate::weights::ClassWeights;

/// An untrained model configuration that can be fitted on weighted rows.
pub trait Classifier {
    /// The fitted model produced by [`Classifier::fit`].
    type Model: Predictor;

    /// Fit a fresh model. `sample_weights` has one entry per row.
    ///
    /// # Errors
    ///
    /// Returns the engine's error wrapped in [`EvalError`].
    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<Self::Model, EvalError>;

    /// Short human-readable algorithm name.
    fn name(&self) -> String;
}

/// A fitted model that labels rows.
pub trait Predictor {
    /// Return one label in `{0, 1}` per row, in row order.
    ///
    /// # Errors
    ///
    /// Returns the engine's error wrapped in [`EvalError`].
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError>;
}

impl Classifier for LogisticRegressionConfig {
    type Model = LogisticRegression;

    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<LogisticRegression, EvalError> {
        Ok(self.fit_weighted(features, labels, sample_weights)?)
    }

    fn name(&self) -> String {
        "logistic_regression".to_string()
    }
}

impl Predictor for LogisticRegression {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError> {
        Ok(self.predict_batch(features)?)
    }
}

impl Classifier for RandomForestConfig {
    type Model = RandomForest;

    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<RandomForest, EvalError> {
        Ok(self.fit_weighted(features, labels, sample_weights)?)
    }

    fn name(&self) -> String {
        "random_forest".to_string()
    }
}

impl Predictor for RandomForest {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError> {
        Ok(self.predict_batch(features)?)
    }
}

/// Runtime choice between the two supported algorithms.
#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Logistic regression.
    Logistic(LogisticRegressionConfig),
    /// Random forest.
    Forest(RandomForestConfig),
}

/// A model fitted from an [`Algorithm`].
#[derive(Debug, Clone)]
pub enum TrainedModel {
    /// Fitted logistic regression.
    Logistic(LogisticRegression),
    /// Fitted random forest.
    Forest(RandomForest),
}

impl Classifier for Algorithm {
    type Model = TrainedModel;

    fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<TrainedModel, EvalError> {
        match self {
            Self::Logistic(config) => {
                Classifier::fit(config, features, labels, sample_weights).map(TrainedModel::Logistic)
            }
            Self::Forest(config) => {
                Classifier::fit(config, features, labels, sample_weights).map(TrainedModel::Forest)
            }
        }
    }

    fn name(&self) -> String {
        match self {
            Self::Logistic(config) => config.name(),
            Self::Forest(config) => config.name(),
        }
    }
}

impl Predictor for TrainedModel {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError> {
        match self {
            Self::Logistic(model) => Predictor::predict(model, features),
            Self::Forest(model) => Predictor::predict(model, features),
        }
    }
}

/// A classifier paired with the class weight policy applied on every fit.
#[derive(Debug, Clone)]
pub struct ClassifierAdapter<C> {
    classifier: C,
    class_weights: ClassWeights,
}

impl<C: Classifier> ClassifierAdapter<C> {
    /// Wrap `classifier` with uniform class weights.
    #[must_use]
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            class_weights: ClassWeights::Uniform,
        }
    }

    /// Set the class weight policy.
    #[must_use]
    pub fn with_class_weights(mut self, class_weights: ClassWeights) -> Self {
        self.class_weights = class_weights;
        self
    }

    /// Return the wrapped classifier.
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Return the class weight policy.
    #[must_use]
    pub fn class_weights(&self) -> ClassWeights {
        self.class_weights
    }

    /// Fit a fresh model on `features` and binary `labels`.
    ///
    /// A training set holding a single class still fits and yields a
    /// constant predictor.
    ///
    /// # Errors
    ///
    /// | Variant                            | When                                   |
    /// |------------------------------------|----------------------------------------|
    /// | [`EvalError::EmptyDataset`]        | zero rows                              |
    /// | [`EvalError::LengthMismatch`]      | feature and label row counts differ    |
    /// | [`EvalError::LabelOutOfRange`]     | a label is not 0 or 1                  |
    /// | [`EvalError::InvalidClassWeight`]  | the custom policy has a bad multiplier |
    /// | [`EvalError::Forest`] / [`EvalError::Linear`] | the engine rejected the data |
    #[instrument(skip_all, fields(classifier = %self.classifier.name(), n_rows = features.len()))]
    pub fn train(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<C::Model, EvalError> {
        validate_rows(features, labels)?;
        let sample_weights = self.class_weights.sample_weights(labels)?;
        debug!(class_weights = %self.class_weights, "fitting model");
        self.classifier.fit(features, labels, &sample_weights)
    }

    /// Label every row of `features` with a fitted model.
    ///
    /// # Errors
    ///
    /// Returns the engine's prediction error, e.g. a feature width mismatch.
    pub fn predict(&self, model: &C::Model, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError> {
        model.predict(features)
    }
}

/// Check row counts and the binary label domain.
pub(crate) fn validate_rows(features: &[Vec<f64>], labels: &[usize]) -> Result<(), EvalError> {
    if features.len() != labels.len() {
        return Err(EvalError::LengthMismatch {
            left: "features",
            left_len: features.len(),
            right: "labels",
            right_len: labels.len(),
        });
    }
    if features.is_empty() {
        return Err(EvalError::EmptyDataset);
    }
    if let Some((row, &value)) = labels.iter().enumerate().find(|&(_, &l)| l > 1) {
        return Err(EvalError::LabelOutOfRange {
            what: "labels",
            row,
            value,
        });
    }
    Ok(())
}

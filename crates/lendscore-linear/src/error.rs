/// Errors from logistic regression training and prediction.
#[derive(Debug, thiserror::Error)]
pub enum LinearError {
    /// Returned when the learning rate is not strictly positive and finite.
    #[error("learning_rate must be positive and finite, got {learning_rate}")]
    InvalidLearningRate {
        /// The invalid learning rate provided.
        learning_rate: f64,
    },

    /// Returned when max_iter is zero.
    #[error("max_iter must be at least 1, got {max_iter}")]
    InvalidMaxIter {
        /// The invalid max_iter value provided.
        max_iter: usize,
    },

    /// Returned when the tolerance is not strictly positive and finite.
    #[error("tolerance must be positive and finite, got {tolerance}")]
    InvalidTolerance {
        /// The invalid tolerance provided.
        tolerance: f64,
    },

    /// Returned when the L2 penalty is negative or non-finite.
    #[error("l2_penalty must be non-negative and finite, got {l2_penalty}")]
    InvalidL2Penalty {
        /// The invalid penalty provided.
        l2_penalty: f64,
    },

    /// Returned when the decision threshold is outside (0.0, 1.0).
    #[error("threshold must be in (0.0, 1.0), got {threshold}")]
    InvalidThreshold {
        /// The invalid threshold provided.
        threshold: f64,
    },

    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the label count does not match the sample count.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of samples.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a label is not 0 or 1.
    #[error("label {label} at sample {sample_index} is not 0 or 1")]
    LabelOutOfRange {
        /// The index of the offending sample.
        sample_index: usize,
        /// The offending label.
        label: usize,
    },

    /// Returned when the sample weight count does not match the sample count.
    #[error("got {n_weights} sample weights for {n_samples} samples")]
    SampleWeightCountMismatch {
        /// Number of samples.
        n_samples: usize,
        /// Number of weights.
        n_weights: usize,
    },

    /// Returned when a sample weight is zero, negative, or non-finite.
    #[error("sample weight {weight} at sample {sample_index} must be positive and finite")]
    InvalidSampleWeight {
        /// The index of the offending sample.
        sample_index: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The index of the sample containing the non-finite value.
        sample_index: usize,
        /// The index of the feature containing the non-finite value.
        feature_index: usize,
    },

    /// Returned when a prediction sample has the wrong number of features.
    #[error("prediction sample has {got} features, model expects {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the model was trained on.
        expected: usize,
        /// The number of features in the prediction sample.
        got: usize,
    },
}

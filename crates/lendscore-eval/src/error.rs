use lendscore_linear::LinearError;
use lendscore_rf::RfError;

/// Errors from classifier adaptation, cross-validation, and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Returned when two row-aligned inputs have different lengths.
    #[error("{left} has {left_len} rows but {right} has {right_len}")]
    LengthMismatch {
        /// Name of the first input.
        left: &'static str,
        /// Row count of the first input.
        left_len: usize,
        /// Name of the second input.
        right: &'static str,
        /// Row count of the second input.
        right_len: usize,
    },

    /// Returned when a label or prediction is not 0 or 1.
    #[error("{what} value {value} at row {row} is not 0 or 1")]
    LabelOutOfRange {
        /// Which input held the value (`"labels"`, `"predicted"`, `"actual"`).
        what: &'static str,
        /// Zero-based row index.
        row: usize,
        /// The offending value.
        value: usize,
    },

    /// Returned when there are zero rows to train on or evaluate.
    #[error("dataset has zero rows")]
    EmptyDataset,

    /// Returned when a custom class weight is not strictly positive and finite.
    #[error("class {class} weight must be positive and finite, got {weight}")]
    InvalidClassWeight {
        /// The class (0 or 1) the weight applies to.
        class: usize,
        /// The invalid weight.
        weight: f64,
    },

    /// Returned when the fold count is below 2.
    #[error("fold count must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid fold count provided.
        n_folds: usize,
    },

    /// Returned when there are more folds than rows.
    #[error("fold count {n_folds} exceeds the {n_rows} available rows")]
    FoldCountExceedsRows {
        /// The requested fold count.
        n_folds: usize,
        /// The number of rows.
        n_rows: usize,
    },

    /// Random forest training or prediction failed.
    #[error(transparent)]
    Forest(#[from] RfError),

    /// Logistic regression training or prediction failed.
    #[error(transparent)]
    Linear(#[from] LinearError),
}

//! Cross-validated evaluation of binary loan-default classifiers.
//!
//! A [`ClassifierAdapter`] wraps a model configuration with a
//! [`ClassWeights`] policy. A [`CrossValidator`] fits one fresh model per
//! fold and stitches the out-of-fold predictions back into row order, and
//! [`ConfusionCounts`] turns predictions into true- and false-positive
//! rates. [`compare`] and [`penalty_sweep`] run several configurations on
//! the same folds.

mod adapter;
mod compare;
mod confusion;
mod cross_val;
mod error;
mod weights;

pub use adapter::{Algorithm, Classifier, ClassifierAdapter, Predictor, TrainedModel};
pub use compare::{Candidate, CandidateReport, best_by_false_positive_rate, compare, penalty_sweep};
pub use confusion::ConfusionCounts;
pub use cross_val::{CrossValidationResult, CrossValidator, Fold, FoldStrategy};
pub use error::EvalError;
pub use weights::ClassWeights;

//! Binary logistic regression: train and predict.
//!
//! Columns are standardized before batch gradient descent and the fitted
//! parameters are mapped back to the original scale. Every training row
//! may carry a sample weight, which scales its share of the loss.

mod config;
mod error;
mod logistic;
mod scale;

pub use config::LogisticRegressionConfig;
pub use error::LinearError;
pub use logistic::LogisticRegression;

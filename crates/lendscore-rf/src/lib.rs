//! Random Forest classification: train and predict.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, and parallel training via rayon. Every
//! training row may carry a sample weight; impurities, split gains, and leaf
//! votes are computed from weighted class totals, which is how per-class
//! misclassification penalties reach the model.

mod config;
mod error;
mod forest;
mod node;
mod predict;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use error::RfError;
pub use forest::RandomForest;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};

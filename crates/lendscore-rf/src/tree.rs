use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Impurity, Node, NodeIndex},
    split::{ColumnView, SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit_weighted`].
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// # Errors
    ///
    /// | Variant                                 | When                                              |
    /// |-----------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]               | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]               | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]       | rows have inconsistent lengths                    |
    /// | [`RfError::LabelCountMismatch`]         | `labels.len() != features.len()`                  |
    /// | [`RfError::SampleWeightCountMismatch`]  | `sample_weights.len() != features.len()`          |
    /// | [`RfError::InvalidSampleWeight`]        | a weight is zero, negative, or non-finite         |
    /// | [`RfError::NonFiniteValue`]             | any value is NaN or infinite                      |
    /// | [`RfError::InvalidMaxFeatures`]         | `max_features` resolves outside [1, n_features]   |
    /// | [`RfError::InvalidMaxDepth`]            | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesSplit`]     | `min_samples_split` < 2                           |
    /// | [`RfError::InvalidMinSamplesLeaf`]      | `min_samples_leaf` < 1                            |
    #[instrument(skip(self, features, labels, sample_weights), fields(n_samples = features.len()))]
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<DecisionTree, RfError> {
        let n_features = validate_training_set(features, labels, sample_weights)?;
        self.validate(n_features)?;
        Ok(self.build(features, labels, sample_weights, n_features))
    }

    /// Check hyperparameters against the dataset width.
    pub(crate) fn validate(&self, n_features: usize) -> Result<(), RfError> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }

        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }

        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        Ok(())
    }

    /// Grow the tree on pre-validated inputs.
    pub(crate) fn build(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
        n_features: usize,
    ) -> DecisionTree {
        let n_samples = features.len();
        let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
        let max_features = self.max_features.unwrap_or(n_features);

        debug!(
            n_samples,
            n_features,
            n_classes,
            max_features,
            "fitting decision tree"
        );

        // Column-major layout for split finding.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let view = ColumnView {
            features: &col_features,
            labels,
            weights: sample_weights,
            n_classes,
        };

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut grower = Grower {
            view,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        let root = grower.grow(&sample_indices, 0);

        debug!(
            root_index = root.index(),
            n_nodes = grower.arena.len(),
            "decision tree built"
        );

        DecisionTree {
            nodes: grower.arena,
            n_features,
            n_classes,
        }
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a row-major training set and return its feature count.
pub(crate) fn validate_training_set(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != n_samples {
        return Err(RfError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    if sample_weights.len() != n_samples {
        return Err(RfError::SampleWeightCountMismatch {
            n_samples,
            n_weights: sample_weights.len(),
        });
    }
    for (sample_index, &weight) in sample_weights.iter().enumerate() {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(RfError::InvalidSampleWeight {
                sample_index,
                weight,
            });
        }
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }
    Ok(n_features)
}

/// Recursive tree builder state.
struct Grower<'a> {
    view: ColumnView<'a>,
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl Grower<'_> {
    /// Recursively build the arena-based decision tree.
    ///
    /// Returns the [`NodeIndex`] of the node just created in `arena`.
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let (class_totals, weight) = self.view.class_totals(sample_indices);
        let impurity = self.config.criterion.impurity(&class_totals, weight);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() == 0.0;

        if too_few || pure || depth_exceeded {
            return self.push_leaf(&class_totals, weight, impurity, n_samples);
        }

        let Some(split) = find_best_split(
            self.view,
            sample_indices,
            self.config.criterion,
            self.max_features,
            self.config.min_samples_leaf,
            &mut self.rng,
        ) else {
            return self.push_leaf(&class_totals, weight, impurity, n_samples);
        };

        // Reserve the parent slot, recurse, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: vec![0.0; self.view.n_classes],
            impurity,
            n_samples,
            weight,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            weight,
        };

        NodeIndex::new(node_idx)
    }

    fn push_leaf(
        &mut self,
        class_totals: &[f64],
        weight: f64,
        impurity: Impurity,
        n_samples: usize,
    ) -> NodeIndex {
        let distribution: Vec<f64> = class_totals.iter().map(|&w| w / weight).collect();
        let prediction = class_totals
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
            weight,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned `Vec` has length `n_classes`, summing to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution.as_slice()),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of classes seen during training.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                node @ Node::Leaf { .. } => return Ok(node),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

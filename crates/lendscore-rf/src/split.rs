use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// Returns [`Impurity::new(0.0)`] when `total_weight` is not positive.
    ///
    /// For `Gini`: `1 - Σ(p_i²)` where `p_i = weight_i / total_weight`.
    /// For `Entropy`: `-Σ(p_i · ln(p_i))` summed only over classes where `p_i > 0`.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total_weight: f64) -> Impurity {
        if total_weight <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total_weight;
                        p * p
                    })
                    .sum();
                (1.0 - sum_sq).max(0.0)
            }
            SplitCriterion::Entropy => {
                -class_weights
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total_weight;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value)
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value.
    pub(crate) threshold: f64,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Borrowed view of a column-major training set.
///
/// `features[feature_idx][sample_idx]`; `labels` and `weights` are indexed
/// by sample.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnView<'a> {
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) weights: &'a [f64],
    pub(crate) n_classes: usize,
}

impl ColumnView<'_> {
    /// Sum sample weights per class over `sample_indices`.
    pub(crate) fn class_totals(&self, sample_indices: &[usize]) -> (Vec<f64>, f64) {
        let mut totals = vec![0.0f64; self.n_classes];
        let mut total = 0.0;
        for &si in sample_indices {
            totals[self.labels[si]] += self.weights[si];
            total += self.weights[si];
        }
        (totals, total)
    }
}

/// Right-child class totals as `parent - left`.
///
/// Classes with no samples left on the right are pinned to exactly zero so
/// a pure child scores zero impurity under fractional weights.
pub(crate) fn fill_right_totals(
    parent_totals: &[f64],
    left_totals: &[f64],
    right_counts: &[usize],
    right_totals: &mut [f64],
) {
    for (c, right) in right_totals.iter_mut().enumerate() {
        *right = if right_counts[c] == 0 {
            0.0
        } else {
            parent_totals[c] - left_totals[c]
        };
    }
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the
/// `(value, sample)` pairs, scans left-to-right with incremental
/// weighted class total updates, and tracks the globally best split by
/// weighted impurity decrease.
///
/// Returns `None` when no valid split exists (all values identical,
/// or split would violate `min_samples_leaf`).
pub(crate) fn find_best_split(
    view: ColumnView<'_>,
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = view.features.len();
    let n_samples = sample_indices.len();

    if n_samples == 0 || n_features == 0 {
        return None;
    }

    let (parent_totals, parent_weight) = view.class_totals(sample_indices);
    let mut parent_counts = vec![0usize; view.n_classes];
    for &si in sample_indices {
        parent_counts[view.labels[si]] += 1;
    }
    let parent_impurity = criterion.impurity(&parent_totals, parent_weight);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }
    let selected_features = &feature_order[..take];

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in selected_features {
        let feat_col = &view.features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        // Incremental scan: left grows from empty, right shrinks from full.
        let mut left_totals = vec![0.0f64; view.n_classes];
        let mut right_totals = parent_totals.clone();
        let mut right_counts = parent_counts.clone();
        let mut left_weight = 0.0;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = view.labels[si];
            let w = view.weights[si];

            left_totals[class_i] += w;
            left_weight += w;
            right_counts[class_i] -= 1;
            fill_right_totals(&parent_totals, &left_totals, &right_counts, &mut right_totals);
            let right_weight: f64 = right_totals.iter().sum();

            let n_left = i + 1;
            let n_right = n_samples - n_left;

            // No boundary between identical values.
            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let left_impurity = criterion.impurity(&left_totals, left_weight);
            let right_impurity = criterion.impurity(&right_totals, right_weight);

            let decrease = parent_weight * parent_impurity.value()
                - left_weight * left_impurity.value()
                - right_weight * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                let threshold = (val_i + val_next) / 2.0;
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &view.features[best_feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature: best_feature,
        threshold,
        left_indices,
        right_indices,
    })
}

//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::tree::{DecisionTree, DecisionTreeConfig, validate_training_set};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw `draw_count` sample indices with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<RandomForest, RfError> {
    let n_features = validate_training_set(features, labels, sample_weights)?;
    let n_samples = features.len();

    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(RfError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }

    let tree_template = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));
    tree_template.validate(n_features)?;

    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count,
        "training random forest"
    );

    // Per-tree seeds from the master RNG.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);

            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let boot_labels: Vec<usize> = bootstrap_indices.iter().map(|&i| labels[i]).collect();
            let boot_weights: Vec<f64> = bootstrap_indices
                .iter()
                .map(|&i| sample_weights[i])
                .collect();

            tree_template
                .clone()
                .with_seed(rng.r#gen())
                .build(&boot_features, &boot_labels, &boot_weights, n_features)
        })
        .collect();

    debug!(n_trees_trained = trees.len(), "tree training complete");

    Ok(RandomForest {
        trees,
        n_features,
        n_classes,
    })
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::error::RfError;

    /// Imbalanced binary dataset: 40 positives on x in [5, 15), 10 negatives
    /// on x in [0, 10), overlapping on [5, 10).
    fn make_imbalanced_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            features.push(vec![5.0 + i as f64 * 0.25, 1.0]);
            labels.push(1);
        }
        for i in 0..10 {
            features.push(vec![i as f64, 1.0]);
            labels.push(0);
        }
        (features, labels)
    }

    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            features.push(vec![i as f64 * 0.1, 0.5]);
            labels.push(0);
        }
        for i in 0..30 {
            features.push(vec![10.0 + i as f64 * 0.1, 0.5]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn separable_training_accuracy() {
        let (features, labels) = make_separable_data();
        let forest = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels)
            .unwrap();

        let predictions = forest.predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        let accuracy = correct as f64 / labels.len() as f64;
        assert!(accuracy > 0.95, "accuracy = {accuracy}");
    }

    #[test]
    fn negative_weight_reduces_positive_calls() {
        let (features, labels) = make_imbalanced_data();
        let config = RandomForestConfig::new(40)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_max_depth(Some(2))
            .with_seed(7);

        let uniform = config.fit(&features, &labels).unwrap();
        let weights: Vec<f64> = labels
            .iter()
            .map(|&l| if l == 0 { 8.0 } else { 1.0 })
            .collect();
        let weighted = config.fit_weighted(&features, &labels, &weights).unwrap();

        let count_positive = |preds: Vec<usize>| preds.iter().filter(|&&p| p == 1).count();
        let plain = count_positive(uniform.predict_batch(&features).unwrap());
        let heavy = count_positive(weighted.predict_batch(&features).unwrap());
        assert!(heavy < plain, "weighted {heavy} >= uniform {plain}");
    }

    #[test]
    fn default_weight_flips_unsplittable_vote() {
        // Identical rows cannot be split, so every tree is a single leaf and
        // only the weighted class totals decide the vote.
        let features = vec![vec![1.0]; 40];
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i % 4 != 0)).collect();
        let config = RandomForestConfig::new(50).unwrap().with_seed(3);

        let uniform = config.fit(&features, &labels).unwrap();
        assert_eq!(uniform.predict(&[1.0]).unwrap(), 1);

        let weights: Vec<f64> = labels
            .iter()
            .map(|&l| if l == 0 { 10.0 } else { 1.0 })
            .collect();
        let weighted = config.fit_weighted(&features, &labels, &weights).unwrap();
        assert_eq!(weighted.predict(&[1.0]).unwrap(), 0);
        let p0 = weighted.predict_proba(&[1.0]).unwrap().probability(0);
        assert!(p0 > 0.6, "P(class 0) = {p0}");
    }

    #[test]
    fn single_class_training_predicts_constant() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1, 1, 1];
        let forest = RandomForestConfig::new(5).unwrap().fit(&features, &labels).unwrap();
        let preds = forest.predict_batch(&[vec![-100.0], vec![100.0]]).unwrap();
        assert_eq!(preds, vec![1, 1]);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels) = make_separable_data();
        let first = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels)
            .unwrap();
        let second = RandomForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels)
            .unwrap();

        assert_eq!(
            first.predict_batch(&features).unwrap(),
            second.predict_batch(&features).unwrap()
        );
    }

    #[test]
    fn invalid_bootstrap_fraction_error() {
        let (features, labels) = make_separable_data();
        let err = RandomForestConfig::new(3)
            .unwrap()
            .with_bootstrap_fraction(1.5)
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidBootstrapFraction { .. }));
    }

    #[test]
    fn invalid_max_features_error() {
        let (features, labels) = make_separable_data();
        let err = RandomForestConfig::new(3)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(5))
            .fit(&features, &labels)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMaxFeatures { max_features: 5, n_features: 2 }
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10).unwrap().fit(&[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }
}

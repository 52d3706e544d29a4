/// Per-column standardization fitted on a training set.
///
/// Columns with zero variance keep a scale of 1.0 so they center to zero
/// instead of dividing by zero.
#[derive(Debug, Clone)]
pub(crate) struct Standardizer {
    pub(crate) means: Vec<f64>,
    pub(crate) scales: Vec<f64>,
}

impl Standardizer {
    /// Fit column means and population standard deviations.
    pub(crate) fn fit(features: &[Vec<f64>], n_features: usize) -> Self {
        let n = features.len() as f64;
        let mut means = vec![0.0f64; n_features];
        for row in features {
            for (mean, &x) in means.iter_mut().zip(row) {
                *mean += x;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0f64; n_features];
        for row in features {
            for ((var, &x), &mean) in scales.iter_mut().zip(row).zip(&means) {
                *var += (x - mean) * (x - mean);
            }
        }
        for s in &mut scales {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { means, scales }
    }

    /// Return a standardized copy of `features`.
    pub(crate) fn transform(&self, features: &[Vec<f64>]) -> Vec<Vec<f64>> {
        features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.means)
                    .zip(&self.scales)
                    .map(|((&x, &mean), &scale)| (x - mean) / scale)
                    .collect()
            })
            .collect()
    }
}

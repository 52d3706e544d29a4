//! Per-class misclassification weights and their expansion to sample weights.

use std::fmt;

use crate::error::EvalError;

/// Policy for weighting training rows by their label.
///
/// Label 0 is "not paid on time" (the negative class) and label 1 is
/// "paid on time" (the positive class).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassWeights {
    /// Every row weighs 1.0.
    #[default]
    Uniform,
    /// `n_rows / (n_present_classes * count(class))`, computed on the rows
    /// being trained on.
    Balanced,
    /// Explicit multipliers for label 0 and label 1.
    Custom {
        /// Weight applied to label 0 rows.
        negative: f64,
        /// Weight applied to label 1 rows.
        positive: f64,
    },
}

impl ClassWeights {
    /// Build a validated custom policy.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidClassWeight`] if either weight is not
    /// strictly positive and finite.
    pub fn custom(negative: f64, positive: f64) -> Result<Self, EvalError> {
        let weights = Self::Custom { negative, positive };
        weights.validate()?;
        Ok(weights)
    }

    /// Check that custom multipliers are usable.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidClassWeight`] for a zero, negative, or
    /// non-finite custom weight.
    pub fn validate(&self) -> Result<(), EvalError> {
        if let Self::Custom { negative, positive } = *self {
            for (class, weight) in [(0, negative), (1, positive)] {
                if !(weight.is_finite() && weight > 0.0) {
                    return Err(EvalError::InvalidClassWeight { class, weight });
                }
            }
        }
        Ok(())
    }

    /// Return the `[label 0, label 1]` multipliers for a training set.
    ///
    /// A class absent from `labels` keeps weight 1.0 under `Balanced`; it
    /// never receives a sample weight anyway.
    ///
    /// # Errors
    ///
    /// See [`ClassWeights::validate`].
    pub fn class_multipliers(&self, labels: &[usize]) -> Result<[f64; 2], EvalError> {
        self.validate()?;
        Ok(match *self {
            Self::Uniform => [1.0, 1.0],
            Self::Custom { negative, positive } => [negative, positive],
            Self::Balanced => {
                let mut counts = [0usize; 2];
                for &label in labels {
                    if let Some(count) = counts.get_mut(label) {
                        *count += 1;
                    }
                }
                let present = counts.iter().filter(|&&c| c > 0).count().max(1);
                let n_rows = labels.len() as f64;
                counts.map(|c| {
                    if c == 0 {
                        1.0
                    } else {
                        n_rows / (present as f64 * c as f64)
                    }
                })
            }
        })
    }

    /// Expand the policy into one weight per row of `labels`.
    ///
    /// # Errors
    ///
    /// [`EvalError::InvalidClassWeight`] for a bad custom weight and
    /// [`EvalError::LabelOutOfRange`] for a label outside `{0, 1}`.
    pub fn sample_weights(&self, labels: &[usize]) -> Result<Vec<f64>, EvalError> {
        let multipliers = self.class_multipliers(labels)?;
        labels
            .iter()
            .enumerate()
            .map(|(row, &label)| {
                multipliers
                    .get(label)
                    .copied()
                    .ok_or(EvalError::LabelOutOfRange {
                        what: "labels",
                        row,
                        value: label,
                    })
            })
            .collect()
    }
}

impl fmt::Display for ClassWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Balanced => write!(f, "balanced"),
            Self::Custom { negative, positive } => write!(f, "{negative}:{positive}"),
        }
    }
}

//! Binary confusion counts and the rates derived from them.

use std::fmt;

use crate::error::EvalError;

/// Confusion counts for a binary classifier.
///
/// Label 1 is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfusionCounts {
    /// Predicted 1, actual 1.
    pub true_positive: usize,
    /// Predicted 1, actual 0.
    pub false_positive: usize,
    /// Predicted 0, actual 0.
    pub true_negative: usize,
    /// Predicted 0, actual 1.
    pub false_negative: usize,
}

impl ConfusionCounts {
    /// Tally predictions against the ground truth, row by row.
    ///
    /// # Errors
    ///
    /// | Variant                         | When                              |
    /// |---------------------------------|-----------------------------------|
    /// | [`EvalError::LengthMismatch`]   | the two sequences differ in length |
    /// | [`EvalError::LabelOutOfRange`]  | a value is not 0 or 1             |
    pub fn from_labels(predicted: &[usize], actual: &[usize]) -> Result<Self, EvalError> {
        if predicted.len() != actual.len() {
            return Err(EvalError::LengthMismatch {
                left: "predicted",
                left_len: predicted.len(),
                right: "actual",
                right_len: actual.len(),
            });
        }

        let mut counts = Self::default();
        for (row, (&p, &a)) in predicted.iter().zip(actual).enumerate() {
            match (p, a) {
                (1, 1) => counts.true_positive += 1,
                (1, 0) => counts.false_positive += 1,
                (0, 0) => counts.true_negative += 1,
                (0, 1) => counts.false_negative += 1,
                _ => {
                    let (what, value) = if p > 1 { ("predicted", p) } else { ("actual", a) };
                    return Err(EvalError::LabelOutOfRange { what, row, value });
                }
            }
        }
        Ok(counts)
    }

    /// Element-wise sum of two tallies.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            true_positive: self.true_positive + other.true_positive,
            false_positive: self.false_positive + other.false_positive,
            true_negative: self.true_negative + other.true_negative,
            false_negative: self.false_negative + other.false_negative,
        }
    }

    /// Number of rows tallied.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    /// Sensitivity: `tp / (tp + fn)`. NaN when there are no actual positives.
    #[must_use]
    pub fn true_positive_rate(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// Fall-out: `fp / (fp + tn)`. NaN when there are no actual negatives.
    #[must_use]
    pub fn false_positive_rate(&self) -> f64 {
        ratio(self.false_positive, self.false_positive + self.true_negative)
    }

    /// `tp / (tp + fp)`. NaN when nothing was predicted positive.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// Fraction of rows labeled correctly. NaN on an empty tally.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for ConfusionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>8} {:>7} {:>7}", "", "pred_0", "pred_1")?;
        writeln!(
            f,
            "{:>8} {:>7} {:>7}",
            "true_0", self.true_negative, self.false_positive
        )?;
        writeln!(
            f,
            "{:>8} {:>7} {:>7}",
            "true_1", self.false_negative, self.true_positive
        )?;
        write!(
            f,
            "tpr={:.4} fpr={:.4}",
            self.true_positive_rate(),
            self.false_positive_rate()
        )
    }
}

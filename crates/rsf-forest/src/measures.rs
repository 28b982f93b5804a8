//! Confusion matrix and ensemble evaluation measures.

use std::fmt;

use rsf_series::MultivariateTimeSeries;

use crate::error::ForestError;
use crate::forest::RandomPatternForest;
use crate::predict::ClassDistribution;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many examples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class ordinal.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true examples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true examples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero labels provided |
    /// | [`ForestError::LabelCountMismatch`] | The slices differ in length |
    /// | [`ForestError::UnknownLabel`] | A label is not below `n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if true_labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_examples: predicted.len(),
                n_labels: true_labels.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (example_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if t >= n_classes || p >= n_classes {
                return Err(ForestError::UnknownLabel {
                    example_index,
                    label: t.max(p),
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// An all-zero matrix over `n_classes` classes.
    pub(crate) fn zeros(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0usize; n_classes]; n_classes],
            n_classes,
        }
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Number of examples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted: usize = (0..self.n_classes).map(|i| self.matrix[i][c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = if predicted == 0 {
                    0.0
                } else {
                    tp as f64 / predicted as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Add the counts of `other` into `self`; classes beyond either size are ignored.
    pub(crate) fn accumulate(&mut self, other: &ConfusionMatrix) {
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, &v) in row.iter_mut().zip(other_row) {
                *cell += v;
            }
        }
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Ensemble measures for one evaluation (one holdout split or one fold).
#[derive(Debug, Clone, serde::Serialize)]
pub struct Measures {
    /// Fraction of correctly classified examples.
    pub accuracy: f64,
    /// `1 - accuracy`.
    pub error: f64,
    /// Mean over examples of the squared distance between the predicted
    /// distribution and the one-hot truth.
    pub brier_score: f64,
    /// Macro one-vs-rest area under the ROC curve.
    pub auc: f64,
    /// Mean accuracy of the individual member trees.
    pub base_accuracy: f64,
    /// Out-of-bag accuracy, when OOB evaluation was enabled.
    pub oob_accuracy: Option<f64>,
    /// Confusion matrix of the ensemble predictions.
    pub confusion_matrix: ConfusionMatrix,
}

impl Measures {
    /// Score ensemble distributions against the true labels.
    ///
    /// `base_accuracy` starts at 0.0 and `oob_accuracy` at `None`; set them with
    /// [`Measures::with_base_accuracy`] and [`Measures::with_oob_accuracy`].
    ///
    /// # Errors
    ///
    /// Same as [`ConfusionMatrix::from_labels`].
    pub fn from_distributions(
        labels: &[usize],
        distributions: &[ClassDistribution],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        let predicted: Vec<usize> = distributions.iter().map(ClassDistribution::predicted_class).collect();
        let confusion_matrix = ConfusionMatrix::from_labels(labels, &predicted, n_classes)?;
        let accuracy = confusion_matrix.accuracy();

        Ok(Self {
            accuracy,
            error: 1.0 - accuracy,
            brier_score: brier_score(labels, distributions),
            auc: macro_auc(labels, distributions, n_classes),
            base_accuracy: 0.0,
            oob_accuracy: None,
            confusion_matrix,
        })
    }

    /// Set the mean member accuracy.
    #[must_use]
    pub fn with_base_accuracy(mut self, base_accuracy: f64) -> Self {
        self.base_accuracy = base_accuracy;
        self
    }

    /// Set the out-of-bag accuracy.
    #[must_use]
    pub fn with_oob_accuracy(mut self, oob_accuracy: Option<f64>) -> Self {
        self.oob_accuracy = oob_accuracy;
        self
    }

    /// Named scalar view used for averaging across folds.
    #[must_use]
    pub fn scalars(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![
            ("accuracy", self.accuracy),
            ("error", self.error),
            ("brier_score", self.brier_score),
            ("auc", self.auc),
            ("base_accuracy", self.base_accuracy),
        ];
        if let Some(oob) = self.oob_accuracy {
            out.push(("oob_accuracy", oob));
        }
        out
    }
}

/// Mean accuracy of the member trees on `examples`.
///
/// # Errors
///
/// Returns [`ForestError::DataShape`] when an example lacks a routed dimension.
pub fn base_accuracy(
    forest: &RandomPatternForest,
    examples: &[MultivariateTimeSeries],
    labels: &[usize],
) -> Result<f64, ForestError> {
    if examples.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    let mut total = 0.0;
    for tree in forest.trees() {
        let mut correct = 0usize;
        for (i, (example, &label)) in examples.iter().zip(labels).enumerate() {
            if tree.predict(example).map_err(|e| e.at_example(i))? == label {
                correct += 1;
            }
        }
        total += correct as f64 / examples.len() as f64;
    }
    Ok(total / forest.n_trees() as f64)
}

fn brier_score(labels: &[usize], distributions: &[ClassDistribution]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(distributions)
        .map(|(&label, dist)| {
            dist.as_slice()
                .iter()
                .enumerate()
                .map(|(c, &p)| {
                    let target = if c == label { 1.0 } else { 0.0 };
                    (p - target).powi(2)
                })
                .sum::<f64>()
        })
        .sum();
    total / labels.len() as f64
}

/// Macro average of one-vs-rest AUCs over classes that have both positive
/// and negative examples. 0.5 when no class qualifies.
fn macro_auc(labels: &[usize], distributions: &[ClassDistribution], n_classes: usize) -> f64 {
    let aucs: Vec<f64> = (0..n_classes)
        .filter_map(|class| {
            let scored: Vec<(f64, bool)> = labels
                .iter()
                .zip(distributions)
                .map(|(&l, d)| (d.as_slice()[class], l == class))
                .collect();
            one_vs_rest_auc(scored)
        })
        .collect();
    if aucs.is_empty() {
        0.5
    } else {
        aucs.iter().sum::<f64>() / aucs.len() as f64
    }
}

/// Mann-Whitney AUC with average ranks for tied scores.
fn one_vs_rest_auc(mut scored: Vec<(f64, bool)>) -> Option<f64> {
    let n_pos = scored.iter().filter(|(_, p)| *p).count();
    let n_neg = scored.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < scored.len() {
        let mut j = i;
        while j + 1 < scored.len() && scored[j + 1].0 == scored[i].0 {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean rank of their run.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        pos_rank_sum += rank * scored[i..=j].iter().filter(|(_, p)| *p).count() as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dists(rows: &[&[f64]]) -> Vec<ClassDistribution> {
        rows.iter().map(|r| ClassDistribution::new(r.to_vec())).collect()
    }

    #[test]
    fn perfect_predictions() {
        let true_labels = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&true_labels, &true_labels, 3).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        for m in cm.class_metrics() {
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        let true_labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
    }

    #[test]
    fn empty_and_out_of_range_labels_error() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[], 3),
            Err(ForestError::EmptyDataset)
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 3], &[0, 0], 3),
            Err(ForestError::UnknownLabel { example_index: 1, .. })
        ));
    }

    #[test]
    fn accumulate_adds_counts() {
        let mut a = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let b = ConfusionMatrix::from_labels(&[0, 1], &[1, 1], 2).unwrap();
        a.accumulate(&b);
        assert_eq!(a.as_rows(), &[vec![1, 1], vec![0, 2]]);
        assert_eq!(a.total(), 4);
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }

    #[test]
    fn brier_of_confident_correct_is_zero() {
        let m = Measures::from_distributions(&[0, 1], &dists(&[&[1.0, 0.0], &[0.0, 1.0]]), 2).unwrap();
        assert!(m.brier_score.abs() < 1e-12);
        assert!((m.accuracy - 1.0).abs() < 1e-12);
        assert!(m.error.abs() < 1e-12);
    }

    #[test]
    fn brier_of_uniform_binary_is_half() {
        let m = Measures::from_distributions(&[0, 1], &dists(&[&[0.5, 0.5], &[0.5, 0.5]]), 2).unwrap();
        assert!((m.brier_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_perfect_ranking_and_ties() {
        let perfect = dists(&[&[0.9, 0.1], &[0.8, 0.2], &[0.3, 0.7], &[0.1, 0.9]]);
        let m = Measures::from_distributions(&[0, 0, 1, 1], &perfect, 2).unwrap();
        assert!((m.auc - 1.0).abs() < 1e-12);

        let tied = dists(&[&[0.5, 0.5], &[0.5, 0.5], &[0.5, 0.5], &[0.5, 0.5]]);
        let m = Measures::from_distributions(&[0, 0, 1, 1], &tied, 2).unwrap();
        assert!((m.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_known_value() {
        // Positives scored 0.8, 0.4; negatives 0.6, 0.2: three of four pairs ordered.
        let scored = vec![(0.8, true), (0.4, true), (0.6, false), (0.2, false)];
        assert!((one_vs_rest_auc(scored).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn scalars_include_oob_only_when_set() {
        let m = Measures::from_distributions(&[0], &dists(&[&[1.0, 0.0]]), 2).unwrap();
        assert_eq!(m.scalars().len(), 5);
        let m = m.with_oob_accuracy(Some(0.9)).with_base_accuracy(0.8);
        assert_eq!(m.scalars().len(), 6);
        assert!((m.base_accuracy - 0.8).abs() < f64::EPSILON);
    }
}
